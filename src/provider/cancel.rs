//! Cancellable retrieval scopes.
//!
//! A [`CancelScope`] pairs a [`CancellationToken`] with a background task
//! that waits for Ctrl-C. The listener cancels the token at most once and
//! exits as soon as the scope is dropped, whichever comes first.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::RetrieveError;

/// Races `fut` against `token`; cancellation wins ties.
pub async fn run_until_cancelled<F, T>(token: &CancellationToken, fut: F) -> Result<T, RetrieveError>
where
    F: Future<Output = Result<T, RetrieveError>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(RetrieveError::Cancelled),
        result = fut => result,
    }
}

/// One in-flight provider call that Ctrl-C may abort.
pub struct CancelScope {
    token: CancellationToken,
    _listener: JoinHandle<()>,
    _closed: DropGuard,
}

impl CancelScope {
    /// Opens a scope and spawns its interrupt listener on the current runtime.
    pub fn new() -> Self {
        let token = CancellationToken::new();
        let closed = CancellationToken::new();
        let listener = spawn_interrupt_listener(token.clone(), closed.clone());
        Self {
            token,
            _listener: listener,
            _closed: closed.drop_guard(),
        }
    }

    /// Runs `fut` inside the scope.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, RetrieveError>
    where
        F: Future<Output = Result<T, RetrieveError>>,
    {
        run_until_cancelled(&self.token, fut).await
    }
}

impl Default for CancelScope {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_interrupt_listener(token: CancellationToken, closed: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = closed.cancelled() => {}
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => {
                    tracing::debug!("interrupt received, cancelling request");
                    token.cancel();
                }
                Err(err) => tracing::warn!("failed to listen for Ctrl-C: {err}"),
            },
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn cancelled_token_interrupts_pending_call() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let result: Result<(), _> = run_until_cancelled(&token, async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(RetrieveError::Cancelled)));
    }

    #[tokio::test]
    async fn completed_call_returns_its_value() {
        let scope = CancelScope::new();
        let value = scope.run(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
        assert!(!scope.token.is_cancelled());
    }

    #[tokio::test]
    async fn provider_errors_pass_through() {
        let scope = CancelScope::new();
        let result: Result<(), _> = scope
            .run(async { Err(RetrieveError::Provider(anyhow::anyhow!("boom"))) })
            .await;
        assert!(matches!(result, Err(RetrieveError::Provider(_))));
    }

    #[tokio::test]
    async fn listener_exits_when_scope_closes() {
        let scope = CancelScope::new();
        let token = scope.token.clone();
        let handle = {
            let CancelScope {
                _listener: listener,
                _closed,
                ..
            } = scope;
            drop(_closed);
            listener
        };
        handle.await.unwrap();
        assert!(!token.is_cancelled());
    }
}

//! One request/response turn against the active path.

use crate::conversation::Conversation;
use crate::message::Role;
use crate::output::Renderer;
use crate::provider::{ChatProvider, RetrieveError, RetrieveMode};

/// How a turn ended.
#[derive(Debug)]
pub(crate) enum TurnOutcome {
    /// The reply was appended as the new head.
    Replied(String),
    /// The user interrupted; the head moved back above the pending message.
    Cancelled,
    /// The provider failed; the pending message stays head.
    Failed(anyhow::Error),
}

/// Asks `provider` to answer the head and records the result.
pub(crate) async fn submit_turn(
    conversation: &mut Conversation,
    provider: &dyn ChatProvider,
    mode: RetrieveMode,
    renderer: &mut dyn Renderer,
) -> TurnOutcome {
    let pending_parent = conversation.head().map(|m| m.parent_id.clone());

    match provider.retrieve(conversation, mode, renderer).await {
        Ok(reply) => {
            conversation.append(Role::Assistant, reply.clone());
            TurnOutcome::Replied(reply)
        }
        Err(RetrieveError::Cancelled) => {
            if let Some(parent) = pending_parent {
                if let Err(err) = conversation.change_head(&parent) {
                    tracing::warn!("could not roll back head after cancel: {err}");
                }
            }
            TurnOutcome::Cancelled
        }
        Err(RetrieveError::Provider(err)) => TurnOutcome::Failed(err),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;
    use crate::config::Profile;
    use crate::constants::ROOT_ID;
    use crate::output::BufferRenderer;

    /// Plays back scripted results and records the paths it was asked about.
    #[derive(Default)]
    struct FakeProvider {
        script: RefCell<VecDeque<Result<String, RetrieveError>>>,
        seen: RefCell<Vec<Vec<String>>>,
    }

    impl FakeProvider {
        fn with(results: Vec<Result<String, RetrieveError>>) -> Self {
            Self {
                script: RefCell::new(results.into()),
                ..Default::default()
            }
        }
    }

    #[async_trait::async_trait(?Send)]
    impl ChatProvider for FakeProvider {
        async fn retrieve(
            &self,
            conversation: &Conversation,
            _mode: RetrieveMode,
            renderer: &mut dyn Renderer,
        ) -> Result<String, RetrieveError> {
            let path = conversation
                .path_from_head()
                .map_err(anyhow::Error::from)?
                .iter()
                .map(|m| m.content.clone())
                .collect();
            self.seen.borrow_mut().push(path);
            let result = self
                .script
                .borrow_mut()
                .pop_front()
                .unwrap_or(Err(RetrieveError::Cancelled));
            if let Ok(reply) = &result {
                renderer.render_token(reply);
                renderer.render_done();
            }
            result
        }
    }

    fn conversation() -> Conversation {
        let mut conv = Conversation::new(Profile::default());
        conv.set_system("sys");
        conv
    }

    #[tokio::test]
    async fn reply_becomes_new_head() {
        let mut conv = conversation();
        conv.append(Role::User, "q1");
        let provider = FakeProvider::with(vec![Ok("a1".to_string())]);
        let mut renderer = BufferRenderer::default();

        let outcome = submit_turn(&mut conv, &provider, RetrieveMode::Stream, &mut renderer).await;
        assert!(matches!(outcome, TurnOutcome::Replied(ref r) if r == "a1"));
        let head = conv.head().unwrap();
        assert_eq!(head.role, Role::Assistant);
        assert_eq!(head.content, "a1");
        assert_eq!(renderer.text, "a1");
        assert_eq!(provider.seen.borrow()[0], ["q1"]);
    }

    #[tokio::test]
    async fn cancel_rolls_head_back_and_keeps_message() {
        let mut conv = conversation();
        conv.append(Role::User, "q1");
        let a = conv.append(Role::Assistant, "A").id.clone();
        let b = conv.append(Role::User, "B").id.clone();
        let provider = FakeProvider::with(vec![Err(RetrieveError::Cancelled)]);
        let mut renderer = BufferRenderer::default();

        let outcome = submit_turn(&mut conv, &provider, RetrieveMode::Rest, &mut renderer).await;
        assert!(matches!(outcome, TurnOutcome::Cancelled));
        assert_eq!(conv.head().unwrap().id, a);
        let stored = conv.find_by_id_prefix(&b).unwrap();
        assert!(!stored.head);
        assert_eq!(conv.messages().len(), 3);
    }

    #[tokio::test]
    async fn cancel_of_first_turn_returns_to_root() {
        let mut conv = conversation();
        conv.append(Role::User, "only");
        let provider = FakeProvider::default();
        let mut renderer = BufferRenderer::default();

        let outcome = submit_turn(&mut conv, &provider, RetrieveMode::Stream, &mut renderer).await;
        assert!(matches!(outcome, TurnOutcome::Cancelled));
        assert!(conv.head().is_none());
        assert_eq!(conv.last().parent_id, ROOT_ID);
    }

    #[tokio::test]
    async fn provider_failure_keeps_user_message_as_head() {
        let mut conv = conversation();
        let q = conv.append(Role::User, "q1").id.clone();
        let provider = FakeProvider::with(vec![Err(RetrieveError::Provider(anyhow::anyhow!(
            "rate limited"
        )))]);
        let mut renderer = BufferRenderer::default();

        let outcome = submit_turn(&mut conv, &provider, RetrieveMode::Stream, &mut renderer).await;
        match outcome {
            TurnOutcome::Failed(err) => assert_eq!(err.to_string(), "rate limited"),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(conv.head().unwrap().id, q);
    }

    #[tokio::test]
    async fn retry_after_cancel_sends_branch_path() {
        let mut conv = conversation();
        conv.append(Role::User, "q1");
        conv.append(Role::Assistant, "a1");
        conv.append(Role::User, "abandoned");
        let provider = FakeProvider::with(vec![Err(RetrieveError::Cancelled), Ok("a2".to_string())]);
        let mut renderer = BufferRenderer::default();

        submit_turn(&mut conv, &provider, RetrieveMode::Stream, &mut renderer).await;
        conv.append(Role::User, "q2");
        submit_turn(&mut conv, &provider, RetrieveMode::Stream, &mut renderer).await;

        assert_eq!(provider.seen.borrow()[1], ["q1", "a1", "q2"]);
        assert_eq!(conv.head().unwrap().content, "a2");
    }
}

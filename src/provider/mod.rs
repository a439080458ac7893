//! LLM provider abstraction for ramify.
//!
//! Wraps rig-core's provider clients behind a [`Provider`] struct with enum
//! dispatch, keeping vendor-specific details out of the dialog layer. The
//! dialog only sees the [`ChatProvider`] capability. Supports Anthropic,
//! OpenAI, OpenRouter, and Ollama (local) via [`ProviderKind`].

mod cancel;
mod client;
mod kind;
mod resolve;

pub use client::Provider;
pub use kind::ProviderKind;
pub use resolve::resolve_model;

use thiserror::Error;

use crate::conversation::Conversation;
use crate::output::Renderer;

/// How a reply is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrieveMode {
    /// One blocking call; the whole reply is rendered at once.
    Rest,
    /// Increments are rendered as they arrive.
    Stream,
}

/// Failure of a single reply retrieval.
#[derive(Debug, Error)]
pub enum RetrieveError {
    /// The user interrupted the request. Not a failure.
    #[error("request cancelled")]
    Cancelled,
    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

/// Something that can answer the active path of a conversation.
#[async_trait::async_trait(?Send)]
pub trait ChatProvider {
    /// Sends the system prompt and the path from `ROOT` to the head, renders
    /// the reply through `renderer` and returns its full text.
    async fn retrieve(
        &self,
        conversation: &Conversation,
        mode: RetrieveMode,
        renderer: &mut dyn Renderer,
    ) -> Result<String, RetrieveError>;
}

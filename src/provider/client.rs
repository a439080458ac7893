//! LLM provider client, request building and reply retrieval.
//!
//! Contains the [`Provider`] struct which wraps rig-core provider clients
//! behind enum dispatch. Each retrieval runs inside a [`CancelScope`] so
//! Ctrl-C aborts the request without ending the dialog.

use anyhow::{anyhow, Context, Result};
use futures::StreamExt;
use rig::agent::MultiTurnStreamItem;
use rig::client::CompletionClient;
use rig::completion::Chat;
use rig::message::{Message as RigMessage, Text};
use rig::providers::{anthropic, openai, openrouter};
use rig::streaming::{StreamedAssistantContent, StreamingChat};
use serde_json::{json, Map, Value};

use super::cancel::CancelScope;
use super::kind::ProviderKind;
use super::resolve::ModelSelection;
use super::{ChatProvider, RetrieveError, RetrieveMode};
use crate::config::{Config, Parameters};
use crate::constants::{MAX_TOKENS, OLLAMA_DEFAULT_BASE_URL};
use crate::conversation::Conversation;
use crate::message::Role;
use crate::output::Renderer;

/// Internal enum wrapping provider-specific clients.
enum ClientKind {
    Anthropic(anthropic::Client),
    OpenAI(openai::Client),
    OpenRouter(openrouter::Client),
    Ollama(openai::Client),
}

/// A configured LLM provider ready to answer conversations.
///
/// Agents are constructed on each call since they are cheap to create and
/// the system prompt and parameters may change between turns.
pub struct Provider {
    client: ClientKind,
    kind: ProviderKind,
    model: String,
}

/// Everything one request sends, in rig-core terms.
#[derive(Debug, Clone)]
struct ChatRequest {
    preamble: Option<String>,
    prompt: RigMessage,
    history: Vec<RigMessage>,
    temperature: Option<f64>,
    max_tokens: u64,
    additional_params: Option<Value>,
}

/// Builds an agent for `$request` and runs `$body` with it bound to `$agent`.
macro_rules! with_agent {
    ($client:expr, $model:expr, $request:expr, |$agent:ident| $body:expr) => {{
        let mut builder = $client.agent($model).max_tokens($request.max_tokens);
        if let Some(preamble) = $request.preamble.as_deref() {
            builder = builder.preamble(preamble);
        }
        if let Some(temperature) = $request.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(params) = $request.additional_params.clone() {
            builder = builder.additional_params(params);
        }
        let $agent = builder.build();
        $body
    }};
}

/// Dispatches an operation across provider-specific clients.
///
/// Matches on [`ClientKind`] and executes the same block for each variant,
/// letting the compiler monomorphize per provider.
macro_rules! dispatch {
    ($self:expr, |$client:ident| $body:expr) => {
        match &$self.client {
            ClientKind::Anthropic($client) => $body,
            ClientKind::OpenAI($client) => $body,
            ClientKind::OpenRouter($client) => $body,
            ClientKind::Ollama($client) => $body,
        }
    };
}

/// Processes a streaming response, rendering text and accumulating it.
macro_rules! process_stream {
    ($stream:expr, $renderer:expr, $full_response:expr) => {
        while let Some(chunk) = $stream.next().await {
            match chunk {
                Ok(MultiTurnStreamItem::StreamAssistantItem(StreamedAssistantContent::Text(
                    Text { text },
                ))) => {
                    $renderer.render_token(&text);
                    $full_response.push_str(&text);
                }
                Ok(MultiTurnStreamItem::FinalResponse(_)) => {}
                Err(err) => {
                    $renderer.render_error(&err.to_string());
                    return Err(RetrieveError::Provider(anyhow!("Streaming error: {err}")));
                }
                _ => {
                    // Reasoning and other items carry no reply text
                }
            }
        }
    };
}

impl Provider {
    /// Creates a new [`Provider`] from the loaded config and a model selection.
    ///
    /// Resolves the API key through ramify's precedence chain
    /// (env var → config file → substitution).
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is found for a vendor that needs one
    /// or if client construction fails.
    pub fn from_config(config: &Config, selection: &ModelSelection) -> Result<Self> {
        let kind = selection.provider;
        let api_key = || {
            config.resolve_api_key(kind.as_str()).with_context(|| {
                format!(
                    "No API key found for {kind}. Set {}_API_KEY or configure it in config.toml",
                    kind.as_str().to_uppercase()
                )
            })
        };
        let client = match kind {
            ProviderKind::Anthropic => ClientKind::Anthropic(
                anthropic::Client::new(&api_key()?).context("Failed to create Anthropic client")?,
            ),
            ProviderKind::OpenAI => ClientKind::OpenAI(
                openai::Client::new(&api_key()?).context("Failed to create OpenAI client")?,
            ),
            ProviderKind::OpenRouter => ClientKind::OpenRouter(
                openrouter::Client::new(&api_key()?)
                    .context("Failed to create OpenRouter client")?,
            ),
            ProviderKind::Ollama => {
                let base_url = config.base_url("ollama").unwrap_or(OLLAMA_DEFAULT_BASE_URL);
                ClientKind::Ollama(
                    openai::Client::builder()
                        .api_key("ollama")
                        .base_url(format!("{}/v1", base_url.trim_end_matches('/')))
                        .build()
                        .context("Failed to create Ollama client")?,
                )
            }
        };
        tracing::debug!(vendor = %kind, model = %selection.model, "provider ready");
        Ok(Self {
            client,
            kind,
            model: selection.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, RetrieveError> {
        dispatch!(self, |client| {
            with_agent!(client, &self.model, request, |agent| {
                agent
                    .chat(request.prompt.clone(), request.history.clone())
                    .await
                    .context("Request failed")
                    .map_err(RetrieveError::from)
            })
        })
    }

    async fn stream(
        &self,
        request: &ChatRequest,
        renderer: &mut dyn Renderer,
    ) -> Result<String, RetrieveError> {
        let mut full_response = String::new();
        dispatch!(self, |client| {
            let mut stream = with_agent!(client, &self.model, request, |agent| {
                agent
                    .stream_chat(request.prompt.clone(), request.history.clone())
                    .await
            });
            process_stream!(stream, renderer, full_response);
        });
        Ok(full_response)
    }
}

#[async_trait::async_trait(?Send)]
impl ChatProvider for Provider {
    async fn retrieve(
        &self,
        conversation: &Conversation,
        mode: RetrieveMode,
        renderer: &mut dyn Renderer,
    ) -> Result<String, RetrieveError> {
        let request = build_request(self.kind, conversation)?;
        tracing::debug!(
            history = request.history.len(),
            mode = ?mode,
            params = ?request.additional_params,
            "sending request"
        );

        let scope = CancelScope::new();
        let reply = scope
            .run(async {
                match mode {
                    RetrieveMode::Rest => self.complete(&request).await.map(|reply| {
                        renderer.render_token(&reply);
                        reply
                    }),
                    RetrieveMode::Stream => self.stream(&request, renderer).await,
                }
            })
            .await?;
        renderer.render_done();
        Ok(reply)
    }
}

/// Maps the system prompt and the active path onto a rig-core request.
///
/// The last path message is the prompt; the rest is chat history.
fn build_request(kind: ProviderKind, conversation: &Conversation) -> Result<ChatRequest> {
    let path = conversation.path_from_head()?;
    let (last, earlier) = path
        .split_last()
        .context("Nothing to send: the head is at ROOT")?;

    let to_rig = |role: Role, content: &str| match role {
        Role::Assistant => RigMessage::assistant(content),
        Role::User | Role::System => RigMessage::user(content),
    };

    let system = conversation.system();
    let params = &conversation.profile().parameters;
    Ok(ChatRequest {
        preamble: (!system.is_empty()).then(|| system.to_string()),
        prompt: to_rig(last.role, &last.content),
        history: earlier.iter().map(|m| to_rig(m.role, &m.content)).collect(),
        temperature: (params.temperature != 0.0).then_some(params.temperature as f64),
        max_tokens: if params.max_tokens == 0 {
            MAX_TOKENS
        } else {
            params.max_tokens
        },
        additional_params: request_params(kind, params),
    })
}

/// Vendor-shaped extra request fields for the parameters the agent builder
/// does not cover. Unset parameters are omitted; `None` when nothing is set.
pub fn request_params(kind: ProviderKind, params: &Parameters) -> Option<Value> {
    let mut fields = Map::new();
    if params.top_p != 0.0 {
        fields.insert("top_p".into(), json!(params.top_p));
    }
    match kind {
        ProviderKind::Anthropic => {
            if !params.stop.is_empty() {
                fields.insert("stop_sequences".into(), json!(params.stop));
            }
        }
        ProviderKind::OpenAI | ProviderKind::OpenRouter | ProviderKind::Ollama => {
            if !params.stop.is_empty() {
                fields.insert("stop".into(), json!(params.stop));
            }
            if params.presence_penalty != 0.0 {
                fields.insert("presence_penalty".into(), json!(params.presence_penalty));
            }
            if params.frequency_penalty != 0.0 {
                fields.insert("frequency_penalty".into(), json!(params.frequency_penalty));
            }
            if !params.logit_bias.is_empty() {
                fields.insert("logit_bias".into(), json!(params.logit_bias));
            }
        }
    }
    (!fields.is_empty()).then_some(Value::Object(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Profile;

    #[test]
    fn unset_parameters_are_omitted() {
        assert_eq!(
            request_params(ProviderKind::OpenAI, &Parameters::default()),
            None
        );
    }

    #[test]
    fn anthropic_gets_stop_sequences_only() {
        let params = Parameters {
            top_p: 0.9,
            stop: vec!["END".to_string()],
            presence_penalty: 1.0,
            ..Default::default()
        };
        let value = request_params(ProviderKind::Anthropic, &params).unwrap();
        assert_eq!(value["stop_sequences"], json!(["END"]));
        assert!(value.get("stop").is_none());
        assert!(value.get("presence_penalty").is_none());
        assert!((value["top_p"].as_f64().unwrap() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn openai_style_vendors_get_penalties_and_bias() {
        let mut params = Parameters {
            frequency_penalty: -1.5,
            stop: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        };
        params.logit_bias.insert("50256".to_string(), -100);
        let value = request_params(ProviderKind::OpenRouter, &params).unwrap();
        assert_eq!(value["stop"], json!(["a", "b"]));
        assert_eq!(value["frequency_penalty"], json!(-1.5));
        assert_eq!(value["logit_bias"]["50256"], json!(-100));
        assert!(value.get("presence_penalty").is_none());
    }

    #[test]
    fn request_splits_prompt_from_history() {
        let mut conv = Conversation::new(Profile::default());
        conv.set_system("be brief");
        conv.append(Role::User, "q1");
        conv.append(Role::Assistant, "a1");
        conv.append(Role::User, "q2");
        conv.profile_mut().parameters.temperature = 0.5;

        let request = build_request(ProviderKind::Anthropic, &conv).unwrap();
        assert_eq!(request.preamble.as_deref(), Some("be brief"));
        assert_eq!(request.history.len(), 2);
        assert_eq!(request.prompt, RigMessage::user("q2"));
        assert_eq!(request.temperature, Some(0.5));
        assert_eq!(request.max_tokens, MAX_TOKENS);
        assert!(request.additional_params.is_none());
    }

    #[test]
    fn request_at_root_is_an_error() {
        let conv = Conversation::new(Profile::default());
        assert!(build_request(ProviderKind::OpenAI, &conv).is_err());
    }
}

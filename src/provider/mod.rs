//! Backend adapters and the transport they run over.
//!
//! An adapter is pure translation: it turns a [`Conversation`] plus a tool catalog into a
//! [`BackendRequest`] and a [`BackendResponse`] back into an [`AssistantTurn`]. Sending
//! bytes is the job of a [`ChatTransport`]; [`BackendClient`] pairs one of each.

pub mod http;

#[cfg(feature = "openai")]
pub mod chat_completions;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "groq")]
pub mod groq;

#[cfg(feature = "anthropic")]
pub mod anthropic;

#[cfg(feature = "ollama")]
pub mod ollama;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::{LoopSettings, TetherConfig};
use crate::conversation::Conversation;
use crate::error::TetherError;
use crate::models::{ModelId, ProviderKind};
use crate::tools::ToolRegistry;
use crate::types::{AssistantTurn, ConversationMessage, GenerationSettings, ToolCallResult, Usage};

pub use http::HttpTransport;

/// Wire request produced by an adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    /// Path appended to the transport's base URL (e.g. `/chat/completions`).
    pub endpoint: String,
    pub body: Value,
}

/// Raw JSON returned by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse {
    pub body: Value,
}

impl BackendResponse {
    pub fn new(body: Value) -> Self {
        Self { body }
    }
}

/// Per-backend translation layer.
pub trait ProviderAdapter: Send + Sync {
    fn provider_name(&self) -> &str;

    fn model_id(&self) -> &str;

    /// Whether the backend accepts a tool catalog and returns structured tool calls.
    /// Adapters answering `false` can only be driven through the planning bridge.
    fn supports_tool_calling(&self) -> bool;

    /// Encode the transcript and (optionally) the tool catalog.
    fn encode(
        &self,
        conversation: &Conversation,
        tools: Option<&ToolRegistry>,
        settings: &GenerationSettings,
    ) -> Result<BackendRequest, TetherError>;

    /// Decode a response into a final answer or a tool-call request.
    fn decode(&self, response: &BackendResponse) -> Result<AssistantTurn, TetherError>;

    /// Shape a tool result the way this backend expects it.
    fn encode_tool_result(&self, result: &ToolCallResult) -> ConversationMessage;

    /// Token usage reported in a response, if any.
    fn usage(&self, _response: &BackendResponse) -> Usage {
        Usage::default()
    }
}

/// Sends encoded requests to a backend.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &BackendRequest) -> Result<BackendResponse, TetherError>;
}

/// A decoded assistant turn with the usage that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub turn: AssistantTurn,
    pub usage: Usage,
}

/// One adapter bound to one transport. Constructed explicitly and passed by reference;
/// nothing is shared globally.
#[derive(Clone)]
pub struct BackendClient {
    adapter: Arc<dyn ProviderAdapter>,
    transport: Arc<dyn ChatTransport>,
}

impl BackendClient {
    pub fn new(adapter: impl ProviderAdapter + 'static, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            adapter: Arc::new(adapter),
            transport,
        }
    }

    pub fn from_parts(adapter: Arc<dyn ProviderAdapter>, transport: Arc<dyn ChatTransport>) -> Self {
        Self { adapter, transport }
    }

    pub fn adapter(&self) -> &dyn ProviderAdapter {
        self.adapter.as_ref()
    }

    /// Encode, send and decode one chat completion.
    pub async fn complete(
        &self,
        conversation: &Conversation,
        tools: Option<&ToolRegistry>,
        settings: &GenerationSettings,
    ) -> Result<Completion, TetherError> {
        let request = self.adapter.encode(conversation, tools, settings)?;
        debug!(
            provider = self.adapter.provider_name(),
            model = self.adapter.model_id(),
            messages = conversation.len(),
            tools = tools.map(|t| t.len()).unwrap_or(0),
            "backend request"
        );
        let response = self.transport.send(&request).await?;
        let turn = self.adapter.decode(&response)?;
        let usage = self.adapter.usage(&response);
        Ok(Completion { turn, usage })
    }
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("provider", &self.adapter.provider_name())
            .field("model", &self.adapter.model_id())
            .finish()
    }
}

/// Build the adapter and HTTP transport for `model`.
pub fn create_backend(
    model: &ModelId,
    config: &TetherConfig,
    settings: &LoopSettings,
) -> Result<BackendClient, TetherError> {
    let provider = model.provider;
    let api_key = config.get_api_key(provider);
    if provider.requires_api_key() && api_key.is_none() {
        return Err(TetherError::Configuration(format!(
            "missing API key for provider '{provider}'"
        )));
    }
    let base_url = config
        .get_base_url(provider)
        .unwrap_or_else(|| provider.default_base_url().to_string());
    let transport = HttpTransport::for_provider(provider, base_url, api_key.as_deref(), settings)?;
    let transport: Arc<dyn ChatTransport> = Arc::new(transport);

    match provider {
        #[cfg(feature = "openai")]
        ProviderKind::OpenAi => Ok(BackendClient::new(
            openai::OpenAiAdapter::new(model.model.clone()),
            transport,
        )),
        #[cfg(feature = "groq")]
        ProviderKind::Groq => Ok(BackendClient::new(
            groq::GroqAdapter::new(model.model.clone()),
            transport,
        )),
        #[cfg(feature = "anthropic")]
        ProviderKind::Anthropic => Ok(BackendClient::new(
            anthropic::AnthropicAdapter::new(model.model.clone()),
            transport,
        )),
        #[cfg(feature = "ollama")]
        ProviderKind::Ollama => Ok(BackendClient::new(
            ollama::OllamaAdapter::new(model.model.clone()),
            transport,
        )),
        #[allow(unreachable_patterns)]
        other => Err(TetherError::UnsupportedProvider(format!(
            "{other} (feature not enabled)"
        ))),
    }
}

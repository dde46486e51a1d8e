//! Groq adapter (OpenAI-compatible wire, stricter tool messages).

use super::chat_completions;
use super::{BackendRequest, BackendResponse, ProviderAdapter};
use crate::conversation::Conversation;
use crate::error::TetherError;
use crate::tools::ToolRegistry;
use crate::types::{AssistantTurn, ConversationMessage, GenerationSettings, ToolCallResult, Usage};

/// Groq rejects a `name` field on tool messages, so results omit it.
#[derive(Debug, Clone)]
pub struct GroqAdapter {
    model: String,
}

impl GroqAdapter {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

impl ProviderAdapter for GroqAdapter {
    fn provider_name(&self) -> &str {
        "groq"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn supports_tool_calling(&self) -> bool {
        true
    }

    fn encode(
        &self,
        conversation: &Conversation,
        tools: Option<&ToolRegistry>,
        settings: &GenerationSettings,
    ) -> Result<BackendRequest, TetherError> {
        chat_completions::encode_request(&self.model, conversation, tools, settings)
    }

    fn decode(&self, response: &BackendResponse) -> Result<AssistantTurn, TetherError> {
        chat_completions::decode_response(response)
    }

    fn encode_tool_result(&self, result: &ToolCallResult) -> ConversationMessage {
        ConversationMessage::tool(result.call_id.clone(), None, result.payload())
    }

    fn usage(&self, response: &BackendResponse) -> Usage {
        chat_completions::parse_usage(response)
    }
}

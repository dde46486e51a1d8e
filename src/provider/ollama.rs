//! Ollama `/api/chat` adapter (plain chat, no native tool calling).

use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{BackendRequest, BackendResponse, ProviderAdapter};
use crate::conversation::Conversation;
use crate::error::TetherError;
use crate::tools::ToolRegistry;
use crate::types::{AssistantTurn, ConversationMessage, GenerationSettings, ToolCallResult, Usage};

const ENDPOINT: &str = "/api/chat";

/// Local models driven through the planning bridge.
#[derive(Debug, Clone)]
pub struct OllamaAdapter {
    model: String,
}

impl OllamaAdapter {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

impl ProviderAdapter for OllamaAdapter {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn supports_tool_calling(&self) -> bool {
        false
    }

    fn encode(
        &self,
        conversation: &Conversation,
        tools: Option<&ToolRegistry>,
        settings: &GenerationSettings,
    ) -> Result<BackendRequest, TetherError> {
        if tools.is_some_and(|t| !t.is_empty()) {
            return Err(TetherError::protocol(
                "ollama adapter cannot send a tool catalog; use the planning bridge",
            ));
        }
        if conversation.has_tool_traffic() {
            return Err(TetherError::protocol(
                "ollama adapter cannot encode tool-call messages",
            ));
        }

        let messages: Vec<Value> = conversation
            .messages()
            .iter()
            .map(|msg| json!({ "role": msg.role().as_str(), "content": msg.text() }))
            .collect();

        let mut options = Map::new();
        if let Some(temp) = settings.temperature {
            options.insert("temperature".into(), temp.into());
        }
        if let Some(max) = settings.max_tokens {
            options.insert("num_predict".into(), max.into());
        }

        let mut obj = Map::new();
        obj.insert("model".into(), self.model.clone().into());
        obj.insert("messages".into(), messages.into());
        obj.insert("stream".into(), false.into());
        if !options.is_empty() {
            obj.insert("options".into(), Value::Object(options));
        }

        Ok(BackendRequest {
            endpoint: ENDPOINT.to_string(),
            body: Value::Object(obj),
        })
    }

    fn decode(&self, response: &BackendResponse) -> Result<AssistantTurn, TetherError> {
        let data: ChatResponse = serde_json::from_value(response.body.clone())
            .map_err(|e| TetherError::protocol(format!("unexpected Ollama response shape: {e}")))?;
        let text = data.message.and_then(|m| m.content).unwrap_or_default();
        Ok(AssistantTurn::Final { text })
    }

    fn encode_tool_result(&self, result: &ToolCallResult) -> ConversationMessage {
        ConversationMessage::tool(result.call_id.clone(), None, result.payload())
    }

    fn usage(&self, response: &BackendResponse) -> Usage {
        let count = |key: &str| {
            response
                .body
                .get(key)
                .and_then(Value::as_u64)
                .map(|n| n.min(u32::MAX as u64) as u32)
                .unwrap_or(0)
        };
        let input_tokens = count("prompt_eval_count");
        let output_tokens = count("eval_count");
        Usage {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens.saturating_add(output_tokens),
        }
    }
}

// Ollama API response types (internal)

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

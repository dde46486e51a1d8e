//! Anthropic Messages API adapter.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{BackendRequest, BackendResponse, ProviderAdapter};
use crate::conversation::Conversation;
use crate::error::TetherError;
use crate::tools::ToolRegistry;
use crate::types::{
    AssistantTurn, ConversationMessage, GenerationSettings, ToolCallArguments, ToolCallRequest,
    ToolCallResult, Usage,
};

const ENDPOINT: &str = "/messages";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// `tool_use` / `tool_result` content blocks; system prompts travel outside `messages`.
#[derive(Debug, Clone)]
pub struct AnthropicAdapter {
    model: String,
}

impl AnthropicAdapter {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

impl ProviderAdapter for AnthropicAdapter {
    fn provider_name(&self) -> &str {
        "anthropic"
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
        let mut system_parts: Vec<&str> = Vec::new();
        let mut messages: Vec<Value> = Vec::new();

        for msg in conversation.messages() {
            match msg {
                ConversationMessage::System { content } => system_parts.push(content),
                ConversationMessage::User { content } => {
                    messages.push(json!({ "role": "user", "content": content }));
                }
                ConversationMessage::Assistant {
                    content,
                    tool_calls,
                } => {
                    let mut blocks: Vec<Value> = Vec::new();
                    if let Some(text) = content.as_deref().filter(|t| !t.is_empty()) {
                        blocks.push(json!({ "type": "text", "text": text }));
                    }
                    for tc in tool_calls {
                        blocks.push(json!({
                            "type": "tool_use",
                            "id": tc.call_id,
                            "name": tc.tool_name,
                            "input": tc.arguments.to_object_value(),
                        }));
                    }
                    // The API rejects empty assistant content.
                    if !blocks.is_empty() {
                        messages.push(json!({ "role": "assistant", "content": blocks }));
                    }
                }
                ConversationMessage::Tool {
                    call_id,
                    content,
                    is_error,
                    ..
                } => {
                    let mut block = json!({
                        "type": "tool_result",
                        "tool_use_id": call_id,
                        "content": content,
                    });
                    if *is_error {
                        block["is_error"] = Value::Bool(true);
                    }
                    push_tool_result(&mut messages, block);
                }
            }
        }

        let mut obj = Map::new();
        obj.insert("model".into(), self.model.clone().into());
        obj.insert(
            "max_tokens".into(),
            settings.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS).into(),
        );
        obj.insert("messages".into(), messages.into());
        if !system_parts.is_empty() {
            obj.insert("system".into(), system_parts.join("\n\n").into());
        }
        if let Some(temp) = settings.temperature {
            // Anthropic caps temperature at 1.0.
            obj.insert("temperature".into(), temp.clamp(0.0, 1.0).into());
        }
        if let Some(tools) = tools.filter(|t| !t.is_empty()) {
            let tool_defs: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name(),
                        "description": t.description(),
                        "input_schema": t.parameters().schema,
                    })
                })
                .collect();
            obj.insert("tools".into(), tool_defs.into());
        }

        Ok(BackendRequest {
            endpoint: ENDPOINT.to_string(),
            body: Value::Object(obj),
        })
    }

    fn decode(&self, response: &BackendResponse) -> Result<AssistantTurn, TetherError> {
        let data: MessagesResponse = serde_json::from_value(response.body.clone())
            .map_err(|e| TetherError::protocol(format!("unexpected Anthropic response shape: {e}")))?;

        let mut text = String::new();
        let mut requests = Vec::new();
        for block in data.content {
            match block {
                ContentBlock::Text { text: part } => text.push_str(&part),
                ContentBlock::ToolUse { id, name, input } => {
                    if id.is_empty() {
                        return Err(TetherError::protocol(format!(
                            "tool_use block for '{name}' has no id"
                        )));
                    }
                    requests.push(ToolCallRequest::new(
                        id,
                        name,
                        ToolCallArguments::from_value(input),
                    ));
                }
                ContentBlock::Other => {}
            }
        }

        let text = if requests.is_empty() || !text.is_empty() {
            Some(text)
        } else {
            None
        };
        Ok(AssistantTurn::from_parts(text, requests))
    }

    fn encode_tool_result(&self, result: &ToolCallResult) -> ConversationMessage {
        ConversationMessage::tool(result.call_id.clone(), None, result.payload())
            .with_error_flag(result.is_error())
    }

    fn usage(&self, response: &BackendResponse) -> Usage {
        response
            .body
            .get("usage")
            .and_then(|u| serde_json::from_value::<MessagesUsage>(u.clone()).ok())
            .map(|u| Usage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
                total_tokens: u.input_tokens.saturating_add(u.output_tokens),
            })
            .unwrap_or_default()
    }
}

/// Consecutive tool results must share one user message.
fn push_tool_result(messages: &mut Vec<Value>, block: Value) {
    if let Some(last) = messages.last_mut() {
        let is_tool_results = last["role"] == "user"
            && last["content"]
                .as_array()
                .is_some_and(|blocks| blocks.iter().all(|b| b["type"] == "tool_result"));
        if is_tool_results {
            if let Some(blocks) = last["content"].as_array_mut() {
                blocks.push(block);
                return;
            }
        }
    }
    messages.push(json!({ "role": "user", "content": [block] }));
}

// Anthropic API response types (internal)

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct MessagesUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

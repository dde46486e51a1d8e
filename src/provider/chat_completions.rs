//! Chat-completions wire format shared by OpenAI-style backends.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{BackendRequest, BackendResponse};
use crate::conversation::Conversation;
use crate::error::TetherError;
use crate::tools::ToolRegistry;
use crate::types::{
    AssistantTurn, ConversationMessage, GenerationSettings, ToolCallArguments, ToolCallRequest,
    Usage,
};

pub const ENDPOINT: &str = "/chat/completions";

/// Build a `/chat/completions` body. An empty catalog sends no `tools` field.
pub fn encode_request(
    model: &str,
    conversation: &Conversation,
    tools: Option<&ToolRegistry>,
    settings: &GenerationSettings,
) -> Result<BackendRequest, TetherError> {
    let messages: Vec<Value> = conversation.messages().iter().map(message_to_wire).collect();

    let mut obj = Map::new();
    obj.insert("model".into(), model.into());
    obj.insert("messages".into(), messages.into());
    if let Some(temp) = settings.temperature {
        obj.insert("temperature".into(), temp.into());
    }
    if let Some(max) = settings.max_tokens {
        obj.insert("max_tokens".into(), max.into());
    }
    if let Some(tools) = tools.filter(|t| !t.is_empty()) {
        let tool_defs: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name(),
                        "description": t.description(),
                        "parameters": t.parameters().schema,
                    }
                })
            })
            .collect();
        obj.insert("tools".into(), tool_defs.into());
        obj.insert("tool_choice".into(), "auto".into());
    }

    Ok(BackendRequest {
        endpoint: ENDPOINT.to_string(),
        body: Value::Object(obj),
    })
}

fn message_to_wire(message: &ConversationMessage) -> Value {
    match message {
        ConversationMessage::System { content } => json!({ "role": "system", "content": content }),
        ConversationMessage::User { content } => json!({ "role": "user", "content": content }),
        ConversationMessage::Assistant {
            content,
            tool_calls,
        } => {
            if tool_calls.is_empty() {
                return json!({
                    "role": "assistant",
                    "content": content.as_deref().unwrap_or(""),
                });
            }
            let tc_json: Vec<Value> = tool_calls
                .iter()
                .map(|tc| {
                    json!({
                        "id": tc.call_id,
                        "type": "function",
                        "function": {
                            "name": tc.tool_name,
                            "arguments": tc.arguments.to_wire_string(),
                        }
                    })
                })
                .collect();
            json!({
                "role": "assistant",
                "content": content.as_deref().filter(|t| !t.is_empty()),
                "tool_calls": tc_json,
            })
        }
        ConversationMessage::Tool {
            call_id,
            tool_name,
            content,
            ..
        } => {
            let mut msg = json!({
                "role": "tool",
                "tool_call_id": call_id,
                "content": content,
            });
            if let (Some(name), Some(obj)) = (tool_name, msg.as_object_mut()) {
                obj.insert("name".into(), name.clone().into());
            }
            msg
        }
    }
}

/// Decode `choices[0].message`, keeping backend call ids untouched.
pub fn decode_response(response: &BackendResponse) -> Result<AssistantTurn, TetherError> {
    let data: ChatResponse = serde_json::from_value(response.body.clone())
        .map_err(|e| TetherError::protocol(format!("unexpected chat completion shape: {e}")))?;
    let choice = data
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| TetherError::protocol("no choices in chat completion response"))?;

    let mut requests = Vec::new();
    for tc in choice.message.tool_calls.unwrap_or_default() {
        let call_id = tc.id.unwrap_or_default();
        if call_id.is_empty() {
            return Err(TetherError::protocol(format!(
                "tool call for '{}' has no id",
                tc.function.name
            )));
        }
        let arguments = match tc.function.arguments {
            Value::String(raw) => ToolCallArguments::parse(&raw),
            other => ToolCallArguments::from_value(other),
        };
        requests.push(ToolCallRequest::new(call_id, tc.function.name, arguments));
    }

    let text = if requests.is_empty() {
        Some(choice.message.content.unwrap_or_default())
    } else {
        choice.message.content.filter(|t| !t.is_empty())
    };
    Ok(AssistantTurn::from_parts(text, requests))
}

pub fn parse_usage(response: &BackendResponse) -> Usage {
    response
        .body
        .get("usage")
        .and_then(|u| serde_json::from_value::<ChatUsage>(u.clone()).ok())
        .map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default()
}

// Chat-completions response types (internal)

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ChatToolCall>>,
}

#[derive(Deserialize)]
struct ChatToolCall {
    id: Option<String>,
    function: ChatFunction,
}

#[derive(Deserialize)]
struct ChatFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

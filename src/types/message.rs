//! Transcript message types shared by every backend.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of a conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ConversationMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
    },
    Tool {
        call_id: String,
        /// Some backends reject this field, so adapters decide whether to fill it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_name: Option<String>,
        content: String,
        /// The payload reports a failed call. Only backends with a native flag use it.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

impl ConversationMessage {
    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::System {
            content: text.into(),
        }
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::User {
            content: text.into(),
        }
    }

    /// Create a text-only assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::Assistant {
            content: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    /// Create a tool result message.
    pub fn tool(
        call_id: impl Into<String>,
        tool_name: Option<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::Tool {
            call_id: call_id.into(),
            tool_name,
            content: content.into(),
            is_error: false,
        }
    }

    /// Mark a tool message as reporting a failed call. No-op for other roles.
    pub fn with_error_flag(mut self, failed: bool) -> Self {
        if let Self::Tool { is_error, .. } = &mut self {
            *is_error = failed;
        }
        self
    }

    pub fn role(&self) -> Role {
        match self {
            Self::System { .. } => Role::System,
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::Tool { .. } => Role::Tool,
        }
    }

    /// Text payload of the message (empty for assistant turns without text).
    pub fn text(&self) -> &str {
        match self {
            Self::System { content } | Self::User { content } | Self::Tool { content, .. } => {
                content
            }
            Self::Assistant { content, .. } => content.as_deref().unwrap_or(""),
        }
    }

    /// Tool calls carried by an assistant message.
    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}

/// Conversation role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    /// Backend-issued correlation token, echoed unchanged in the result.
    pub call_id: String,
    pub tool_name: String,
    pub arguments: ToolCallArguments,
}

impl ToolCallRequest {
    pub fn new(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: ToolCallArguments,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// Arguments attached to a tool call.
///
/// Text that does not parse into a JSON object is kept verbatim so the transcript
/// can echo it back to the backend exactly as issued.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolCallArguments {
    Parsed { values: Map<String, Value> },
    Malformed { raw: String, reason: String },
}

impl ToolCallArguments {
    /// Parse backend argument text. Blank text means "no arguments".
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::empty();
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => Self::from_value(value),
            Err(err) => Self::Malformed {
                raw: raw.to_string(),
                reason: format!("arguments are not valid JSON: {err}"),
            },
        }
    }

    /// Classify an already-decoded JSON value.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(values) => Self::Parsed { values },
            Value::Null => Self::empty(),
            other => Self::Malformed {
                raw: other.to_string(),
                reason: format!("arguments must be a JSON object, got {}", json_type_name(&other)),
            },
        }
    }

    pub fn empty() -> Self {
        Self::Parsed { values: Map::new() }
    }

    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Parsed { values } => Some(values),
            Self::Malformed { .. } => None,
        }
    }

    /// Argument text as the backend originally sent it (or a canonical encoding).
    pub fn to_wire_string(&self) -> String {
        match self {
            Self::Parsed { values } => Value::Object(values.clone()).to_string(),
            Self::Malformed { raw, .. } => raw.clone(),
        }
    }

    /// Argument object for backends that take structured input; malformed text maps to `{}`.
    pub fn to_object_value(&self) -> Value {
        match self {
            Self::Parsed { values } => Value::Object(values.clone()),
            Self::Malformed { .. } => Value::Object(Map::new()),
        }
    }
}

impl From<Map<String, Value>> for ToolCallArguments {
    fn from(values: Map<String, Value>) -> Self {
        Self::Parsed { values }
    }
}

/// Outcome of one tool execution. Failures are data, not control flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", content = "output", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success(String),
    Failure(String),
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Result of dispatching a single tool call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCallResult {
    pub call_id: String,
    pub tool_name: String,
    pub outcome: ToolOutcome,
}

impl ToolCallResult {
    pub fn success(request: &ToolCallRequest, output: impl Into<String>) -> Self {
        Self {
            call_id: request.call_id.clone(),
            tool_name: request.tool_name.clone(),
            outcome: ToolOutcome::Success(output.into()),
        }
    }

    pub fn failure(request: &ToolCallRequest, reason: impl Into<String>) -> Self {
        Self {
            call_id: request.call_id.clone(),
            tool_name: request.tool_name.clone(),
            outcome: ToolOutcome::Failure(reason.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        !self.outcome.is_success()
    }

    /// Text fed back to the model for this result.
    pub fn payload(&self) -> String {
        match &self.outcome {
            ToolOutcome::Success(output) => output.clone(),
            ToolOutcome::Failure(reason) => {
                format!("ERROR calling tool {}: {}", self.tool_name, reason)
            }
        }
    }
}

/// Normalized assistant response.
#[derive(Debug, Clone, PartialEq)]
pub enum AssistantTurn {
    /// No tool calls: the conversation is done. Empty text is a valid answer.
    Final { text: String },
    /// One or more tool calls: the conversation continues.
    ToolRequested {
        text: Option<String>,
        requests: Vec<ToolCallRequest>,
    },
}

impl AssistantTurn {
    /// Build a turn from decoded parts; no requests means a final answer.
    pub fn from_parts(text: Option<String>, requests: Vec<ToolCallRequest>) -> Self {
        if requests.is_empty() {
            Self::Final {
                text: text.unwrap_or_default(),
            }
        } else {
            Self::ToolRequested { text, requests }
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Final { text } => text,
            Self::ToolRequested { text, .. } => text.as_deref().unwrap_or(""),
        }
    }

    pub fn requests(&self) -> &[ToolCallRequest] {
        match self {
            Self::Final { .. } => &[],
            Self::ToolRequested { requests, .. } => requests,
        }
    }

    /// Transcript entry recording this turn.
    pub fn to_message(&self) -> ConversationMessage {
        match self {
            Self::Final { text } => ConversationMessage::Assistant {
                content: Some(text.clone()),
                tool_calls: Vec::new(),
            },
            Self::ToolRequested { text, requests } => ConversationMessage::Assistant {
                content: text.clone(),
                tool_calls: requests.clone(),
            },
        }
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

//! Append-only conversation transcript.

use std::collections::HashSet;

use crate::error::{Result, TetherError};
use crate::types::{AssistantTurn, ConversationMessage};

/// Ordered transcript owned by a single loop invocation.
///
/// Messages are only ever appended. Tool messages must answer a call id issued by an
/// earlier assistant turn, and each issuance can be answered once. A later turn may
/// reuse an id once the earlier call carrying it has been answered.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ConversationMessage>,
    issued_call_ids: HashSet<String>,
    /// Issued ids still waiting for their tool message.
    unanswered_call_ids: HashSet<String>,
    assistant_turns: usize,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a transcript with an optional system prompt and a user goal.
    pub fn with_goal(system: Option<&str>, goal: impl Into<String>) -> Self {
        let mut conversation = Self::new();
        if let Some(system) = system {
            conversation.push_system(system);
        }
        conversation.push_user(goal);
        conversation
    }

    pub fn push_system(&mut self, text: impl Into<String>) {
        self.messages.push(ConversationMessage::system(text));
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(ConversationMessage::user(text));
    }

    /// Append an assistant turn, registering the call ids it issues.
    ///
    /// Call ids must be unique within the turn and must not collide with a call that is
    /// still unanswered; either would make results ambiguous.
    pub fn push_assistant(&mut self, turn: &AssistantTurn) -> Result<()> {
        let mut seen = HashSet::new();
        for request in turn.requests() {
            if request.call_id.is_empty() {
                return Err(TetherError::protocol(format!(
                    "tool call for '{}' has an empty call id",
                    request.tool_name
                )));
            }
            if !seen.insert(request.call_id.as_str()) {
                return Err(TetherError::protocol(format!(
                    "duplicate tool call id '{}' in one turn",
                    request.call_id
                )));
            }
            if self.unanswered_call_ids.contains(&request.call_id) {
                return Err(TetherError::protocol(format!(
                    "tool call id '{}' reused while still unanswered",
                    request.call_id
                )));
            }
        }
        for request in turn.requests() {
            self.issued_call_ids.insert(request.call_id.clone());
            self.unanswered_call_ids.insert(request.call_id.clone());
        }
        self.messages.push(turn.to_message());
        self.assistant_turns += 1;
        Ok(())
    }

    /// Append a tool message produced by an adapter. It answers the newest issuance
    /// of its call id.
    pub fn push_tool_message(&mut self, message: ConversationMessage) -> Result<()> {
        let ConversationMessage::Tool { call_id, .. } = &message else {
            return Err(TetherError::protocol(format!(
                "expected a tool message, got a {:?} message",
                message.role()
            )));
        };
        if !self.unanswered_call_ids.remove(call_id) {
            let reason = if self.issued_call_ids.contains(call_id) {
                format!("tool call id '{call_id}' was already answered")
            } else {
                format!("tool result references unknown call id '{call_id}'")
            };
            return Err(TetherError::protocol(reason));
        }
        self.messages.push(message);
        Ok(())
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of assistant turns appended so far.
    pub fn assistant_turns(&self) -> usize {
        self.assistant_turns
    }

    /// Whether any tool traffic has been recorded.
    pub fn has_tool_traffic(&self) -> bool {
        !self.issued_call_ids.is_empty()
    }

    /// Call ids issued but not yet answered, in issuance order.
    pub fn pending_call_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut pending: Vec<&str> = self
            .messages
            .iter()
            .rev()
            .flat_map(|message| message.tool_calls().iter().rev())
            .map(|request| request.call_id.as_str())
            .filter(|id| self.unanswered_call_ids.contains(*id) && seen.insert(*id))
            .collect();
        pending.reverse();
        pending
    }

    /// Text of the most recent assistant turn, if any.
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(|message| match message {
            ConversationMessage::Assistant { content, .. } => {
                Some(content.as_deref().unwrap_or(""))
            }
            _ => None,
        })
    }

    pub fn into_messages(self) -> Vec<ConversationMessage> {
        self.messages
    }
}

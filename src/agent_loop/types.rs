//! Core run types shared by the execution loop and the planning bridge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::Conversation;
use crate::types::{ToolCallResult, Usage};

/// Unique run identifier.
pub type RunId = Uuid;

/// How a run ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The backend produced a final answer.
    Completed,
    /// The turn budget ran out first. Not an error.
    BudgetExhausted,
    Canceled,
}

/// Result of one execution-loop invocation.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub run_id: RunId,
    /// Final text, or the last text produced when the budget ran out. May be empty.
    pub text: String,
    pub status: RunStatus,
    /// Model calls made.
    pub turns: usize,
    pub conversation: Conversation,
    /// Every dispatched call, in issuance order.
    pub tool_results: Vec<ToolCallResult>,
    pub usage: Usage,
    pub finished_at: DateTime<Utc>,
}

impl LoopOutcome {
    pub fn is_budget_exhausted(&self) -> bool {
        self.status == RunStatus::BudgetExhausted
    }
}

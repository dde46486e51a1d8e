//! Run lifecycle events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{RunId, RunStatus};
use crate::types::ToolCallResult;

/// Callback receiving lifecycle events.
pub type LoopEventSink = Arc<dyn Fn(LoopEvent) + Send + Sync>;

/// Concrete event payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoopEventPayload {
    TurnStarted {
        turn: usize,
    },
    AssistantTurn {
        turn: usize,
        text: String,
        tool_calls: usize,
    },
    ToolCallStarted {
        call_id: String,
        tool_name: String,
    },
    ToolCallCompleted {
        result: ToolCallResult,
    },
    PlanDecoded {
        steps: usize,
        dropped: usize,
    },
    Finished {
        status: RunStatus,
    },
}

/// Envelope for run events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoopEvent {
    pub run_id: RunId,
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: LoopEventPayload,
}

pub(crate) struct EventEmitter {
    run_id: RunId,
    seq: AtomicU64,
    sink: Option<LoopEventSink>,
}

impl EventEmitter {
    pub(crate) fn new(run_id: RunId, sink: Option<LoopEventSink>) -> Self {
        Self {
            run_id,
            seq: AtomicU64::new(0),
            sink,
        }
    }

    pub(crate) fn emit(&self, payload: LoopEventPayload) {
        let Some(sink) = &self.sink else {
            return;
        };
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        (sink)(LoopEvent {
            run_id: self.run_id,
            seq,
            timestamp: Utc::now(),
            payload,
        });
    }
}

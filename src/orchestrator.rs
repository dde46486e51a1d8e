//! Picks the control flow that matches the backend and reports a unified result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::agent_loop::{ExecutionLoop, LoopEventSink, RunId, RunStatus};
use crate::config::LoopSettings;
use crate::error::TetherError;
use crate::planning::{draft_strategy, PlanningBridge};
use crate::provider::BackendClient;
use crate::tools::ToolRegistry;
use crate::types::{ToolCallResult, Usage};

/// Control flow used for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Native tool calling, bounded turns.
    ToolLoop,
    /// Plan / execute / synthesize over plain chat.
    Planning,
}

/// Outcome of [`Orchestrator::run`], whichever control flow ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub text: String,
    pub mode: RunMode,
    pub status: RunStatus,
    /// Strategy text used as the execution goal, when one was drafted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    pub executed_calls: Vec<ToolCallResult>,
    pub usage: Usage,
    pub finished_at: DateTime<Utc>,
}

/// Runs a goal against one backend and one tool catalog.
pub struct Orchestrator<'a> {
    client: &'a BackendClient,
    registry: &'a ToolRegistry,
    settings: LoopSettings,
    system: Option<String>,
    force_planning: bool,
    draft_strategy: bool,
    event_sink: Option<LoopEventSink>,
    cancel: Option<CancellationToken>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(client: &'a BackendClient, registry: &'a ToolRegistry) -> Self {
        Self {
            client,
            registry,
            settings: LoopSettings::default(),
            system: None,
            force_planning: false,
            draft_strategy: false,
            event_sink: None,
            cancel: None,
        }
    }

    pub fn settings(mut self, settings: LoopSettings) -> Self {
        self.settings = settings;
        self
    }

    /// System prompt for the tool loop; in planning mode it replaces the synthesis
    /// system prompt.
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Use the planning bridge even when the backend supports tool calling.
    pub fn force_planning(mut self, force: bool) -> Self {
        self.force_planning = force;
        self
    }

    /// Draft a strategy first and execute it instead of the raw goal.
    pub fn draft_strategy(mut self, draft: bool) -> Self {
        self.draft_strategy = draft;
        self
    }

    pub fn event_sink(mut self, sink: LoopEventSink) -> Self {
        self.event_sink = Some(sink);
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn mode(&self) -> RunMode {
        if self.force_planning || !self.client.adapter().supports_tool_calling() {
            RunMode::Planning
        } else {
            RunMode::ToolLoop
        }
    }

    pub async fn run(&self, goal: &str) -> Result<RunReport, TetherError> {
        let mode = self.mode();
        let mut usage = Usage::default();
        let strategy = if self.draft_strategy {
            let drafting = draft_strategy(
                self.client,
                goal,
                self.registry,
                self.settings.synthesis_temperature,
            );
            let strategy = match &self.cancel {
                Some(token) => tokio::select! {
                    _ = token.cancelled() => {
                        info!("run canceled while drafting strategy");
                        return Err(TetherError::Canceled);
                    }
                    strategy = drafting => strategy?,
                },
                None => drafting.await?,
            };
            Some(strategy).filter(|s| !s.is_empty())
        } else {
            None
        };
        let task = strategy.as_deref().unwrap_or(goal);
        info!(?mode, tools = self.registry.len(), "starting run");

        match mode {
            RunMode::ToolLoop => {
                let mut runner =
                    ExecutionLoop::new(self.client, self.registry).with_settings(&self.settings);
                if let Some(sink) = &self.event_sink {
                    runner = runner.event_sink(sink.clone());
                }
                if let Some(token) = &self.cancel {
                    runner = runner.cancel_token(token.clone());
                }
                let outcome = runner.run_goal(self.system.as_deref(), task).await?;
                usage.merge(&outcome.usage);
                Ok(RunReport {
                    run_id: outcome.run_id,
                    text: outcome.text,
                    mode,
                    status: outcome.status,
                    strategy,
                    executed_calls: outcome.tool_results,
                    usage,
                    finished_at: outcome.finished_at,
                })
            }
            RunMode::Planning => {
                let mut bridge =
                    PlanningBridge::new(self.client, self.registry).with_settings(&self.settings);
                if let Some(sink) = &self.event_sink {
                    bridge = bridge.event_sink(sink.clone());
                }
                if let Some(token) = &self.cancel {
                    bridge = bridge.cancel_token(token.clone());
                }
                if let Some(system) = &self.system {
                    bridge = bridge.synthesis_system(system.clone());
                }
                let outcome = bridge.run(task).await?;
                usage.merge(&outcome.usage);
                let executed_calls = outcome.executed.iter().map(|step| step.to_result()).collect();
                Ok(RunReport {
                    run_id: outcome.run_id,
                    text: outcome.text,
                    mode,
                    status: RunStatus::Completed,
                    strategy,
                    executed_calls,
                    usage,
                    finished_at: outcome.finished_at,
                })
            }
        }
    }
}

impl std::fmt::Debug for Orchestrator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("client", &self.client)
            .field("mode", &self.mode())
            .field("draft_strategy", &self.draft_strategy)
            .finish()
    }
}

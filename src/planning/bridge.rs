//! Plan / execute / synthesize pipeline for backends without native tool calling.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use super::plan::{parse_plan, ExecutionPlan, PlanStep};
use super::prompts;
use crate::agent_loop::events::{EventEmitter, LoopEventPayload, LoopEventSink};
use crate::agent_loop::{RunId, RunStatus};
use crate::config::LoopSettings;
use crate::conversation::Conversation;
use crate::error::TetherError;
use crate::provider::BackendClient;
use crate::tools::{ToolDispatcher, ToolRegistry};
use crate::types::{
    GenerationSettings, ToolCallArguments, ToolCallRequest, ToolCallResult, ToolOutcome, Usage,
};

/// A plan entry after dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutedStep {
    /// Synthetic correlation id (`plan-1`, `plan-2`, ...).
    pub call_id: String,
    pub tool_name: String,
    pub arguments: Map<String, Value>,
    pub purpose: Option<String>,
    pub outcome: ToolOutcome,
}

impl ExecutedStep {
    fn from_result(step: PlanStep, result: &ToolCallResult) -> Self {
        Self {
            call_id: result.call_id.clone(),
            tool_name: step.tool_name,
            arguments: step.arguments,
            purpose: step.purpose,
            outcome: result.outcome.clone(),
        }
    }

    pub fn to_result(&self) -> ToolCallResult {
        ToolCallResult {
            call_id: self.call_id.clone(),
            tool_name: self.tool_name.clone(),
            outcome: self.outcome.clone(),
        }
    }

    /// Record handed to the synthesis prompt.
    fn evidence(&self) -> Value {
        serde_json::json!({
            "tool_name": self.tool_name,
            "args": self.arguments,
            "purpose": self.purpose.as_deref().unwrap_or(""),
            "result": self.to_result().payload(),
        })
    }
}

/// Result of one planning-bridge invocation.
#[derive(Debug, Clone)]
pub struct PlanningOutcome {
    pub run_id: RunId,
    /// Synthesis text, verbatim. Empty when the backend returned no content.
    pub text: String,
    pub plan: ExecutionPlan,
    pub executed: Vec<ExecutedStep>,
    pub usage: Usage,
    pub finished_at: DateTime<Utc>,
}

/// Fixed three-phase pipeline: one plan call, sequential dispatch, one synthesis call.
///
/// No turn budget applies. Plan-decode failures degrade to an empty plan and tool
/// failures are reported to the synthesis call as evidence.
pub struct PlanningBridge<'a> {
    client: &'a BackendClient,
    registry: &'a ToolRegistry,
    dispatcher: ToolDispatcher,
    max_plan_steps: usize,
    plan_temperature: f64,
    synthesis_temperature: f64,
    synthesis_system: String,
    event_sink: Option<LoopEventSink>,
    cancel: Option<CancellationToken>,
}

impl<'a> PlanningBridge<'a> {
    pub fn new(client: &'a BackendClient, registry: &'a ToolRegistry) -> Self {
        let defaults = LoopSettings::default();
        Self {
            client,
            registry,
            dispatcher: ToolDispatcher::new(),
            max_plan_steps: defaults.max_plan_steps,
            plan_temperature: defaults.plan_temperature,
            synthesis_temperature: defaults.synthesis_temperature,
            synthesis_system: prompts::SYNTHESIS_SYSTEM.to_string(),
            event_sink: None,
            cancel: None,
        }
    }

    pub fn with_settings(mut self, settings: &LoopSettings) -> Self {
        self = self.max_plan_steps(settings.max_plan_steps);
        self.plan_temperature = settings.plan_temperature;
        self.synthesis_temperature = settings.synthesis_temperature;
        self.dispatcher = self.dispatcher.with_timeout(settings.tool_timeout());
        self
    }

    /// Zero keeps the current cap.
    pub fn max_plan_steps(mut self, max_plan_steps: usize) -> Self {
        if max_plan_steps > 0 {
            self.max_plan_steps = max_plan_steps;
        }
        self
    }

    /// System prompt for the synthesis call.
    pub fn synthesis_system(mut self, system: impl Into<String>) -> Self {
        self.synthesis_system = system.into();
        self
    }

    pub fn event_sink(mut self, sink: LoopEventSink) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Abandon the run when `token` fires, in whichever phase it is.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Run all three phases.
    pub async fn run(&self, goal: &str) -> Result<PlanningOutcome, TetherError> {
        let run_id = Uuid::new_v4();
        let emitter = EventEmitter::new(run_id, self.event_sink.clone());
        let mut usage = Usage::default();

        let (plan, plan_usage) = self.cancellable(&emitter, self.plan(goal)).await??;
        usage.merge(&plan_usage);
        emitter.emit(LoopEventPayload::PlanDecoded {
            steps: plan.len(),
            dropped: plan.dropped,
        });

        let executed = self
            .cancellable(&emitter, self.execute_with(&plan, &emitter))
            .await?;

        let (text, synthesis_usage) = self
            .cancellable(&emitter, self.synthesize(goal, &executed))
            .await??;
        usage.merge(&synthesis_usage);
        emitter.emit(LoopEventPayload::Finished {
            status: RunStatus::Completed,
        });

        Ok(PlanningOutcome {
            run_id,
            text,
            plan,
            executed,
            usage,
            finished_at: Utc::now(),
        })
    }

    /// Plan phase: ask for a JSON array of tool calls and validate it.
    pub async fn plan(&self, goal: &str) -> Result<(ExecutionPlan, Usage), TetherError> {
        let conversation = Conversation::with_goal(
            Some(prompts::PLANNER_SYSTEM),
            prompts::plan_prompt(goal, self.registry, self.max_plan_steps),
        );
        let completion = self
            .client
            .complete(
                &conversation,
                None,
                &GenerationSettings::with_temperature(self.plan_temperature),
            )
            .await?;
        let text = completion.turn.text();
        debug!(chars = text.len(), "plan text received");
        let plan = parse_plan(text, self.registry, self.max_plan_steps);
        info!(steps = plan.len(), dropped = plan.dropped, "plan decoded");
        Ok((plan, completion.usage))
    }

    /// Execute phase: dispatch every step in order, keeping failures as outcomes.
    pub async fn execute(&self, plan: &ExecutionPlan) -> Vec<ExecutedStep> {
        self.execute_with(plan, &EventEmitter::new(Uuid::nil(), None))
            .await
    }

    async fn execute_with(&self, plan: &ExecutionPlan, emitter: &EventEmitter) -> Vec<ExecutedStep> {
        let mut executed = Vec::with_capacity(plan.len());
        for (index, step) in plan.steps.iter().enumerate() {
            let request = ToolCallRequest::new(
                format!("plan-{}", index + 1),
                step.tool_name.clone(),
                ToolCallArguments::from(step.arguments.clone()),
            );
            emitter.emit(LoopEventPayload::ToolCallStarted {
                call_id: request.call_id.clone(),
                tool_name: request.tool_name.clone(),
            });
            let result = self.dispatcher.execute(&request, self.registry).await;
            emitter.emit(LoopEventPayload::ToolCallCompleted {
                result: result.clone(),
            });
            executed.push(ExecutedStep::from_result(step.clone(), &result));
        }
        executed
    }

    /// Synthesis phase: one more chat call over the goal and the full evidence record.
    pub async fn synthesize(
        &self,
        goal: &str,
        executed: &[ExecutedStep],
    ) -> Result<(String, Usage), TetherError> {
        let evidence: Vec<Value> = executed.iter().map(ExecutedStep::evidence).collect();
        let results_json = serde_json::to_string_pretty(&evidence)?;
        let conversation = Conversation::with_goal(
            Some(self.synthesis_system.as_str()),
            prompts::synthesis_prompt(goal, &results_json),
        );
        let completion = self
            .client
            .complete(
                &conversation,
                None,
                &GenerationSettings::with_temperature(self.synthesis_temperature),
            )
            .await?;
        Ok((completion.turn.text().to_string(), completion.usage))
    }

    async fn cancellable<T>(
        &self,
        emitter: &EventEmitter,
        future: impl Future<Output = T>,
    ) -> Result<T, TetherError> {
        let Some(token) = &self.cancel else {
            return Ok(future.await);
        };
        tokio::select! {
            _ = token.cancelled() => {
                info!("planning run canceled");
                emitter.emit(LoopEventPayload::Finished { status: RunStatus::Canceled });
                Err(TetherError::Canceled)
            }
            value = future => Ok(value),
        }
    }
}

impl std::fmt::Debug for PlanningBridge<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanningBridge")
            .field("client", &self.client)
            .field("tools", &self.registry.names())
            .field("max_plan_steps", &self.max_plan_steps)
            .finish()
    }
}

//! Bounded-turn tool-calling loop.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use super::events::{EventEmitter, LoopEventPayload, LoopEventSink};
use super::types::{LoopOutcome, RunStatus};
use crate::config::LoopSettings;
use crate::conversation::Conversation;
use crate::error::TetherError;
use crate::provider::BackendClient;
use crate::tools::{ToolDispatcher, ToolRegistry};
use crate::types::{AssistantTurn, GenerationSettings, Usage};

const DEFAULT_MAX_TURNS: usize = 3;

/// Drives a conversation through `awaiting model -> dispatching tools -> awaiting model`
/// until the backend answers without tool calls or the turn budget runs out.
///
/// Each turn resolves fully (model call, every dispatch, every result appended) before
/// the next model call. Results are appended in request order even when the calls of
/// one turn run concurrently.
pub struct ExecutionLoop<'a> {
    client: &'a BackendClient,
    registry: &'a ToolRegistry,
    dispatcher: ToolDispatcher,
    max_turns: usize,
    generation: GenerationSettings,
    parallel_tool_calls: bool,
    event_sink: Option<LoopEventSink>,
    cancel: Option<CancellationToken>,
}

impl<'a> ExecutionLoop<'a> {
    pub fn new(client: &'a BackendClient, registry: &'a ToolRegistry) -> Self {
        Self {
            client,
            registry,
            dispatcher: ToolDispatcher::new(),
            max_turns: DEFAULT_MAX_TURNS,
            generation: GenerationSettings::with_temperature(1.0),
            parallel_tool_calls: true,
            event_sink: None,
            cancel: None,
        }
    }

    /// Apply turn budget, tool temperature, concurrency and tool timeout from settings.
    pub fn with_settings(self, settings: &LoopSettings) -> Self {
        self.max_turns(settings.max_turns)
            .generation(GenerationSettings::with_temperature(settings.tool_temperature))
            .parallel_tool_calls(settings.parallel_tool_calls)
            .tool_timeout(settings.tool_timeout())
    }

    /// Zero keeps the current budget.
    pub fn max_turns(mut self, max_turns: usize) -> Self {
        if max_turns > 0 {
            self.max_turns = max_turns;
        }
        self
    }

    pub fn generation(mut self, generation: GenerationSettings) -> Self {
        self.generation = generation;
        self
    }

    pub fn parallel_tool_calls(mut self, parallel: bool) -> Self {
        self.parallel_tool_calls = parallel;
        self
    }

    pub fn tool_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.dispatcher = self.dispatcher.with_timeout(timeout);
        self
    }

    pub fn event_sink(mut self, sink: LoopEventSink) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Abandon the run when `token` fires; outstanding tool futures are dropped.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Run with a fresh transcript built from `system` and `goal`.
    pub async fn run_goal(
        &self,
        system: Option<&str>,
        goal: impl Into<String>,
    ) -> Result<LoopOutcome, TetherError> {
        self.run(Conversation::with_goal(system, goal)).await
    }

    /// Run to a final answer or budget exhaustion.
    ///
    /// Errors are protocol, transport and configuration failures only; tool faults come
    /// back to the model as failure payloads.
    pub async fn run(&self, mut conversation: Conversation) -> Result<LoopOutcome, TetherError> {
        let adapter = self.client.adapter();
        if !adapter.supports_tool_calling() {
            return Err(TetherError::protocol(format!(
                "provider '{}' has no native tool calling; drive it through the planning bridge",
                adapter.provider_name()
            )));
        }

        let run_id = Uuid::new_v4();
        let emitter = EventEmitter::new(run_id, self.event_sink.clone());
        let mut usage = Usage::default();
        let mut tool_results = Vec::new();
        let mut last_text = String::new();
        let mut turns = 0;

        let status = loop {
            if turns >= self.max_turns {
                info!(turns, "turn budget exhausted");
                break RunStatus::BudgetExhausted;
            }
            turns += 1;
            emitter.emit(LoopEventPayload::TurnStarted { turn: turns });
            debug!(
                provider = adapter.provider_name(),
                model = adapter.model_id(),
                turn = turns,
                "awaiting model"
            );

            let completion = self
                .cancellable(
                    &emitter,
                    self.client
                        .complete(&conversation, Some(self.registry), &self.generation),
                )
                .await??;
            usage.merge(&completion.usage);
            conversation.push_assistant(&completion.turn)?;
            last_text = completion.turn.text().to_string();
            emitter.emit(LoopEventPayload::AssistantTurn {
                turn: turns,
                text: last_text.clone(),
                tool_calls: completion.turn.requests().len(),
            });

            let requests = match &completion.turn {
                AssistantTurn::Final { .. } => break RunStatus::Completed,
                AssistantTurn::ToolRequested { requests, .. } => requests,
            };

            for request in requests {
                emitter.emit(LoopEventPayload::ToolCallStarted {
                    call_id: request.call_id.clone(),
                    tool_name: request.tool_name.clone(),
                });
            }
            let results = self
                .cancellable(
                    &emitter,
                    self.dispatcher
                        .execute_all(requests, self.registry, self.parallel_tool_calls),
                )
                .await?;

            for result in results {
                // Shaped by the adapter at re-entry: backends disagree on tool message fields.
                let message = adapter.encode_tool_result(&result);
                conversation.push_tool_message(message)?;
                emitter.emit(LoopEventPayload::ToolCallCompleted {
                    result: result.clone(),
                });
                tool_results.push(result);
            }
        };

        emitter.emit(LoopEventPayload::Finished { status });
        Ok(LoopOutcome {
            run_id,
            text: last_text,
            status,
            turns,
            conversation,
            tool_results,
            usage,
            finished_at: Utc::now(),
        })
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
                emitter.emit(LoopEventPayload::Finished { status: RunStatus::Canceled });
                Err(TetherError::Canceled)
            }
            value = future => Ok(value),
        }
    }
}

impl std::fmt::Debug for ExecutionLoop<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionLoop")
            .field("client", &self.client)
            .field("tools", &self.registry.names())
            .field("max_turns", &self.max_turns)
            .field("parallel_tool_calls", &self.parallel_tool_calls)
            .finish()
    }
}

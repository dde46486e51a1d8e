//! Isolated execution of single tool calls.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::future;
use futures::FutureExt;
use serde_json::Value;
use tracing::{info, warn};

use super::arguments::ToolArguments;
use super::registry::ToolRegistry;
use super::tool::ToolExecutionContext;
use super::validation::validate_arguments;
use crate::types::{ToolCallArguments, ToolCallRequest, ToolCallResult};
use crate::util::timeout::bounded;

/// Executes tool calls against a registry, turning every fault into a failure outcome.
#[derive(Debug, Clone, Default)]
pub struct ToolDispatcher {
    timeout: Option<Duration>,
}

impl ToolDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound each executor invocation; expiry becomes a failure outcome.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Execute one call. Never fails: unknown tools, bad arguments, executor errors,
    /// timeouts and panics are all reported through the result's outcome.
    pub async fn execute(&self, request: &ToolCallRequest, registry: &ToolRegistry) -> ToolCallResult {
        let Some(descriptor) = registry.get(&request.tool_name) else {
            warn!(tool = %request.tool_name, call_id = %request.call_id, "unknown tool requested");
            return ToolCallResult::failure(
                request,
                format!("unknown tool '{}'", request.tool_name),
            );
        };

        let values = match &request.arguments {
            ToolCallArguments::Parsed { values } => values,
            ToolCallArguments::Malformed { reason, .. } => {
                return ToolCallResult::failure(
                    request,
                    format!("invalid arguments for '{}': {reason}", request.tool_name),
                );
            }
        };
        if let Err(violation) = validate_arguments(values, &descriptor.parameters().schema) {
            return ToolCallResult::failure(
                request,
                format!("argument validation failed for '{}': {violation}", request.tool_name),
            );
        }

        info!(tool = %request.tool_name, call_id = %request.call_id, "calling tool");
        let args = ToolArguments::new(values.clone());
        let ctx = ToolExecutionContext::for_call(&request.call_id, &request.tool_name);
        let executor = descriptor.executor();
        let invocation = async {
            AssertUnwindSafe(executor.execute(&args, &ctx))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(crate::error::TetherError::tool(
                        request.tool_name.clone(),
                        format!("tool panicked: {}", panic_message(panic.as_ref())),
                    ))
                })
        };
        let outcome = bounded(self.timeout, invocation).await;

        match outcome {
            Ok(value) => {
                info!(tool = %request.tool_name, call_id = %request.call_id, "tool succeeded");
                ToolCallResult::success(request, stringify_output(&value))
            }
            Err(err) => {
                warn!(tool = %request.tool_name, call_id = %request.call_id, error = %err, "tool failed");
                ToolCallResult::failure(request, err.to_string())
            }
        }
    }

    /// Execute a batch. Results always come back in request order; with `parallel`
    /// the calls run concurrently.
    pub async fn execute_all(
        &self,
        requests: &[ToolCallRequest],
        registry: &ToolRegistry,
        parallel: bool,
    ) -> Vec<ToolCallResult> {
        if parallel {
            future::join_all(requests.iter().map(|request| self.execute(request, registry))).await
        } else {
            let mut results = Vec::with_capacity(requests.len());
            for request in requests {
                results.push(self.execute(request, registry).await);
            }
            results
        }
    }
}

/// Convert a raw tool return value into the text payload fed back to the model.
pub fn stringify_output(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

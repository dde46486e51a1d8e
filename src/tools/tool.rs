//! The executor contract every catalog entry implements.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use super::arguments::ToolArguments;
use super::types::ToolParameters;
use crate::error::TetherError;

/// Per-invocation details handed to an executor.
#[derive(Debug, Clone, Default)]
pub struct ToolExecutionContext {
    /// Correlation id of the call (`plan-N` for planned steps).
    pub call_id: Option<String>,
    /// Name the call was dispatched under.
    pub tool_name: String,
}

impl ToolExecutionContext {
    pub fn for_call(call_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            call_id: Some(call_id.into()),
            tool_name: tool_name.into(),
        }
    }
}

/// Something the backend can call by name.
///
/// `execute` receives arguments that already passed schema validation. Errors and
/// panics are caught by the dispatcher and reported to the model as failures.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters(&self) -> &ToolParameters;

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<Value, TetherError>;
}

type Handler =
    Arc<dyn Fn(ToolArguments, ToolExecutionContext) -> BoxFuture<'static, Result<Value, TetherError>> + Send + Sync>;

/// A [`Tool`] backed by an async closure.
#[derive(Clone)]
pub struct FnTool {
    name: String,
    description: String,
    parameters: ToolParameters,
    handler: Handler,
}

impl FnTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, TetherError>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |args, ctx| Box::pin(handler(args, ctx)));
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler,
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<Value, TetherError> {
        (self.handler)(args.clone(), ctx.clone()).await
    }
}

impl std::fmt::Debug for FnTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool").field("name", &self.name).finish()
    }
}

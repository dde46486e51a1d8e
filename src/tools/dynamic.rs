//! Runtime-discovered tool catalogs (e.g., MCP servers).

use std::sync::Arc;

use async_trait::async_trait;

use super::arguments::ToolArguments;
use super::tool::{Tool, ToolExecutionContext};
use super::types::ToolParameters;
use crate::error::TetherError;

/// A tool advertised by an external catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: ToolParameters,
}

/// A catalog that can list its tools and execute them by name.
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// Label used in logs and errors.
    fn source_name(&self) -> &str;

    /// List available tools.
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, TetherError>;

    /// Execute a tool by name.
    async fn execute_tool(
        &self,
        name: &str,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value, TetherError>;
}

/// Exposes one catalog entry through the core [`Tool`] trait.
pub struct SourcedTool {
    source: Arc<dyn ToolSource>,
    spec: ToolSpec,
}

impl SourcedTool {
    pub fn new(source: Arc<dyn ToolSource>, spec: ToolSpec) -> Self {
        Self { source, spec }
    }

    /// Discover every tool of `source` and wrap each one.
    pub async fn discover(source: Arc<dyn ToolSource>) -> Result<Vec<Arc<dyn Tool>>, TetherError> {
        let specs = source.list_tools().await?;
        tracing::debug!(
            source = source.source_name(),
            count = specs.len(),
            "discovered tools"
        );
        Ok(specs
            .into_iter()
            .map(|spec| Arc::new(Self::new(Arc::clone(&source), spec)) as Arc<dyn Tool>)
            .collect())
    }
}

#[async_trait]
impl Tool for SourcedTool {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn description(&self) -> &str {
        &self.spec.description
    }

    fn parameters(&self) -> &ToolParameters {
        &self.spec.parameters
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value, TetherError> {
        self.source.execute_tool(&self.spec.name, args, ctx).await
    }
}

impl std::fmt::Debug for SourcedTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourcedTool")
            .field("source", &self.source.source_name())
            .field("name", &self.spec.name)
            .finish()
    }
}

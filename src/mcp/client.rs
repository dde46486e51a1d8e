//! Stdio MCP server exposed as a [`ToolSource`].

use std::sync::Arc;

use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParams, CallToolResult, Content, JsonObject, ResourceContents},
    service::{DynService, RoleClient, RunningService, ServiceError, ServiceExt},
    transport::TokioChildProcess,
};
use serde_json::Value;
use tokio::process::Command;
use tracing::info;

use crate::config::{McpConfigFile, McpServerConfig};
use crate::error::TetherError;
use crate::tools::{ToolArguments, ToolExecutionContext, ToolParameters, ToolSource, ToolSpec};

type DynClientService = Box<dyn DynService<RoleClient>>;
pub type McpRunningService = RunningService<RoleClient, DynClientService>;

/// One connected MCP server. Dropping it shuts the session down.
pub struct McpToolSource {
    name: String,
    session: McpRunningService,
}

impl McpToolSource {
    /// Spawn `config.command` and complete the MCP handshake over its stdio.
    pub async fn spawn(name: impl Into<String>, config: &McpServerConfig) -> Result<Self, TetherError> {
        let name = name.into();
        let mut command = Command::new(&config.command);
        command.args(&config.args).envs(&config.env);
        let transport = TokioChildProcess::new(command)?;
        let session = ().into_dyn().serve(transport).await.map_err(|e| {
            TetherError::Configuration(format!("MCP server '{name}' failed to initialize: {e}"))
        })?;
        info!(server = %name, command = %config.command, "MCP server connected");
        Ok(Self::from_running_service(name, session))
    }

    /// Wrap an rmcp session whose handshake already completed.
    pub fn from_running_service(name: impl Into<String>, session: McpRunningService) -> Self {
        Self {
            name: name.into(),
            session,
        }
    }

    /// Connect every stdio server listed in `config`.
    pub async fn spawn_all(config: &McpConfigFile) -> Result<Vec<Arc<dyn ToolSource>>, TetherError> {
        let mut sources: Vec<Arc<dyn ToolSource>> = Vec::new();
        for (name, server) in config.stdio_servers() {
            sources.push(Arc::new(Self::spawn(name, server).await?));
        }
        Ok(sources)
    }
}

#[async_trait]
impl ToolSource for McpToolSource {
    fn source_name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<ToolSpec>, TetherError> {
        let tools = self
            .session
            .list_all_tools()
            .await
            .map_err(|e| map_service_error(&self.name, "list_tools", e))?;
        Ok(tools.into_iter().map(map_tool_spec).collect())
    }

    async fn execute_tool(
        &self,
        name: &str,
        args: &ToolArguments,
        _ctx: &ToolExecutionContext,
    ) -> Result<Value, TetherError> {
        let arguments: Option<JsonObject> = if args.raw().is_empty() {
            None
        } else {
            Some(args.raw().clone())
        };
        let result = self
            .session
            .call_tool(CallToolRequestParams {
                meta: None,
                name: name.to_owned().into(),
                arguments,
                task: None,
            })
            .await
            .map_err(|e| match map_service_error(&self.name, "call_tool", e) {
                TetherError::Timeout(ms) => TetherError::Timeout(ms),
                other => TetherError::tool(name, other.to_string()),
            })?;
        map_call_result(name, result)
    }
}

impl std::fmt::Debug for McpToolSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpToolSource").field("name", &self.name).finish()
    }
}

fn map_tool_spec(tool: rmcp::model::Tool) -> ToolSpec {
    ToolSpec {
        name: tool.name.to_string(),
        description: tool.description.map(|d| d.to_string()).unwrap_or_default(),
        parameters: ToolParameters::from_schema(Value::Object((*tool.input_schema).clone())),
    }
}

fn extract_text_content(content: &[Content]) -> Option<String> {
    let mut lines = Vec::new();
    for item in content {
        if let Some(text) = item.as_text() {
            lines.push(text.text.clone());
            continue;
        }
        if let Some(resource) = item.as_resource() {
            if let ResourceContents::TextResourceContents { text, .. } = &resource.resource {
                lines.push(text.clone());
            }
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Structured content wins, then joined text, then the raw content array.
/// `isError` results become tool errors.
fn map_call_result(name: &str, result: CallToolResult) -> Result<Value, TetherError> {
    let text_content = extract_text_content(&result.content);

    if result.is_error.unwrap_or(false) {
        let message = result
            .structured_content
            .as_ref()
            .map(|v| v.to_string())
            .or(text_content)
            .unwrap_or_else(|| "MCP tool returned an error result".into());
        return Err(TetherError::tool(name, message));
    }

    if let Some(structured) = result.structured_content {
        return Ok(structured);
    }
    if let Some(text) = text_content {
        return Ok(Value::String(text));
    }
    Ok(Value::Array(
        result
            .content
            .iter()
            .filter_map(|item| serde_json::to_value(item).ok())
            .collect(),
    ))
}

fn map_service_error(server: &str, context: &str, error: ServiceError) -> TetherError {
    match error {
        ServiceError::Timeout { timeout } => TetherError::Timeout(timeout.as_millis() as u64),
        other => TetherError::protocol(format!("MCP server '{server}' {context}: {other}")),
    }
}

//! MCP server catalog file (`{"mcpServers": {...}}`).

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TetherError;

/// Launch description for one stdio MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Transport hint; only `stdio` is launched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,
}

/// Parsed catalog, servers ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpConfigFile {
    #[serde(rename = "mcpServers", default)]
    pub servers: BTreeMap<String, McpServerConfig>,
}

impl McpConfigFile {
    pub fn from_json(raw: &str) -> Result<Self, TetherError> {
        serde_json::from_str(raw)
            .map_err(|e| TetherError::Configuration(format!("invalid MCP config: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TetherError> {
        let raw = fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    /// Servers that can be launched over stdio.
    pub fn stdio_servers(&self) -> impl Iterator<Item = (&str, &McpServerConfig)> {
        self.servers.iter().filter_map(|(name, server)| {
            match server.transport.as_deref() {
                None | Some("stdio") => Some((name.as_str(), server)),
                Some(other) => {
                    tracing::warn!(server = %name, transport = other, "skipping non-stdio MCP server");
                    None
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_servers_with_optional_fields() {
        let config = McpConfigFile::from_json(
            r#"{
                "mcpServers": {
                    "weather": {"command": "python", "args": ["weather_server.py"]},
                    "neo4j": {
                        "command": "uvx",
                        "args": ["mcp-neo4j-cypher"],
                        "env": {"NEO4J_URI": "bolt://localhost:7687"}
                    },
                    "remote": {"command": "unused", "transport": "streamable_http"}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.servers.len(), 3);
        assert_eq!(config.servers["weather"].args, vec!["weather_server.py"]);
        assert_eq!(
            config.servers["neo4j"].env.get("NEO4J_URI").map(String::as_str),
            Some("bolt://localhost:7687")
        );
        let stdio: Vec<&str> = config.stdio_servers().map(|(name, _)| name).collect();
        assert_eq!(stdio, vec!["neo4j", "weather"]);
    }

    #[test]
    fn missing_key_yields_empty_catalog() {
        assert!(McpConfigFile::from_json("{}").unwrap().servers.is_empty());
        assert!(matches!(
            McpConfigFile::from_json("[1, 2]"),
            Err(TetherError::Configuration(_))
        ));
    }
}

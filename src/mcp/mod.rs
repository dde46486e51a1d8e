//! Model Context Protocol (MCP) tool sources.

pub mod client;

pub use client::{McpRunningService, McpToolSource};

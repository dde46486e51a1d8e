//! CLI surface for tether.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::LoopSettings;

/// Tool-calling orchestration over chat backends.
#[derive(Parser, Debug)]
#[command(name = "tether", version, about = "Run a goal against a chat backend with MCP tools")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a goal to completion
    Run(RunArgs),
    /// List the tools discovered from MCP servers
    Tools(ToolsArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Model to use (format: provider:model, e.g., openai:gpt-4o-mini)
    #[arg(short, long, default_value = "openai:gpt-4o-mini")]
    pub model: String,

    /// MCP config file (`{"mcpServers": {...}}`)
    #[arg(long)]
    pub mcp_config: Option<PathBuf>,

    /// Turn budget for the tool loop
    #[arg(long)]
    pub max_turns: Option<usize>,

    /// Use plan / execute / synthesize even when the backend supports tool calling
    #[arg(long)]
    pub planning: bool,

    /// Draft a step-by-step strategy before executing
    #[arg(long)]
    pub strategy: bool,

    /// System prompt
    #[arg(short, long)]
    pub system: Option<String>,

    /// Goal (positional)
    pub goal: String,
}

impl RunArgs {
    /// Apply command-line overrides on top of file and environment settings.
    pub fn apply(&self, mut settings: LoopSettings) -> LoopSettings {
        if let Some(max_turns) = self.max_turns.filter(|&n| n > 0) {
            settings.max_turns = max_turns;
        }
        settings
    }
}

/// Arguments for the `tools` subcommand.
#[derive(Parser, Debug)]
pub struct ToolsArgs {
    /// MCP config file (`{"mcpServers": {...}}`)
    #[arg(long)]
    pub mcp_config: PathBuf,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_with_defaults() {
        let cli = Cli::try_parse_from(["tether", "run", "what is 2 + 3?"]).unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.model, "openai:gpt-4o-mini");
                assert!(args.mcp_config.is_none());
                assert!(args.max_turns.is_none());
                assert!(!args.planning);
                assert!(!args.strategy);
                assert!(args.system.is_none());
                assert_eq!(args.goal, "what is 2 + 3?");
            }
            other => panic!("expected Run, got {other:?}"),
        }
    }

    #[test]
    fn parse_run_with_all_options() {
        let cli = Cli::try_parse_from([
            "tether",
            "run",
            "-m",
            "ollama:llama3.1",
            "--mcp-config",
            "servers.json",
            "--max-turns",
            "5",
            "--planning",
            "--strategy",
            "-s",
            "Be brief",
            "weather in Oslo",
        ])
        .unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.model, "ollama:llama3.1");
                assert_eq!(args.mcp_config, Some(PathBuf::from("servers.json")));
                assert_eq!(args.max_turns, Some(5));
                assert!(args.planning);
                assert!(args.strategy);
                assert_eq!(args.system.as_deref(), Some("Be brief"));
                assert_eq!(args.goal, "weather in Oslo");
            }
            other => panic!("expected Run, got {other:?}"),
        }
    }

    #[test]
    fn max_turns_override_ignores_zero() {
        let args = match Cli::try_parse_from(["tether", "run", "--max-turns", "0", "hi"])
            .unwrap()
            .command
        {
            Commands::Run(args) => args,
            other => panic!("expected Run, got {other:?}"),
        };
        assert_eq!(args.apply(LoopSettings::default()).max_turns, 3);
    }

    #[test]
    fn parse_tools_requires_config() {
        assert!(Cli::try_parse_from(["tether", "tools"]).is_err());
        let cli = Cli::try_parse_from(["tether", "tools", "--mcp-config", "c.json"]).unwrap();
        assert!(matches!(cli.command, Commands::Tools(args) if args.mcp_config == PathBuf::from("c.json")));
    }

    #[test]
    fn parse_run_missing_goal_is_error() {
        assert!(Cli::try_parse_from(["tether", "run"]).is_err());
    }
}

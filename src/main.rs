//! Tether CLI binary entry point.

use std::sync::Arc;

use tether::agent_loop::{LoopEvent, LoopEventPayload};
use tether::cli::{Cli, Commands, RunArgs, ToolsArgs};
use tether::config::{LoopSettings, McpConfigFile, TetherConfig};
use tether::error::{RecoverySuggestion, TetherError};
use tether::mcp::McpToolSource;
use tether::models::ModelId;
use tether::orchestrator::Orchestrator;
use tether::provider::create_backend;
use tether::tools::ToolRegistry;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse_args();

    let result = match cli.command {
        Commands::Run(args) => handle_run(args).await,
        Commands::Tools(args) => handle_tools(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        if let Some(hint) = e.downcast_ref::<TetherError>().and_then(recovery_hint) {
            eprintln!("Hint: {hint}");
        }
        std::process::exit(1);
    }
}

fn recovery_hint(error: &TetherError) -> Option<&'static str> {
    match error.recovery_suggestion() {
        RecoverySuggestion::CheckCredentials => Some("check the provider API key variables"),
        RecoverySuggestion::CheckConfiguration => Some("check the model id and config files"),
        RecoverySuggestion::SwitchControlFlow => Some("try again with --planning"),
        RecoverySuggestion::IncreaseTimeout => Some("raise request_timeout_ms in tether.toml"),
        _ => None,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tether=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn load_registry(config: &McpConfigFile) -> Result<ToolRegistry, Box<dyn std::error::Error>> {
    let sources = McpToolSource::spawn_all(config).await?;
    Ok(ToolRegistry::from_sources(Vec::new(), &sources).await?)
}

async fn handle_run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let model: ModelId = args.model.parse().map_err(|e| {
        format!(
            "Invalid model '{}': {e}. Use provider:model (e.g. openai:gpt-4o-mini)",
            args.model
        )
    })?;

    let config = TetherConfig::from_env();
    let settings = args.apply(LoopSettings::load()?);
    let client = create_backend(&model, &config, &settings)?;

    let registry = match &args.mcp_config {
        Some(path) => load_registry(&McpConfigFile::from_file(path)?).await?,
        None => ToolRegistry::empty(),
    };

    let sink = Arc::new(|event: LoopEvent| match &event.payload {
        LoopEventPayload::TurnStarted { turn } => eprintln!("turn {turn}"),
        LoopEventPayload::ToolCallStarted { call_id, tool_name } => {
            eprintln!("-> {tool_name} ({call_id})");
        }
        LoopEventPayload::ToolCallCompleted { result } => {
            let payload = result.payload();
            let shown = match payload.char_indices().nth(200) {
                Some((end, _)) => format!("{}...", &payload[..end]),
                None => payload,
            };
            let mark = if result.is_error() { "error" } else { "ok" };
            eprintln!("   {mark}: {shown}");
        }
        LoopEventPayload::PlanDecoded { steps, dropped } => {
            eprintln!("plan: {steps} step(s), {dropped} dropped");
        }
        LoopEventPayload::Finished { status } => eprintln!("finished: {status:?}"),
        LoopEventPayload::AssistantTurn { .. } => {}
    });

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let mut orchestrator = Orchestrator::new(&client, &registry)
        .settings(settings)
        .force_planning(args.planning)
        .draft_strategy(args.strategy)
        .event_sink(sink)
        .cancel_token(cancel);
    if let Some(system) = &args.system {
        orchestrator = orchestrator.system(system.clone());
    }

    let report = orchestrator.run(&args.goal).await?;
    if let Some(strategy) = &report.strategy {
        eprintln!("strategy:\n{strategy}");
    }
    println!("{}", report.text);
    Ok(())
}

async fn handle_tools(args: ToolsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let registry = load_registry(&McpConfigFile::from_file(&args.mcp_config)?).await?;
    if registry.is_empty() {
        println!("(no tools configured)");
        return Ok(());
    }
    for tool in registry.iter() {
        println!("{}: {}", tool.name(), tool.description());
    }
    Ok(())
}

//! Strategy drafting: a tool-aware, numbered step list produced by a plain chat call.

use tracing::debug;

use super::prompts;
use crate::conversation::Conversation;
use crate::error::TetherError;
use crate::provider::BackendClient;
use crate::tools::ToolRegistry;
use crate::types::GenerationSettings;

/// Ask the backend how it would approach `goal` with the tools in `registry`.
///
/// Only names and descriptions are shown; no tool catalog is attached, so this works
/// with planning backends too. The returned text is meant to be used as the goal of
/// the execution phase.
pub async fn draft_strategy(
    client: &BackendClient,
    goal: &str,
    registry: &ToolRegistry,
    temperature: f64,
) -> Result<String, TetherError> {
    let conversation = Conversation::with_goal(
        Some(prompts::STRATEGY_SYSTEM),
        prompts::strategy_prompt(goal, registry),
    );
    let completion = client
        .complete(
            &conversation,
            None,
            &GenerationSettings::with_temperature(temperature),
        )
        .await?;
    let strategy = completion.turn.text().trim().to_string();
    debug!(chars = strategy.len(), "strategy drafted");
    Ok(strategy)
}

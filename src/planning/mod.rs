//! Planning bridge: plan, execute and synthesize over plain chat completions.

pub mod bridge;
pub mod plan;
pub mod prompts;
pub mod strategy;

pub use bridge::{ExecutedStep, PlanningBridge, PlanningOutcome};
pub use plan::{parse_plan, strip_code_fence, ExecutionPlan, PlanStep};
pub use strategy::draft_strategy;

//! Convenience re-exports for common use.

pub use crate::agent_loop::{ExecutionLoop, LoopEvent, LoopEventPayload, LoopOutcome, RunStatus};
pub use crate::config::{LoopSettings, TetherConfig};
pub use crate::conversation::Conversation;
pub use crate::error::{Result, TetherError};
pub use crate::models::{ModelId, ProviderKind};
pub use crate::orchestrator::{Orchestrator, RunMode, RunReport};
pub use crate::planning::PlanningBridge;
pub use crate::provider::{BackendClient, ChatTransport, ProviderAdapter};
pub use crate::tools::{FnTool, Tool, ToolArguments, ToolDispatcher, ToolParameters, ToolRegistry};
pub use crate::types::{
    AssistantTurn, ConversationMessage, GenerationSettings, Role, ToolCallRequest, ToolCallResult,
    ToolOutcome, Usage,
};

//! Execution loop primitives (runs, events, outcomes).

pub mod events;
pub mod runner;
pub mod types;

pub use events::{LoopEvent, LoopEventPayload, LoopEventSink};
pub use runner::ExecutionLoop;
pub use types::{LoopOutcome, RunId, RunStatus};

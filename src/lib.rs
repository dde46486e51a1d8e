//! Tether: provider-agnostic tool-calling orchestration.
//!
//! A [`tools::ToolRegistry`] describes what can be called, a
//! [`conversation::Conversation`] records what was said, and a
//! [`provider::ProviderAdapter`] translates both to and from one chat backend.
//! Backends with native tool calling run through the bounded
//! [`agent_loop::ExecutionLoop`]; the rest go through the plan / execute /
//! synthesize [`planning::PlanningBridge`].
//!
//! # Quick Start
//!
//! ```no_run
//! use tether::prelude::*;
//!
//! # async fn example() -> tether::error::Result<()> {
//! let model: ModelId = "openai:gpt-4o-mini".parse()?;
//! let settings = LoopSettings::default();
//! let client = tether::provider::create_backend(&model, &TetherConfig::from_env(), &settings)?;
//! let registry = ToolRegistry::empty();
//! let report = Orchestrator::new(&client, &registry).run("Say hello").await?;
//! println!("{}", report.text);
//! # Ok(())
//! # }
//! ```

pub mod agent_loop;
pub mod config;
pub mod conversation;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod planning;
pub mod prelude;
pub mod provider;
pub mod tools;
pub mod types;
pub mod util;

#[cfg(feature = "mcp")]
pub mod mcp;

#[cfg(feature = "cli")]
pub mod cli;

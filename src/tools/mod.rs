//! Tool system: catalog, argument handling and isolated dispatch.

pub mod arguments;
pub mod dispatcher;
pub mod dynamic;
pub mod registry;
pub mod tool;
pub mod types;
pub mod validation;

pub use arguments::ToolArguments;
pub use dispatcher::ToolDispatcher;
pub use dynamic::{SourcedTool, ToolSource, ToolSpec};
pub use registry::{ToolDescriptor, ToolRegistry};
pub use tool::{FnTool, Tool, ToolExecutionContext};
pub use types::{ParameterBuilder, ToolParameters};

//! Immutable tool catalog keyed by name.

use std::collections::HashMap;
use std::sync::Arc;

use super::dynamic::{SourcedTool, ToolSource};
use super::tool::Tool;
use super::types::ToolParameters;
use crate::error::TetherError;

/// Catalog entry: the invocation schema plus the executor handle.
#[derive(Clone)]
pub struct ToolDescriptor {
    name: String,
    description: String,
    parameters: ToolParameters,
    executor: Arc<dyn Tool>,
}

impl ToolDescriptor {
    fn from_tool(executor: Arc<dyn Tool>) -> Self {
        Self {
            name: executor.name().to_string(),
            description: executor.description().to_string(),
            parameters: executor.parameters().clone(),
            executor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    pub fn executor(&self) -> &Arc<dyn Tool> {
        &self.executor
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// Read-only mapping from tool name to descriptor, built once per session.
///
/// Registration order is preserved so catalogs sent to backends are stable.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    descriptors: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Build a registry; two tools sharing a name is an error.
    pub fn new(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Result<Self, TetherError> {
        let mut registry = Self::default();
        for tool in tools {
            let descriptor = ToolDescriptor::from_tool(tool);
            if registry.index.contains_key(descriptor.name()) {
                return Err(TetherError::DuplicateTool(descriptor.name));
            }
            registry
                .index
                .insert(descriptor.name.clone(), registry.descriptors.len());
            registry.descriptors.push(descriptor);
        }
        Ok(registry)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge local tools with every tool discovered from `sources`.
    pub async fn from_sources(
        local: Vec<Arc<dyn Tool>>,
        sources: &[Arc<dyn ToolSource>],
    ) -> Result<Self, TetherError> {
        let mut tools = local;
        for source in sources {
            tools.extend(SourcedTool::discover(Arc::clone(source)).await?);
        }
        Self::new(tools)
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&idx| &self.descriptors[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.descriptors.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::tool::FnTool;

    fn noop(name: &str) -> Arc<dyn Tool> {
        Arc::new(FnTool::new(
            name,
            format!("{name} tool"),
            ToolParameters::empty(),
            |_args, _ctx| async { Ok::<_, TetherError>(serde_json::Value::Null) },
        ))
    }

    #[test]
    fn preserves_registration_order() {
        let registry = ToolRegistry::new(vec![noop("b"), noop("a"), noop("c")]).unwrap();
        assert_eq!(registry.names(), vec!["b", "a", "c"]);
        assert_eq!(registry.get("a").map(|d| d.description()), Some("a tool"));
        assert!(registry.get("z").is_none());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = ToolRegistry::new(vec![noop("add"), noop("add")]).unwrap_err();
        assert!(matches!(err, TetherError::DuplicateTool(name) if name == "add"));
    }
}

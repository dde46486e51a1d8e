//! Decoding model-emitted plan text into validated steps.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::tools::ToolRegistry;
use crate::types::message::json_type_name;

/// One validated plan entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub tool_name: String,
    pub arguments: Map<String, Value>,
    /// Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
}

/// Ordered steps plus a count of entries that were rejected or cut.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub steps: Vec<PlanStep>,
    /// Entries dropped for naming unknown tools, malformed shape, or exceeding the cap.
    pub dropped: usize,
    /// Whether the text decoded to a JSON array at all.
    pub decoded: bool,
}

impl ExecutionPlan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }
}

/// Decode `text` into a plan.
///
/// Invalid JSON or a non-array top level yields an empty plan. Entries that are not
/// objects, name a tool missing from `registry`, or carry non-object arguments are
/// skipped. At most `max_steps` valid entries are kept.
pub fn parse_plan(text: &str, registry: &ToolRegistry, max_steps: usize) -> ExecutionPlan {
    let body = strip_code_fence(text);
    let entries = match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(entries)) => entries,
        Ok(other) => {
            warn!(kind = json_type_name(&other), "plan is not a JSON array; using empty plan");
            return ExecutionPlan::default();
        }
        Err(err) => {
            warn!(error = %err, "plan is not valid JSON; using empty plan");
            return ExecutionPlan::default();
        }
    };

    let total = entries.len();
    let mut steps = Vec::new();
    for (index, entry) in entries.into_iter().enumerate() {
        if steps.len() >= max_steps {
            warn!(max_steps, remaining = total - index, "plan exceeds step cap; truncating");
            break;
        }
        match validate_entry(entry, registry) {
            Ok(step) => steps.push(step),
            Err(reason) => warn!(index, reason = %reason, "dropping plan entry"),
        }
    }

    ExecutionPlan {
        dropped: total - steps.len(),
        steps,
        decoded: true,
    }
}

fn validate_entry(entry: Value, registry: &ToolRegistry) -> Result<PlanStep, String> {
    let mut fields = match entry {
        Value::Object(fields) => fields,
        other => return Err(format!("entry is a {}, not an object", json_type_name(&other))),
    };
    let tool_name = match fields.remove("tool_name") {
        Some(Value::String(name)) => name,
        _ => return Err("missing tool_name".to_string()),
    };
    if !registry.contains(&tool_name) {
        return Err(format!("unknown tool '{tool_name}'"));
    }
    let arguments = match fields.remove("args").or_else(|| fields.remove("arguments")) {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(arguments)) => arguments,
        Some(other) => {
            return Err(format!(
                "arguments for '{tool_name}' are a {}, not an object",
                json_type_name(&other)
            ))
        }
    };
    let purpose = match fields.remove("purpose") {
        Some(Value::String(purpose)) if !purpose.trim().is_empty() => Some(purpose),
        _ => None,
    };
    Ok(PlanStep {
        tool_name,
        arguments,
        purpose,
    })
}

/// Remove a surrounding Markdown code fence (```json ... ```), if present.
pub fn strip_code_fence(text: &str) -> &str {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    let trimmed = text.trim();
    let fence = FENCE.get_or_init(|| Regex::new(r"(?s)^```[A-Za-z0-9_-]*\s*\n?(.*?)\n?\s*```$").ok());
    fence
        .as_ref()
        .and_then(|re| re.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::error::TetherError;
    use crate::tools::{FnTool, Tool, ToolParameters};

    fn registry() -> ToolRegistry {
        let tools: Vec<Arc<dyn Tool>> = ["search", "fetch"]
            .into_iter()
            .map(|name| {
                Arc::new(FnTool::new(name, name, ToolParameters::empty(), |_args, _ctx| async {
                    Ok::<_, TetherError>(Value::Null)
                })) as Arc<dyn Tool>
            })
            .collect();
        ToolRegistry::new(tools).unwrap()
    }

    #[test]
    fn invalid_json_or_non_array_gives_empty_plan() {
        let plan = parse_plan("not valid json", &registry(), 5);
        assert!(plan.is_empty());
        assert!(!plan.decoded);

        let plan = parse_plan(r#"{"tool_name": "search"}"#, &registry(), 5);
        assert!(plan.is_empty());
    }

    #[test]
    fn drops_unknown_tools_and_non_object_arguments() {
        let text = json!([
            {"tool_name": "search", "args": {"q": "rust"}, "purpose": "find docs"},
            {"tool_name": "delete_everything", "args": {}},
            {"tool_name": "fetch", "args": "url=http://x"},
            "search",
            {"tool_name": "fetch", "arguments": {"url": "http://example.com"}}
        ])
        .to_string();

        let plan = parse_plan(&text, &registry(), 5);
        assert_eq!(plan.dropped, 3);
        assert_eq!(
            plan.steps,
            vec![
                PlanStep {
                    tool_name: "search".into(),
                    arguments: json!({"q": "rust"}).as_object().cloned().unwrap(),
                    purpose: Some("find docs".into()),
                },
                PlanStep {
                    tool_name: "fetch".into(),
                    arguments: json!({"url": "http://example.com"}).as_object().cloned().unwrap(),
                    purpose: None,
                },
            ]
        );
    }

    #[test]
    fn long_plans_are_truncated_not_rejected() {
        let entries: Vec<Value> = (0..8)
            .map(|i| json!({"tool_name": "search", "args": {"q": i}}))
            .collect();
        let plan = parse_plan(&Value::Array(entries).to_string(), &registry(), 5);
        assert_eq!(plan.len(), 5);
        assert_eq!(plan.dropped, 3);
        assert_eq!(plan.steps[4].arguments["q"], 4);
    }

    #[test]
    fn strips_markdown_fences() {
        let text = "```json\n[{\"tool_name\": \"search\", \"args\": {}}]\n```";
        assert_eq!(strip_code_fence(text), "[{\"tool_name\": \"search\", \"args\": {}}]");
        assert_eq!(parse_plan(text, &registry(), 5).len(), 1);
        assert_eq!(strip_code_fence("  []  "), "[]");
    }
}

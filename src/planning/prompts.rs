//! Prompt text for the plan, synthesis and strategy calls.

use crate::tools::ToolRegistry;

pub const PLANNER_SYSTEM: &str =
    "You are a meticulous planner that outputs ONLY valid JSON when asked.";

pub const SYNTHESIS_SYSTEM: &str =
    "You are a helpful assistant that answers the user's request from the evidence provided.";

pub const STRATEGY_SYSTEM: &str = "You are a task planner.";

/// `- name: description` per tool, or a placeholder when the catalog is empty.
pub fn tool_listing(registry: &ToolRegistry) -> String {
    if registry.is_empty() {
        return "- (no tools configured)".to_string();
    }
    registry
        .iter()
        .map(|tool| format!("- {}: {}", tool.name(), tool.description()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ask for a JSON array of `{tool_name, args, purpose}` entries.
pub fn plan_prompt(goal: &str, registry: &ToolRegistry, max_steps: usize) -> String {
    let names = registry.names().join(", ");
    format!(
        r#"You are an execution agent. The goal to accomplish is:

{goal}

You have access to the following tools, which can be executed for you:

{tools}

Your job now is ONLY to propose which tools to call, in what order, and with what arguments.
Return STRICTLY a JSON array, no prose, of the form:

[
  {{
    "tool_name": "<one of: {names}>",
    "args": {{
      "...": "..."
    }},
    "purpose": "short description of why you are calling this tool"
  }}
]

Constraints:

- Make sure "args" is a valid JSON object, not a string.
- Don't request more than {max_steps} tool calls total.
- Return [] if no tool is needed.
- Do NOT include any text before or after the JSON.
"#,
        tools = tool_listing(registry),
    )
}

/// Ask for the user-facing answer given every executed call and its outcome.
pub fn synthesis_prompt(goal: &str, results_json: &str) -> String {
    format!(
        r#"The original goal was:

{goal}

The following tool calls have been executed, with these results:

{results_json}

Now, write the final response to the user that accomplishes their goal.
- Use the tool results as your evidence.
- If a call failed, work with the remaining results and say what could not be determined.
- Do NOT mention tools, JSON, or internal steps.
- Just give a clear, concise answer.
"#
    )
}

/// Ask for a numbered, tool-aware list of steps without executing anything.
pub fn strategy_prompt(goal: &str, registry: &ToolRegistry) -> String {
    format!(
        r#"The user has a task: {goal}

You have access to the following tools (by name only; you will NOT execute them here):
{tools}

Your job is to:
1. Think step by step about how you would solve the task.
2. Decide whether you would use any of these tools and why.
3. Output a clear, numbered list of steps to execute this plan.

Important:
- Do NOT actually call any tools.
- Do NOT add extra commentary; just the steps.
"#,
        tools = tool_listing(registry),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_catalog_gets_placeholder() {
        let registry = ToolRegistry::empty();
        assert_eq!(tool_listing(&registry), "- (no tools configured)");
        assert!(strategy_prompt("book a table", &registry).contains("(no tools configured)"));
    }

    #[test]
    fn plan_prompt_states_the_cap() {
        let prompt = plan_prompt("weather in Oslo", &ToolRegistry::empty(), 5);
        assert!(prompt.contains("weather in Oslo"));
        assert!(prompt.contains("more than 5 tool calls"));
    }
}

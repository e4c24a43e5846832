//! The agent nodes of the task graph.
//!
//! Each agent is a pure async function `(NodeContext, AgentState) ->
//! StateUpdate` over the blackboard, with a templated system prompt and a
//! structured-output contract. Agents never mutate state; every write goes
//! through `sanitize_update`.

pub mod contextor;
pub mod cortex;
pub mod executor;
pub mod hopper;
pub mod orchestrator;
pub mod outputter;
pub mod planner;
pub mod summarizer;

use crate::state::AgentState;

/// Substitute `{{name}}` placeholders in a prompt template.
pub(crate) fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{{{key}}}}}"), value);
    }
    out
}

/// The most recent agent thoughts, newest last, joined for prompting.
pub(crate) fn recent_thoughts(state: &AgentState, max: usize) -> String {
    let thoughts = &state.agents_thoughts;
    let start = thoughts.len().saturating_sub(max);
    thoughts[start..].join("\n")
}

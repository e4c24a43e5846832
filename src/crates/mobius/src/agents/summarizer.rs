//! Summarizer: append a compact record of the just-executed actions. Pure
//! transformation over the executor message tail; no LLM call.

use crate::errors::AgentError;
use crate::state::{AgentState, StateUpdate};
use agentgraph::stream::NodeContext;
use agentgraph::{Message, ToolStatus};

/// Summarize the tool results since the last assistant message, e.g.
/// `Executed 2 action(s): tap (success), swipe (error)`.
fn summarize_tail(messages: &[Message]) -> String {
    let tail: Vec<&Message> = messages
        .iter()
        .rev()
        .take_while(|message| message.is_tool())
        .collect();

    if tail.is_empty() {
        return match messages.last() {
            Some(message) if message.is_assistant() => match message.text() {
                Some(text) if !text.trim().is_empty() => {
                    format!("Executor note: {}", text.trim())
                }
                _ => "No actions were executed in this step.".to_string(),
            },
            _ => "No actions were executed in this step.".to_string(),
        };
    }

    let outcomes: Vec<String> = tail
        .iter()
        .rev()
        .map(|message| {
            let name = message.name.as_deref().unwrap_or("tool");
            let status = match message.status {
                Some(ToolStatus::Success) => "success",
                Some(ToolStatus::Error) => "error",
                None => "unknown",
            };
            format!("{name} ({status})")
        })
        .collect();

    format!(
        "Executed {} action(s): {}",
        outcomes.len(),
        outcomes.join(", ")
    )
}

pub struct SummarizerNode;

impl SummarizerNode {
    pub async fn run(
        &self,
        _node: NodeContext<AgentState>,
        state: AgentState,
    ) -> Result<StateUpdate, AgentError> {
        let summary = summarize_tail(&state.executor_messages);
        tracing::debug!(%summary, "summarizer");
        Ok(state.sanitize_update("summarizer", StateUpdate::default().with_thought(summary)))
    }
}

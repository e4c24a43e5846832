//! The `focus_and_clear_text` tool: focus the field, then issue backspaces.

use crate::context::MobiusContext;
use crate::state::{AgentState, StateUpdate};
use crate::tools::input_text::focus_element_if_needed;
use crate::tools::{
    agent_thought_schema, invalid_args_update, target_schema, tool_update, MobileTool, Target,
};
use agentgraph::{ToolCall, ToolStatus};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

const DEFAULT_ERASE_CHARS: u32 = 50;

#[derive(Debug, Deserialize)]
struct ClearTextArgs {
    agent_thought: String,
    target: Target,
    #[serde(default)]
    nb_chars: Option<u32>,
}

pub struct FocusAndClearTextTool;

#[async_trait]
impl MobileTool for FocusAndClearTextTool {
    fn name(&self) -> &'static str {
        "focus_and_clear_text"
    }

    fn description(&self) -> &'static str {
        "Focus a text field (tapping it if needed) and erase its content with \
         backspaces (default 50)."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "agent_thought": agent_thought_schema(),
                "target": target_schema(),
                "nb_chars": {"type": "integer", "description": "How many characters to erase (default 50)"}
            },
            "required": ["agent_thought", "target"]
        })
    }

    async fn invoke(&self, ctx: &MobiusContext, _state: &AgentState, call: &ToolCall) -> StateUpdate {
        let args: ClearTextArgs = match serde_json::from_value(call.args.clone()) {
            Ok(args) => args,
            Err(e) => return invalid_args_update(call, &e),
        };

        if focus_element_if_needed(ctx, &args.target).await.is_none() {
            return tool_update(
                call,
                &args.agent_thought,
                "Failed to clear text: could not focus the text input element.".to_string(),
                ToolStatus::Error,
            );
        }

        let chars = args.nb_chars.unwrap_or(DEFAULT_ERASE_CHARS);
        match ctx.controller.erase_text(chars).await {
            Ok(()) => tool_update(
                call,
                &args.agent_thought,
                format!("Cleared up to {chars} characters from the focused field."),
                ToolStatus::Success,
            ),
            Err(e) => tool_update(
                call,
                &args.agent_thought,
                format!("Failed to clear text: {e}"),
                ToolStatus::Error,
            ),
        }
    }
}

//! The `erase_one_char` tool: one backspace in the focused field.

use crate::context::MobiusContext;
use crate::state::{AgentState, StateUpdate};
use crate::tools::{agent_thought_schema, invalid_args_update, tool_update, MobileTool};
use agentgraph::{ToolCall, ToolStatus};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct EraseOneCharArgs {
    agent_thought: String,
}

pub struct EraseOneCharTool;

#[async_trait]
impl MobileTool for EraseOneCharTool {
    fn name(&self) -> &'static str {
        "erase_one_char"
    }

    fn description(&self) -> &'static str {
        "Erase a single character from the currently focused text field."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"agent_thought": agent_thought_schema()},
            "required": ["agent_thought"]
        })
    }

    async fn invoke(&self, ctx: &MobiusContext, _state: &AgentState, call: &ToolCall) -> StateUpdate {
        let args: EraseOneCharArgs = match serde_json::from_value(call.args.clone()) {
            Ok(args) => args,
            Err(e) => return invalid_args_update(call, &e),
        };
        match ctx.controller.erase_text(1).await {
            Ok(()) => tool_update(
                call,
                &args.agent_thought,
                "Erased one character.".to_string(),
                ToolStatus::Success,
            ),
            Err(e) => tool_update(
                call,
                &args.agent_thought,
                format!("Failed to erase one character: {e}"),
                ToolStatus::Error,
            ),
        }
    }
}

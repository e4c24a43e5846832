//! The `press_key` tool.

use crate::context::MobiusContext;
use crate::state::{AgentState, StateUpdate};
use crate::tools::{agent_thought_schema, invalid_args_update, tool_update, MobileTool};
use agentgraph::{ToolCall, ToolStatus};
use async_trait::async_trait;
use device::Key;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct PressKeyArgs {
    agent_thought: String,
    key: Key,
}

pub struct PressKeyTool;

#[async_trait]
impl MobileTool for PressKeyTool {
    fn name(&self) -> &'static str {
        "press_key"
    }

    fn description(&self) -> &'static str {
        "Press a hardware key: Enter, Home, or Back."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "agent_thought": agent_thought_schema(),
                "key": {"type": "string", "enum": ["Enter", "Home", "Back"]}
            },
            "required": ["agent_thought", "key"]
        })
    }

    async fn invoke(&self, ctx: &MobiusContext, _state: &AgentState, call: &ToolCall) -> StateUpdate {
        let args: PressKeyArgs = match serde_json::from_value(call.args.clone()) {
            Ok(args) => args,
            Err(e) => return invalid_args_update(call, &e),
        };
        match ctx.controller.press_key(args.key).await {
            Ok(()) => tool_update(
                call,
                &args.agent_thought,
                format!("Pressed key {}.", args.key.as_str()),
                ToolStatus::Success,
            ),
            Err(e) => tool_update(
                call,
                &args.agent_thought,
                format!("Failed to press key {}: {e}", args.key.as_str()),
                ToolStatus::Error,
            ),
        }
    }
}

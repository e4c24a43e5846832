//! The `back` tool.

use crate::context::MobiusContext;
use crate::state::{AgentState, StateUpdate};
use crate::tools::{agent_thought_schema, invalid_args_update, tool_update, MobileTool};
use agentgraph::{ToolCall, ToolStatus};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct BackArgs {
    agent_thought: String,
}

pub struct BackTool;

#[async_trait]
impl MobileTool for BackTool {
    fn name(&self) -> &'static str {
        "back"
    }

    fn description(&self) -> &'static str {
        "Press the platform back control."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"agent_thought": agent_thought_schema()},
            "required": ["agent_thought"]
        })
    }

    async fn invoke(&self, ctx: &MobiusContext, _state: &AgentState, call: &ToolCall) -> StateUpdate {
        let args: BackArgs = match serde_json::from_value(call.args.clone()) {
            Ok(args) => args,
            Err(e) => return invalid_args_update(call, &e),
        };
        match ctx.controller.back().await {
            Ok(()) => tool_update(
                call,
                &args.agent_thought,
                "Pressed back.".to_string(),
                ToolStatus::Success,
            ),
            Err(e) => tool_update(
                call,
                &args.agent_thought,
                format!("Failed to press back: {e}"),
                ToolStatus::Error,
            ),
        }
    }
}

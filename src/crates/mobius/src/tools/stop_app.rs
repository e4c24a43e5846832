//! The `stop_app` tool.

use crate::context::MobiusContext;
use crate::state::{AgentState, StateUpdate};
use crate::tools::{agent_thought_schema, invalid_args_update, tool_update, MobileTool};
use agentgraph::{ToolCall, ToolStatus};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct StopAppArgs {
    agent_thought: String,
    #[serde(default)]
    package_name: Option<String>,
}

pub struct StopAppTool;

#[async_trait]
impl MobileTool for StopAppTool {
    fn name(&self) -> &'static str {
        "stop_app"
    }

    fn description(&self) -> &'static str {
        "Force-stop an app by package id, or the current foreground app when no \
         package is given."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "agent_thought": agent_thought_schema(),
                "package_name": {"type": "string", "description": "Package/bundle id; omit for the foreground app"}
            },
            "required": ["agent_thought"]
        })
    }

    async fn invoke(&self, ctx: &MobiusContext, _state: &AgentState, call: &ToolCall) -> StateUpdate {
        let args: StopAppArgs = match serde_json::from_value(call.args.clone()) {
            Ok(args) => args,
            Err(e) => return invalid_args_update(call, &e),
        };
        let label = args.package_name.clone().unwrap_or_else(|| "current app".to_string());
        match ctx.controller.stop_app(args.package_name.as_deref()).await {
            Ok(()) => tool_update(
                call,
                &args.agent_thought,
                format!("Stopped {label}."),
                ToolStatus::Success,
            ),
            Err(e) => tool_update(
                call,
                &args.agent_thought,
                format!("Failed to stop {label}: {e}"),
                ToolStatus::Error,
            ),
        }
    }
}

//! The `open_link` tool: open a URL or deep link via platform intent.

use crate::context::MobiusContext;
use crate::state::{AgentState, StateUpdate};
use crate::tools::{agent_thought_schema, invalid_args_update, tool_update, MobileTool};
use agentgraph::{ToolCall, ToolStatus};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct OpenLinkArgs {
    agent_thought: String,
    url: String,
}

pub struct OpenLinkTool;

#[async_trait]
impl MobileTool for OpenLinkTool {
    fn name(&self) -> &'static str {
        "open_link"
    }

    fn description(&self) -> &'static str {
        "Open a URL or deep link on the device (e.g. 'https://example.com', \
         'myapp://settings')."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "agent_thought": agent_thought_schema(),
                "url": {"type": "string", "description": "The URL or deep link to open"}
            },
            "required": ["agent_thought", "url"]
        })
    }

    async fn invoke(&self, ctx: &MobiusContext, _state: &AgentState, call: &ToolCall) -> StateUpdate {
        let args: OpenLinkArgs = match serde_json::from_value(call.args.clone()) {
            Ok(args) => args,
            Err(e) => return invalid_args_update(call, &e),
        };
        match ctx.controller.open_link(&args.url).await {
            Ok(()) => tool_update(
                call,
                &args.agent_thought,
                format!("Opened link '{}'.", args.url),
                ToolStatus::Success,
            ),
            Err(e) => tool_update(
                call,
                &args.agent_thought,
                format!("Failed to open link '{}': {e}", args.url),
                ToolStatus::Error,
            ),
        }
    }
}

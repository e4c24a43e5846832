//! The `wait_for_delay` tool. Sleeps in-process; no device call is made.

use crate::context::MobiusContext;
use crate::state::{AgentState, StateUpdate};
use crate::tools::{agent_thought_schema, invalid_args_update, tool_update, MobileTool};
use agentgraph::{ToolCall, ToolStatus};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Upper bound so a confused model cannot stall a task for minutes.
const MAX_DELAY_MS: u64 = 30_000;

#[derive(Debug, Deserialize)]
struct WaitForDelayArgs {
    agent_thought: String,
    duration_ms: u64,
}

pub struct WaitForDelayTool;

#[async_trait]
impl MobileTool for WaitForDelayTool {
    fn name(&self) -> &'static str {
        "wait_for_delay"
    }

    fn description(&self) -> &'static str {
        "Wait for a fixed delay in milliseconds, e.g. while content loads."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "agent_thought": agent_thought_schema(),
                "duration_ms": {"type": "integer", "minimum": 1, "maximum": MAX_DELAY_MS}
            },
            "required": ["agent_thought", "duration_ms"]
        })
    }

    async fn invoke(&self, _ctx: &MobiusContext, _state: &AgentState, call: &ToolCall) -> StateUpdate {
        let args: WaitForDelayArgs = match serde_json::from_value(call.args.clone()) {
            Ok(args) => args,
            Err(e) => return invalid_args_update(call, &e),
        };
        let delay = args.duration_ms.min(MAX_DELAY_MS);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        tool_update(
            call,
            &args.agent_thought,
            format!("Waited {delay} ms."),
            ToolStatus::Success,
        )
    }
}

//! The `long_press_on` tool. Shares the tap locator chain; platforms
//! without a native long-press primitive get a same-point swipe of at
//! least one second.

use crate::context::MobiusContext;
use crate::state::{AgentState, StateUpdate};
use crate::tools::tap::{press_with_fallback, ChainOutcome, Press};
use crate::tools::{
    agent_thought_schema, invalid_args_update, target_schema, tool_update, MobileTool, Target,
};
use agentgraph::{ToolCall, ToolStatus};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

const DEFAULT_LONG_PRESS_MS: u32 = 1000;

#[derive(Debug, Deserialize)]
struct LongPressArgs {
    agent_thought: String,
    target: Target,
    #[serde(default)]
    duration_ms: Option<u32>,
}

pub struct LongPressOnTool;

#[async_trait]
impl MobileTool for LongPressOnTool {
    fn name(&self) -> &'static str {
        "long_press_on"
    }

    fn description(&self) -> &'static str {
        "Long-press a UI element identified by a target, with the same locator \
         fallback order as tap. Default duration is 1000 ms."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "agent_thought": agent_thought_schema(),
                "target": target_schema(),
                "duration_ms": {"type": "integer", "description": "Press duration in milliseconds (default 1000)"}
            },
            "required": ["agent_thought", "target"]
        })
    }

    async fn invoke(&self, ctx: &MobiusContext, state: &AgentState, call: &ToolCall) -> StateUpdate {
        let args: LongPressArgs = match serde_json::from_value(call.args.clone()) {
            Ok(args) => args,
            Err(e) => return invalid_args_update(call, &e),
        };

        let press = Press::LongPress {
            duration_ms: args.duration_ms.unwrap_or(DEFAULT_LONG_PRESS_MS),
        };
        match press_with_fallback(ctx, state, &args.target, press).await {
            ChainOutcome::Hit { selector_info } => tool_update(
                call,
                &args.agent_thought,
                format!("Long press on element with {selector_info} was successful."),
                ToolStatus::Success,
            ),
            ChainOutcome::Miss {
                selector_info,
                error,
            } => tool_update(
                call,
                &args.agent_thought,
                format!(
                    "Failed to long press on element. Last attempt was with {selector_info}: {error}"
                ),
                ToolStatus::Error,
            ),
        }
    }
}

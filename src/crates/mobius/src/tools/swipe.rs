//! The `swipe` tool, plus flattened per-variant forms for providers that
//! reject nested variant unions in tool schemas.

use crate::context::MobiusContext;
use crate::state::{AgentState, StateUpdate};
use crate::tools::{agent_thought_schema, invalid_args_update, tool_update, MobileTool};
use agentgraph::{ToolCall, ToolStatus};
use async_trait::async_trait;
use device::{PercentPoint, Point, SwipeDirection, SwipeMode, SwipeRequest};
use serde::Deserialize;
use serde_json::{json, Value};

async fn run_swipe(
    ctx: &MobiusContext,
    call: &ToolCall,
    agent_thought: &str,
    request: SwipeRequest,
) -> StateUpdate {
    match ctx.controller.swipe(&request).await {
        Ok(()) => tool_update(
            call,
            agent_thought,
            "Swipe is successful.".to_string(),
            ToolStatus::Success,
        ),
        Err(e) => tool_update(
            call,
            agent_thought,
            format!("Failed to swipe: {e}"),
            ToolStatus::Error,
        ),
    }
}

fn duration_schema() -> Value {
    json!({"type": "integer", "minimum": 1, "maximum": 10000, "description": "Duration in ms (default 400)"})
}

#[derive(Debug, Deserialize)]
struct SwipeArgs {
    agent_thought: String,
    swipe_request: SwipeRequest,
}

/// The full swipe tool: direction, start/end coordinates, or start/end
/// percentages, with an optional duration.
pub struct SwipeTool;

#[async_trait]
impl MobileTool for SwipeTool {
    fn name(&self) -> &'static str {
        "swipe"
    }

    fn description(&self) -> &'static str {
        "Swipe on the screen: in a direction (UP/DOWN/LEFT/RIGHT), between pixel \
         coordinates, or between screen percentages."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "agent_thought": agent_thought_schema(),
                "swipe_request": {
                    "type": "object",
                    "description": "Exactly one swipe mode: direction, start/end, or start_percent/end_percent.",
                    "properties": {
                        "direction": {"type": "string", "enum": ["UP", "DOWN", "LEFT", "RIGHT"]},
                        "start": {"type": "object", "properties": {"x": {"type": "integer"}, "y": {"type": "integer"}}, "required": ["x", "y"]},
                        "end": {"type": "object", "properties": {"x": {"type": "integer"}, "y": {"type": "integer"}}, "required": ["x", "y"]},
                        "start_percent": {"type": "object", "properties": {"x_percent": {"type": "integer"}, "y_percent": {"type": "integer"}}, "required": ["x_percent", "y_percent"]},
                        "end_percent": {"type": "object", "properties": {"x_percent": {"type": "integer"}, "y_percent": {"type": "integer"}}, "required": ["x_percent", "y_percent"]},
                        "duration": duration_schema(),
                    }
                }
            },
            "required": ["agent_thought", "swipe_request"]
        })
    }

    async fn invoke(&self, ctx: &MobiusContext, _state: &AgentState, call: &ToolCall) -> StateUpdate {
        let args: SwipeArgs = match serde_json::from_value(call.args.clone()) {
            Ok(args) => args,
            Err(e) => return invalid_args_update(call, &e),
        };
        run_swipe(ctx, call, &args.agent_thought, args.swipe_request).await
    }
}

#[derive(Debug, Deserialize)]
struct SwipeCoordinatesArgs {
    agent_thought: String,
    start_x: i32,
    start_y: i32,
    end_x: i32,
    end_y: i32,
    #[serde(default)]
    duration: Option<u32>,
}

/// Flattened swipe-by-pixel-coordinates form.
pub struct SwipeCoordinatesTool;

#[async_trait]
impl MobileTool for SwipeCoordinatesTool {
    fn name(&self) -> &'static str {
        "swipe_coordinates"
    }

    fn description(&self) -> &'static str {
        "Swipe from a start pixel position to an end pixel position."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "agent_thought": agent_thought_schema(),
                "start_x": {"type": "integer", "description": "Start X coordinate in pixels"},
                "start_y": {"type": "integer", "description": "Start Y coordinate in pixels"},
                "end_x": {"type": "integer", "description": "End X coordinate in pixels"},
                "end_y": {"type": "integer", "description": "End Y coordinate in pixels"},
                "duration": duration_schema(),
            },
            "required": ["agent_thought", "start_x", "start_y", "end_x", "end_y"]
        })
    }

    async fn invoke(&self, ctx: &MobiusContext, _state: &AgentState, call: &ToolCall) -> StateUpdate {
        let args: SwipeCoordinatesArgs = match serde_json::from_value(call.args.clone()) {
            Ok(args) => args,
            Err(e) => return invalid_args_update(call, &e),
        };
        let request = SwipeRequest {
            mode: SwipeMode::StartEndCoords {
                start: Point::new(args.start_x, args.start_y),
                end: Point::new(args.end_x, args.end_y),
            },
            duration: args.duration,
        };
        run_swipe(ctx, call, &args.agent_thought, request).await
    }
}

#[derive(Debug, Deserialize)]
struct SwipePercentagesArgs {
    agent_thought: String,
    start_x_percent: u8,
    start_y_percent: u8,
    end_x_percent: u8,
    end_y_percent: u8,
    #[serde(default)]
    duration: Option<u32>,
}

/// Flattened swipe-by-percentages form.
pub struct SwipePercentagesTool;

#[async_trait]
impl MobileTool for SwipePercentagesTool {
    fn name(&self) -> &'static str {
        "swipe_percentages"
    }

    fn description(&self) -> &'static str {
        "Swipe from a start screen percentage to an end screen percentage (0-100)."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "agent_thought": agent_thought_schema(),
                "start_x_percent": {"type": "integer", "minimum": 0, "maximum": 100},
                "start_y_percent": {"type": "integer", "minimum": 0, "maximum": 100},
                "end_x_percent": {"type": "integer", "minimum": 0, "maximum": 100},
                "end_y_percent": {"type": "integer", "minimum": 0, "maximum": 100},
                "duration": duration_schema(),
            },
            "required": ["agent_thought", "start_x_percent", "start_y_percent", "end_x_percent", "end_y_percent"]
        })
    }

    async fn invoke(&self, ctx: &MobiusContext, _state: &AgentState, call: &ToolCall) -> StateUpdate {
        let args: SwipePercentagesArgs = match serde_json::from_value(call.args.clone()) {
            Ok(args) => args,
            Err(e) => return invalid_args_update(call, &e),
        };
        let request = SwipeRequest {
            mode: SwipeMode::StartEndPercent {
                start_percent: PercentPoint {
                    x_percent: args.start_x_percent,
                    y_percent: args.start_y_percent,
                },
                end_percent: PercentPoint {
                    x_percent: args.end_x_percent,
                    y_percent: args.end_y_percent,
                },
            },
            duration: args.duration,
        };
        run_swipe(ctx, call, &args.agent_thought, request).await
    }
}

#[derive(Debug, Deserialize)]
struct SwipeDirectionArgs {
    agent_thought: String,
    direction: SwipeDirection,
    #[serde(default)]
    duration: Option<u32>,
}

/// Flattened swipe-by-direction form.
pub struct SwipeDirectionTool;

#[async_trait]
impl MobileTool for SwipeDirectionTool {
    fn name(&self) -> &'static str {
        "swipe_direction"
    }

    fn description(&self) -> &'static str {
        "Swipe across the screen in a direction."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "agent_thought": agent_thought_schema(),
                "direction": {"type": "string", "enum": ["UP", "DOWN", "LEFT", "RIGHT"]},
                "duration": duration_schema(),
            },
            "required": ["agent_thought", "direction"]
        })
    }

    async fn invoke(&self, ctx: &MobiusContext, _state: &AgentState, call: &ToolCall) -> StateUpdate {
        let args: SwipeDirectionArgs = match serde_json::from_value(call.args.clone()) {
            Ok(args) => args,
            Err(e) => return invalid_args_update(call, &e),
        };
        let request = SwipeRequest {
            mode: SwipeMode::Direction {
                direction: args.direction,
            },
            duration: args.duration,
        };
        run_swipe(ctx, call, &args.agent_thought, request).await
    }
}

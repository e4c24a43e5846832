//! The `tap` tool and its ordered locator fallback chain.

use crate::context::MobiusContext;
use crate::state::{AgentState, StateUpdate};
use crate::tools::{
    agent_thought_schema, hierarchy_or_fetch, invalid_args_update, target_schema, tool_update,
    MobileTool, Target,
};
use agentgraph::{ToolCall, ToolStatus};
use async_trait::async_trait;
use device::{find_by_resource_id, find_by_text, Selector};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct TapArgs {
    agent_thought: String,
    target: Target,
}

/// Outcome of a locator chain walk: the description of the locator that
/// succeeded, or the last attempted locator plus its error.
pub(crate) enum ChainOutcome {
    Hit { selector_info: String },
    Miss { selector_info: String, error: String },
}

/// Which press the chain performs once a locator resolves.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Press {
    Tap,
    LongPress { duration_ms: u32 },
}

async fn press_at(
    ctx: &MobiusContext,
    selector: &Selector,
    press: Press,
) -> Result<(), device::DeviceError> {
    match press {
        Press::Tap => ctx.controller.tap(selector, None).await,
        Press::LongPress { duration_ms } => {
            ctx.controller.long_press(selector, None, duration_ms).await
        }
    }
}

/// Walk the target's locators in order (resource id -> coordinates -> text)
/// and press the first that resolves. When both an id and text are present,
/// the id match is cross-checked against the text and discarded on
/// mismatch.
pub(crate) async fn press_with_fallback(
    ctx: &MobiusContext,
    state: &AgentState,
    target: &Target,
    press: Press,
) -> ChainOutcome {
    let mut last_info = "N/A".to_string();
    let mut last_error = "No valid locator provided.".to_string();

    if let Some(resource_id) = target.resource_id.as_deref().filter(|id| !id.is_empty()) {
        let index = target.resource_id_index;
        last_info = format!("resource_id='{resource_id}' (index={index:?})");
        tracing::info!(resource_id, ?index, "attempting tap by resource_id");

        match hierarchy_or_fetch(ctx, state).await {
            Ok(hierarchy) => {
                let mut element = find_by_resource_id(&hierarchy, resource_id, index);
                if let (Some(found), Some(text)) = (element, target.text.as_deref()) {
                    let matches = found
                        .text()
                        .map(|t| t.eq_ignore_ascii_case(text))
                        .unwrap_or(false);
                    if !matches {
                        tracing::warn!(
                            resource_id,
                            text,
                            "id and text point at different elements, discarding the id"
                        );
                        element = None;
                    }
                }
                match element {
                    Some(element) => match element.bounds() {
                        Ok(Some(bounds)) => {
                            let center = bounds.center();
                            match press_at(
                                ctx,
                                &Selector::coords(center.x, center.y),
                                press,
                            )
                            .await
                            {
                                Ok(()) => {
                                    return ChainOutcome::Hit {
                                        selector_info: format!(
                                            "{last_info} coordinates='{bounds}'"
                                        ),
                                    }
                                }
                                Err(e) => last_error = e.to_string(),
                            }
                        }
                        Ok(None) | Err(_) => {
                            last_error =
                                format!("Element with resource_id '{resource_id}' has no bounds")
                        }
                    },
                    None => {
                        last_error = format!("Element with resource_id '{resource_id}' not found")
                    }
                }
            }
            Err(e) => last_error = e.to_string(),
        }
    }

    if let Some(bounds) = &target.coordinates {
        let center = bounds.center();
        last_info = format!("coordinates='{bounds}'");
        tracing::info!(%center.x, %center.y, "attempting tap by coordinates");
        match press_at(ctx, &Selector::coords(center.x, center.y), press).await {
            Ok(()) => {
                return ChainOutcome::Hit {
                    selector_info: last_info,
                }
            }
            Err(e) => last_error = e.to_string(),
        }
    }

    if let Some(text) = target.text.as_deref().filter(|text| !text.is_empty()) {
        let index = target.text_index;
        last_info = format!("text='{text}' (index={index:?})");
        tracing::info!(text, ?index, "attempting tap by text");
        match hierarchy_or_fetch(ctx, state).await {
            Ok(hierarchy) => match find_by_text(&hierarchy, text, index) {
                Some(element) => match element.bounds() {
                    Ok(Some(bounds)) => {
                        let center = bounds.center();
                        match press_at(ctx, &Selector::coords(center.x, center.y), press)
                            .await
                        {
                            Ok(()) => {
                                return ChainOutcome::Hit {
                                    selector_info: last_info,
                                }
                            }
                            Err(e) => last_error = e.to_string(),
                        }
                    }
                    Ok(None) | Err(_) => {
                        last_error = format!("Element with text '{text}' has no bounds")
                    }
                },
                None => last_error = format!("Element with text '{text}' not found"),
            },
            Err(e) => last_error = e.to_string(),
        }
    }

    ChainOutcome::Miss {
        selector_info: last_info,
        error: last_error,
    }
}

pub struct TapTool;

#[async_trait]
impl MobileTool for TapTool {
    fn name(&self) -> &'static str {
        "tap"
    }

    fn description(&self) -> &'static str {
        "Tap a UI element identified by a target (resource_id with optional index, \
         coordinates, or text with optional index). Locators are tried in that order."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "agent_thought": agent_thought_schema(),
                "target": target_schema(),
            },
            "required": ["agent_thought", "target"]
        })
    }

    async fn invoke(&self, ctx: &MobiusContext, state: &AgentState, call: &ToolCall) -> StateUpdate {
        let args: TapArgs = match serde_json::from_value(call.args.clone()) {
            Ok(args) => args,
            Err(e) => return invalid_args_update(call, &e),
        };

        match press_with_fallback(ctx, state, &args.target, Press::Tap).await {
            ChainOutcome::Hit { selector_info } => tool_update(
                call,
                &args.agent_thought,
                format!("Tap on element with {selector_info} was successful."),
                ToolStatus::Success,
            ),
            ChainOutcome::Miss {
                selector_info,
                error,
            } => tool_update(
                call,
                &args.agent_thought,
                format!("Failed to tap on element. Last attempt was with {selector_info}: {error}"),
                ToolStatus::Error,
            ),
        }
    }
}

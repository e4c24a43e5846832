//! The `focus_and_input_text` tool: focus the field, move the caret to the
//! end, type, and verify.

use crate::context::MobiusContext;
use crate::state::{AgentState, StateUpdate};
use crate::tools::{
    agent_thought_schema, invalid_args_update, target_schema, tool_update, MobileTool, Target,
};
use agentgraph::{ToolCall, ToolStatus};
use async_trait::async_trait;
use device::{find_by_resource_id, find_by_text, Selector, UiElement};
use serde::Deserialize;
use serde_json::{json, Value};

/// Which locator ended up giving the field focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FocusMethod {
    ResourceId,
    Coordinates,
    Text,
}

impl FocusMethod {
    fn as_str(&self) -> &'static str {
        match self {
            FocusMethod::ResourceId => "resource_id",
            FocusMethod::Coordinates => "coordinates",
            FocusMethod::Text => "text",
        }
    }
}

async fn fresh_hierarchy(ctx: &MobiusContext) -> Vec<UiElement> {
    match ctx.screen.screen_data().await {
        Ok(data) => data.elements,
        Err(e) => {
            tracing::debug!(error = %e, "could not refresh hierarchy");
            Vec::new()
        }
    }
}

/// Ensure the target element is focused, tapping it if necessary. Trusts a
/// resource id only when any provided text agrees with the element found
/// under that id.
pub(crate) async fn focus_element_if_needed(
    ctx: &MobiusContext,
    target: &Target,
) -> Option<FocusMethod> {
    let mut hierarchy = fresh_hierarchy(ctx).await;

    if let Some(resource_id) = target.resource_id.as_deref().filter(|id| !id.is_empty()) {
        let mut element = find_by_resource_id(&hierarchy, resource_id, target.resource_id_index);

        if let (Some(found), Some(text)) = (element, target.text.as_deref()) {
            let matches = found
                .text()
                .map(|t| t.eq_ignore_ascii_case(text))
                .unwrap_or(false);
            if !matches {
                tracing::warn!(
                    resource_id,
                    text,
                    "id and text seem to be on different elements, ignoring the resource_id"
                );
                element = None;
            }
        }

        if let Some(found) = element {
            if !found.is_focused() {
                let selector = Selector::id(resource_id);
                if ctx
                    .controller
                    .tap(&selector, target.resource_id_index)
                    .await
                    .is_ok()
                {
                    hierarchy = fresh_hierarchy(ctx).await;
                }
            }
            let refreshed =
                find_by_resource_id(&hierarchy, resource_id, target.resource_id_index);
            if refreshed.map(UiElement::is_focused).unwrap_or(false) {
                return Some(FocusMethod::ResourceId);
            }
            tracing::warn!(resource_id, "failed to focus by resource_id, falling back");
        }
    }

    if let Some(bounds) = &target.coordinates {
        let center = bounds.center();
        if ctx
            .controller
            .tap(&Selector::coords(center.x, center.y), None)
            .await
            .is_ok()
        {
            return Some(FocusMethod::Coordinates);
        }
    }

    if let Some(text) = target.text.as_deref().filter(|text| !text.is_empty()) {
        if let Some(element) = find_by_text(&hierarchy, text, target.text_index) {
            if let Ok(Some(bounds)) = element.bounds() {
                let center = bounds.center();
                if ctx
                    .controller
                    .tap(&Selector::coords(center.x, center.y), None)
                    .await
                    .is_ok()
                {
                    return Some(FocusMethod::Text);
                }
            }
        }
    }

    tracing::error!("failed to focus element: no locator succeeded");
    None
}

/// Best-effort caret move: tap near the lower-right of the target so the
/// cursor lands at the end of existing content. Idempotent on an already
/// positioned caret.
pub(crate) async fn move_cursor_to_end(ctx: &MobiusContext, state: &AgentState, target: &Target) {
    let hierarchy = state
        .latest_ui_hierarchy
        .clone()
        .unwrap_or_default();

    let bounds = if let Some(resource_id) = target.resource_id.as_deref() {
        find_by_resource_id(&hierarchy, resource_id, target.resource_id_index)
            .and_then(|e| e.bounds().ok().flatten())
    } else if target.coordinates.is_some() {
        target.coordinates
    } else if let Some(text) = target.text.as_deref() {
        find_by_text(&hierarchy, text, target.text_index).and_then(|e| e.bounds().ok().flatten())
    } else {
        None
    };

    if let Some(bounds) = bounds {
        let corner = bounds.relative_point(0.99, 0.99);
        if let Err(e) = ctx
            .controller
            .tap(&Selector::coords(corner.x, corner.y), None)
            .await
        {
            tracing::debug!(error = %e, "cursor-to-end tap failed");
        }
    }
}

#[derive(Debug, Deserialize)]
struct InputTextArgs {
    agent_thought: String,
    text: String,
    target: Target,
}

pub struct FocusAndInputTextTool;

#[async_trait]
impl MobileTool for FocusAndInputTextTool {
    fn name(&self) -> &'static str {
        "focus_and_input_text"
    }

    fn description(&self) -> &'static str {
        "Focus a text field (tapping it if needed), move the cursor to the end, and \
         type the given text. Newlines and tabs are typed as key events."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "agent_thought": agent_thought_schema(),
                "text": {"type": "string", "description": "The text to type"},
                "target": target_schema(),
            },
            "required": ["agent_thought", "text", "target"]
        })
    }

    async fn invoke(&self, ctx: &MobiusContext, state: &AgentState, call: &ToolCall) -> StateUpdate {
        let args: InputTextArgs = match serde_json::from_value(call.args.clone()) {
            Ok(args) => args,
            Err(e) => return invalid_args_update(call, &e),
        };

        let Some(focus_method) = focus_element_if_needed(ctx, &args.target).await else {
            return tool_update(
                call,
                &args.agent_thought,
                format!(
                    "Failed to input text {:?}. Reason: could not focus the text input element.",
                    args.text
                ),
                ToolStatus::Error,
            );
        };

        move_cursor_to_end(ctx, state, &args.target).await;

        if let Err(e) = ctx.controller.input_text(&args.text).await {
            return tool_update(
                call,
                &args.agent_thought,
                format!("Failed to input text {:?}. Reason: {e}", args.text),
                ToolStatus::Error,
            );
        }

        // Post-action verification: re-observe and read the field back when
        // it was addressed by id.
        let mut update_hierarchy = None;
        let mut field_content = String::new();
        if let Some(resource_id) = args.target.resource_id.as_deref() {
            if let Ok(data) = ctx.screen.screen_data().await {
                if let Some(element) =
                    find_by_resource_id(&data.elements, resource_id, args.target.resource_id_index)
                {
                    field_content = element.text().unwrap_or_default().to_string();
                }
                update_hierarchy = Some(data.elements);
            }
        }

        let outcome = if focus_method == FocusMethod::ResourceId {
            format!(
                "Typed {:?}.\nHere is the whole content of input with id {:?}: {:?}",
                args.text,
                args.target.resource_id.as_deref().unwrap_or_default(),
                field_content
            )
        } else {
            format!(
                "Typed {:?} using {}. Should now verify before moving forward.",
                args.text,
                focus_method.as_str()
            )
        };

        let mut update = tool_update(call, &args.agent_thought, outcome, ToolStatus::Success);
        update.latest_ui_hierarchy = update_hierarchy;
        update
    }
}

//! Device tools exposed to the Executor's LLM.
//!
//! Each tool declares its name, description, and argument schema (consumed
//! by the model), and an `invoke` that runs against the device and returns
//! the state update recording its outcome: a tool-result message with a
//! success/error status plus appended agent thoughts.

pub mod back;
pub mod clear_text;
pub mod erase_one_char;
pub mod input_text;
pub mod launch_app;
pub mod long_press_on;
pub mod node;
pub mod open_link;
pub mod press_key;
pub mod stop_app;
pub mod swipe;
pub mod tap;
pub mod wait_for_delay;

use crate::context::MobiusContext;
use crate::errors::Result;
use crate::state::{AgentState, StateUpdate};
use agentgraph::llm::ToolDefinition;
use agentgraph::{Message, ToolCall, ToolStatus};
use async_trait::async_trait;
use device::{Bounds, UiElement};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Composite UI locator with an ordered fallback chain:
/// resource id (with optional index) -> coordinates -> text (with optional
/// index).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Target {
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub resource_id_index: Option<usize>,
    #[serde(default)]
    pub coordinates: Option<Bounds>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub text_index: Option<usize>,
}

impl Target {
    pub fn has_any_locator(&self) -> bool {
        self.resource_id.as_deref().is_some_and(|id| !id.is_empty())
            || self.coordinates.is_some()
            || self.text.as_deref().is_some_and(|text| !text.is_empty())
    }
}

/// JSON schema fragment for [`Target`] arguments.
pub(crate) fn target_schema() -> Value {
    json!({
        "type": "object",
        "description": "UI element locator. Locators are tried in order: resource_id, coordinates, text.",
        "properties": {
            "resource_id": {"type": "string", "description": "Resource id of the element"},
            "resource_id_index": {"type": "integer", "description": "Which match to use when several elements share the id"},
            "coordinates": {
                "type": "object",
                "description": "Element bounds; the tap lands on the center",
                "properties": {
                    "x1": {"type": "integer"},
                    "y1": {"type": "integer"},
                    "x2": {"type": "integer"},
                    "y2": {"type": "integer"}
                },
                "required": ["x1", "y1", "x2", "y2"]
            },
            "text": {"type": "string", "description": "Visible text of the element (case-insensitive exact match)"},
            "text_index": {"type": "integer", "description": "Which match to use when several elements share the text"}
        }
    })
}

pub(crate) fn agent_thought_schema() -> Value {
    json!({"type": "string", "description": "One sentence on why this action is being taken"})
}

/// A device tool invocable by the Executor's LLM.
#[async_trait]
pub trait MobileTool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON Schema of the arguments object.
    fn parameters(&self) -> Value;

    /// Run the tool. Never fails at this boundary: device and argument
    /// errors are folded into an error-status tool message so the LLM loop
    /// can recover locally.
    async fn invoke(&self, ctx: &MobiusContext, state: &AgentState, call: &ToolCall) -> StateUpdate;
}

/// Build the state update for a finished tool call.
pub(crate) fn tool_update(
    call: &ToolCall,
    thought: &str,
    outcome: String,
    status: ToolStatus,
) -> StateUpdate {
    let message = Message::tool(outcome.clone(), call.id.clone(), status).with_name(call.name.clone());
    let mut update = StateUpdate::default();
    if !thought.is_empty() {
        update.agents_thoughts.push(thought.to_string());
    }
    update.agents_thoughts.push(outcome);
    update.executor_messages.push(message);
    update
}

/// Update for a tool call whose arguments did not match the schema.
pub(crate) fn invalid_args_update(call: &ToolCall, error: &serde_json::Error) -> StateUpdate {
    tool_update(
        call,
        "",
        format!("Invalid arguments for tool '{}': {error}.", call.name),
        ToolStatus::Error,
    )
}

/// The UI hierarchy from the blackboard, or a fresh observation when the
/// blackboard has none.
pub(crate) async fn hierarchy_or_fetch(
    ctx: &MobiusContext,
    state: &AgentState,
) -> Result<Vec<UiElement>> {
    match &state.latest_ui_hierarchy {
        Some(hierarchy) => Ok(hierarchy.clone()),
        None => Ok(ctx.screen.screen_data().await?.elements),
    }
}

/// The executor's tool set.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn MobileTool>>,
    /// Tool names hidden from providers that accept nested unions; shown
    /// instead of `swipe` to providers that do not.
    flat_variant_names: Vec<&'static str>,
}

impl ToolRegistry {
    /// The canonical tool set.
    pub fn standard() -> Self {
        let tools: Vec<Arc<dyn MobileTool>> = vec![
            Arc::new(back::BackTool),
            Arc::new(open_link::OpenLinkTool),
            Arc::new(tap::TapTool),
            Arc::new(long_press_on::LongPressOnTool),
            Arc::new(swipe::SwipeTool),
            Arc::new(swipe::SwipeCoordinatesTool),
            Arc::new(swipe::SwipePercentagesTool),
            Arc::new(swipe::SwipeDirectionTool),
            Arc::new(input_text::FocusAndInputTextTool),
            Arc::new(erase_one_char::EraseOneCharTool),
            Arc::new(launch_app::LaunchAppTool),
            Arc::new(stop_app::StopAppTool),
            Arc::new(clear_text::FocusAndClearTextTool),
            Arc::new(press_key::PressKeyTool),
            Arc::new(wait_for_delay::WaitForDelayTool),
        ];
        Self {
            tools,
            flat_variant_names: vec!["swipe_coordinates", "swipe_percentages", "swipe_direction"],
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn MobileTool>> {
        self.tools.iter().find(|tool| tool.name() == name).cloned()
    }

    /// Definitions for the LLM. With `flatten_unions`, the nested-union
    /// `swipe` tool is replaced by its per-variant forms.
    pub fn definitions(&self, flatten_unions: bool) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .filter(|tool| {
                if flatten_unions {
                    tool.name() != "swipe"
                } else {
                    !self.flat_variant_names.contains(&tool.name())
                }
            })
            .map(|tool| {
                ToolDefinition::new(tool.name(), tool.description())
                    .with_parameters(tool.parameters())
            })
            .collect()
    }

    /// Comma-separated tool names, for prompts.
    pub fn names(&self, flatten_unions: bool) -> String {
        self.definitions(flatten_unions)
            .iter()
            .map(|def| def.name.clone())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

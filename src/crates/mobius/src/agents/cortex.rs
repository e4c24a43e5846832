//! Cortex: look at the screen and decide the next concrete UI actions.

use crate::agents::{recent_thoughts, render};
use crate::context::MobiusContext;
use crate::errors::AgentError;
use crate::state::{format_plan, AgentState, StateUpdate};
use agentgraph::stream::NodeContext;
use agentgraph::{ContentPart, Message};
use llm::{invoke_structured, invoke_with_timeout_notice, with_fallback, AgentNode, ResponseSchema};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "\
You are the decision core of an agent driving a live {{platform}} mobile
device. From the current observation, decide the next one or two concrete UI
actions that advance the running subgoal.

Output contract:
- decisions: a JSON array (as a string) of action intents, each naming the
  action and its target, e.g.
  [{\"action\": \"tap\", \"target\": {\"resource_id\": \"...\"}}].
  Omit it entirely when the running subgoal is already complete on screen.
- decisions_reason: why these actions (or why none).
- goals_completion_reason: what on screen shows subgoals are complete, when
  claiming completion.
- complete_subgoals_by_ids: ids of subgoals the observation proves complete.

Prefer resource ids over coordinates, and give every target its visible
text as well when you can see it. Never invent elements that are not in the
hierarchy.";

const HUMAN_PROMPT: &str = "\
Goal: {{initial_goal}}

Plan:
{{subgoal_plan}}

Device date: {{device_date}}
Focused app: {{focused_app}}
Screen size: {{screen_size}}

UI hierarchy:
{{ui_hierarchy}}

Recent agent notes:
{{agent_thoughts}}";

/// Structured decision contract.
#[derive(Debug, Deserialize)]
struct CortexOutput {
    #[serde(default)]
    decisions: Option<String>,
    decisions_reason: String,
    #[serde(default)]
    goals_completion_reason: Option<String>,
    #[serde(default)]
    complete_subgoals_by_ids: Option<Vec<String>>,
}

fn output_schema() -> ResponseSchema {
    ResponseSchema::new(
        "cortex_decision",
        json!({
            "type": "object",
            "properties": {
                "decisions": {"type": ["string", "null"], "description": "Stringified JSON array of action intents"},
                "decisions_reason": {"type": "string"},
                "goals_completion_reason": {"type": ["string", "null"]},
                "complete_subgoals_by_ids": {"type": ["array", "null"], "items": {"type": "string"}}
            },
            "required": ["decisions_reason"]
        }),
    )
}

pub struct CortexNode {
    ctx: Arc<MobiusContext>,
}

impl CortexNode {
    pub fn new(ctx: Arc<MobiusContext>) -> Self {
        Self { ctx }
    }

    fn build_messages(&self, state: &AgentState) -> Vec<Message> {
        let hierarchy = state
            .latest_ui_hierarchy
            .as_ref()
            .and_then(|elements| serde_json::to_string(elements).ok())
            .unwrap_or_else(|| "[]".to_string());
        let screen_size = state
            .screen_size
            .map(|(w, h)| format!("{w}x{h}"))
            .unwrap_or_else(|| "unknown".to_string());

        let system = render(SYSTEM_PROMPT, &[("platform", self.ctx.platform_name())]);
        let human = render(
            HUMAN_PROMPT,
            &[
                ("initial_goal", state.initial_goal.as_str()),
                ("subgoal_plan", &format_plan(&state.subgoal_plan)),
                ("device_date", state.device_date.as_deref().unwrap_or("unknown")),
                (
                    "focused_app",
                    state.focused_app_info.as_deref().unwrap_or("unknown"),
                ),
                ("screen_size", &screen_size),
                ("ui_hierarchy", &hierarchy),
                ("agent_thoughts", &recent_thoughts(state, 20)),
            ],
        );

        let mut parts = vec![ContentPart::text(human)];
        if let Some(screenshot) = &state.latest_screenshot {
            parts.push(ContentPart::image_data("image/jpeg", screenshot.clone()));
        }
        vec![Message::system(system), Message::human(parts)]
    }

    pub async fn run(
        &self,
        node: NodeContext<AgentState>,
        state: AgentState,
    ) -> Result<StateUpdate, AgentError> {
        tracing::info!("starting cortex agent");
        let messages = self.build_messages(&state);

        let model = self
            .ctx
            .models
            .model_for(AgentNode::Cortex)
            .map_err(|e| AgentError::Llm(e.to_string()))?;
        let fallback = self.ctx.models.fallback_for(AgentNode::Cortex);

        let call = || invoke_structured::<CortexOutput>(&model, messages.clone(), output_schema(), 1.0);
        let inference = async {
            match &fallback {
                Some(fallback_model) => {
                    with_fallback(call, || {
                        invoke_structured::<CortexOutput>(
                            fallback_model,
                            messages.clone(),
                            output_schema(),
                            1.0,
                        )
                    })
                    .await
                }
                None => call().await,
            }
        };
        let response: CortexOutput = invoke_with_timeout_notice(inference, || async {
            node.events.message("Waiting for LLM call response...").await;
        })
        .await
        .map_err(|e| AgentError::Llm(e.to_string()))?;

        let mut update = StateUpdate {
            structured_decisions: Some(response.decisions.clone()),
            cortex_last_thought: Some(Some(response.decisions_reason.clone())),
            ..Default::default()
        };
        if let Some(ids) = response.complete_subgoals_by_ids.clone() {
            if !ids.is_empty() {
                update.complete_subgoals_by_ids = Some(ids);
            }
        }
        update = update.with_thought(response.decisions_reason);
        if let Some(reason) = response
            .goals_completion_reason
            .filter(|reason| !reason.is_empty())
        {
            update = update.with_thought(reason);
        }

        Ok(state.sanitize_update("cortex", update))
    }
}

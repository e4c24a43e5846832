//! Planner: turn the goal into an ordered subgoal plan, or rebuild it
//! after a failure.

use crate::agents::{recent_thoughts, render};
use crate::context::MobiusContext;
use crate::errors::AgentError;
use crate::state::{
    any_failure, format_plan, AgentState, StateUpdate, Subgoal,
};
use agentgraph::stream::NodeContext;
use agentgraph::Message;
use llm::{invoke_structured, invoke_with_timeout_notice, AgentNode, ResponseSchema};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "\
You are the planner of an agent driving a live {{platform}} mobile device.
Decompose the user's goal into a short, ordered list of subgoals.

Rules:
- Each subgoal is one concrete milestone on the device (open an app, reach a
  screen, enter data, confirm an action, read a value).
- Subgoals must be achievable with the executor's tools: {{executor_tools_list}}.
- Do not plan verification-only subgoals; execution already verifies.
- Keep the plan as short as the goal allows.

When asked to replan, you are given the previous plan and the agents' notes
on what went wrong. Produce a fresh plan that routes around the failure
instead of repeating it.";

const HUMAN_PROMPT: &str = "\
Action: {{action}}

Goal: {{initial_goal}}

Previous plan (empty on first run):
{{previous_plan}}

Agent notes so far:
{{agent_thoughts}}";

#[derive(Debug, Deserialize)]
struct PlannerSubgoal {
    description: String,
}

#[derive(Debug, Deserialize)]
struct PlannerOutput {
    subgoals: Vec<PlannerSubgoal>,
}

fn output_schema() -> ResponseSchema {
    ResponseSchema::new(
        "subgoal_plan",
        json!({
            "type": "object",
            "properties": {
                "subgoals": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {"description": {"type": "string"}},
                        "required": ["description"]
                    }
                }
            },
            "required": ["subgoals"]
        }),
    )
}

pub struct PlannerNode {
    ctx: Arc<MobiusContext>,
    tools_list: String,
}

impl PlannerNode {
    pub fn new(ctx: Arc<MobiusContext>, tools_list: String) -> Self {
        Self { ctx, tools_list }
    }

    pub async fn run(
        &self,
        node: NodeContext<AgentState>,
        state: AgentState,
    ) -> Result<StateUpdate, AgentError> {
        let mode = if any_failure(&state.subgoal_plan) {
            "replan"
        } else {
            "plan"
        };
        tracing::info!(mode, "starting planner agent");

        let system = render(
            SYSTEM_PROMPT,
            &[
                ("platform", self.ctx.platform_name()),
                ("executor_tools_list", &self.tools_list),
            ],
        );
        let human = render(
            HUMAN_PROMPT,
            &[
                ("action", mode),
                ("initial_goal", &state.initial_goal),
                ("previous_plan", &format_plan(&state.subgoal_plan)),
                ("agent_thoughts", &recent_thoughts(&state, 30)),
            ],
        );
        let messages = vec![Message::system(system), Message::human(human)];

        let model = self
            .ctx
            .models
            .model_for(AgentNode::Planner)
            .map_err(|e| AgentError::Llm(e.to_string()))?;
        let response: PlannerOutput = invoke_with_timeout_notice(
            invoke_structured(&model, messages, output_schema(), 1.0),
            || async {
                node.events.message("Waiting for LLM call response...").await;
            },
        )
        .await
        .map_err(|e| AgentError::Planning(e.to_string()))?;

        if response.subgoals.is_empty() {
            return Err(AgentError::Planning("planner produced an empty plan".into()));
        }

        let plan: Vec<Subgoal> = response
            .subgoals
            .into_iter()
            .map(|subgoal| Subgoal::not_started(subgoal.description))
            .collect();
        tracing::info!(subgoals = plan.len(), "generated plan:\n{}", format_plan(&plan));

        Ok(state.sanitize_update("planner", StateUpdate::default().with_plan(plan)))
    }
}

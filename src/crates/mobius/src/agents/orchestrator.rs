//! Orchestrator: drive subgoal lifecycle: start the next subgoal, judge
//! the Cortex's completion proposals, request replanning on failure.

use crate::agents::{recent_thoughts, render};
use crate::context::MobiusContext;
use crate::errors::AgentError;
use crate::state::{
    all_completed, complete_subgoals_by_ids, current_subgoal, fail_current_subgoal, format_plan,
    nothing_started, start_next_subgoal, subgoals_by_ids, AgentState, StateUpdate,
};
use agentgraph::stream::NodeContext;
use agentgraph::Message;
use llm::{invoke_structured, invoke_with_timeout_notice, AgentNode, ResponseSchema};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "\
You supervise an agent working through a subgoal plan on a live {{platform}}
device. You are given the plan, the subgoals proposed as complete, and the
agents' notes. Decide:

- needs_replaning: true only when the notes show the current subgoal cannot
  succeed as planned (wrong app, missing feature, dead end). Transient
  failures that a retry could fix do not justify replanning.
- completed_subgoal_ids: the ids among the proposed subgoals that the notes
  genuinely support as done.
- reason: one or two sentences explaining the decision.";

const HUMAN_PROMPT: &str = "\
Goal: {{initial_goal}}

Plan:
{{subgoal_plan}}

Subgoals proposed as complete:
{{subgoals_to_examine}}

Agent notes:
{{agent_thoughts}}";

/// Structured verdict contract.
#[derive(Debug, Deserialize)]
struct OrchestratorOutput {
    needs_replaning: bool,
    reason: String,
    #[serde(default)]
    completed_subgoal_ids: Vec<String>,
}

fn output_schema() -> ResponseSchema {
    ResponseSchema::new(
        "orchestrator_verdict",
        json!({
            "type": "object",
            "properties": {
                "needs_replaning": {"type": "boolean"},
                "reason": {"type": "string"},
                "completed_subgoal_ids": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["needs_replaning", "reason", "completed_subgoal_ids"]
        }),
    )
}

pub struct OrchestratorNode {
    ctx: Arc<MobiusContext>,
}

impl OrchestratorNode {
    pub fn new(ctx: Arc<MobiusContext>) -> Self {
        Self { ctx }
    }

    pub async fn run(
        &self,
        node: NodeContext<AgentState>,
        state: AgentState,
    ) -> Result<StateUpdate, AgentError> {
        tracing::info!("starting orchestrator agent");
        let mut plan = state.subgoal_plan.clone();

        // Nothing running yet: advance the next subgoal and continue.
        if nothing_started(&plan) || current_subgoal(&plan).is_none() {
            let was_fresh = nothing_started(&plan);
            let thought = match start_next_subgoal(&mut plan) {
                Some(subgoal) if was_fresh => format!("Starting subgoal: {subgoal}"),
                Some(subgoal) => format!("Starting the next subgoal: {subgoal}"),
                None => "No subgoal left to start.".to_string(),
            };
            return Ok(state.sanitize_update(
                "orchestrator",
                StateUpdate::default()
                    .with_plan(plan)
                    .with_thought(thought)
                    .clearing_complete_ids(),
            ));
        }

        let to_examine = subgoals_by_ids(&plan, &state.complete_subgoals_by_ids);
        if to_examine.is_empty() {
            return Ok(state.sanitize_update(
                "orchestrator",
                StateUpdate::default()
                    .with_thought("No subgoal to examine.")
                    .clearing_complete_ids(),
            ));
        }
        let to_examine = to_examine
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join("\n");

        let system = render(SYSTEM_PROMPT, &[("platform", self.ctx.platform_name())]);
        let human = render(
            HUMAN_PROMPT,
            &[
                ("initial_goal", &state.initial_goal),
                ("subgoal_plan", &format_plan(&plan)),
                ("subgoals_to_examine", &to_examine),
                ("agent_thoughts", &recent_thoughts(&state, 30)),
            ],
        );
        let messages = vec![Message::system(system), Message::human(human)];

        let model = self
            .ctx
            .models
            .model_for(AgentNode::Orchestrator)
            .map_err(|e| AgentError::Llm(e.to_string()))?;
        let response: OrchestratorOutput = invoke_with_timeout_notice(
            invoke_structured(&model, messages, output_schema(), 1.0),
            || async {
                node.events.message("Waiting for LLM call response...").await;
            },
        )
        .await
        .map_err(|e| AgentError::Llm(e.to_string()))?;

        if response.needs_replaning {
            fail_current_subgoal(&mut plan, &response.reason);
            return Ok(state.sanitize_update(
                "orchestrator",
                StateUpdate::default()
                    .with_plan(plan)
                    .with_thought(response.reason)
                    .with_thought("==== END OF PLAN, REPLANNING ====")
                    .clearing_complete_ids(),
            ));
        }

        let previously_running = current_subgoal(&plan).map(|s| s.id.clone());
        complete_subgoals_by_ids(&mut plan, &response.completed_subgoal_ids, &response.reason);

        let mut update = StateUpdate::default().with_thought(response.reason.clone());

        if all_completed(&plan) {
            tracing::info!("all subgoals completed successfully");
            return Ok(state.sanitize_update(
                "orchestrator",
                update.with_plan(plan).clearing_complete_ids(),
            ));
        }

        let current_finished = previously_running
            .map(|id| response.completed_subgoal_ids.contains(&id))
            .unwrap_or(false);
        if current_finished {
            if let Some(next) = start_next_subgoal(&mut plan) {
                update = update.with_thought(format!("==== NEXT SUBGOAL: {next} ===="));
            }
        }

        Ok(state.sanitize_update(
            "orchestrator",
            update.with_plan(plan).clearing_complete_ids(),
        ))
    }
}

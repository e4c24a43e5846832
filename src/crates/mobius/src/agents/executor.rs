//! Executor: translate the Cortex's structured decisions into tool calls
//! by binding the tool set to the LLM.

use crate::agents::render;
use crate::context::MobiusContext;
use crate::errors::AgentError;
use crate::state::{AgentState, StateUpdate};
use crate::tools::ToolRegistry;
use agentgraph::llm::ChatRequest;
use agentgraph::stream::NodeContext;
use agentgraph::Message;
use llm::{invoke_with_timeout_notice, AgentNode};
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "\
You execute decided UI actions on a live {{platform}} mobile device by
calling the provided tools. You receive the decision rationale, the decided
actions as JSON, and the recent tool outcomes.

Rules:
- Call exactly the tools that realize the decided actions, in order.
- Copy targets faithfully; do not substitute your own locators.
- When an earlier tool outcome shows an action already happened, skip it.
- When the decided actions are impossible with the available tools, call
  nothing and say why.";

pub struct ExecutorNode {
    ctx: Arc<MobiusContext>,
    registry: Arc<ToolRegistry>,
}

impl ExecutorNode {
    pub fn new(ctx: Arc<MobiusContext>, registry: Arc<ToolRegistry>) -> Self {
        Self { ctx, registry }
    }

    pub async fn run(
        &self,
        node: NodeContext<AgentState>,
        state: AgentState,
    ) -> Result<StateUpdate, AgentError> {
        tracing::info!("starting executor agent");

        let Some(decisions) = state.structured_decisions.clone() else {
            tracing::warn!("no structured decisions found");
            return Ok(state.sanitize_update(
                "executor",
                StateUpdate::default()
                    .with_thought("No structured decisions found, I cannot execute anything."),
            ));
        };

        let cortex_last_thought = state
            .cortex_last_thought
            .clone()
            .or_else(|| state.agents_thoughts.last().cloned())
            .unwrap_or_default();

        let mut messages = vec![
            Message::system(render(
                SYSTEM_PROMPT,
                &[("platform", self.ctx.platform_name())],
            )),
            Message::human(cortex_last_thought.clone()),
            Message::human(decisions),
        ];
        messages.extend(state.executor_messages.iter().cloned());

        let flatten = self.ctx.models.needs_flat_tool_variants(AgentNode::Executor);
        let mut request = ChatRequest::new(messages)
            .with_temperature(0.0)
            .with_tools(self.registry.definitions(flatten));
        if self
            .ctx
            .models
            .supports_parallel_tool_calls(AgentNode::Executor)
        {
            request = request.with_parallel_tool_calls(true);
        }

        let model = self
            .ctx
            .models
            .model_for(AgentNode::Executor)
            .map_err(|e| AgentError::Llm(e.to_string()))?;
        let response = invoke_with_timeout_notice(model.chat(request), || async {
            node.events.message("Waiting for LLM call response...").await;
        })
        .await
        .map_err(|e| AgentError::Llm(e.to_string()))?;

        if let Some(calls) = response.message.get_tool_calls() {
            tracing::info!(count = calls.len(), "executor requested tool calls");
        } else {
            tracing::info!("executor requested no tool calls");
        }

        // The decisions are consumed here; clear them so no stale decisions
        // survive into the next step.
        let update = StateUpdate {
            structured_decisions: Some(None),
            cortex_last_thought: Some(Some(cortex_last_thought)),
            executor_messages: vec![response.message],
            ..Default::default()
        };
        Ok(state.sanitize_update("executor", update))
    }
}

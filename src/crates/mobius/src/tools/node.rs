//! The ExecutorTools node: dispatch the tool calls of the Executor's last
//! message against the device.

use crate::context::MobiusContext;
use crate::state::{AgentState, StateUpdate};
use crate::tools::{tool_update, ToolRegistry};
use agentgraph::{Message, ToolCall, ToolStatus};
use futures::future::join_all;
use llm::AgentNode;
use std::sync::Arc;

/// Graph node dispatching tool calls.
///
/// Tool calls within one superstep run in parallel when the executor's
/// provider advertises parallel tool calling, sequentially otherwise. The
/// per-call updates are folded, in call order, into a single aggregate
/// update the runtime commits atomically.
#[derive(Clone)]
pub struct ExecutorToolNode {
    registry: Arc<ToolRegistry>,
}

impl ExecutorToolNode {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Tool calls of the most recent assistant message, if any.
    fn pending_calls(state: &AgentState) -> Vec<ToolCall> {
        state
            .executor_messages
            .iter()
            .rev()
            .find(|message| message.is_assistant())
            .and_then(Message::get_tool_calls)
            .map(<[ToolCall]>::to_vec)
            .unwrap_or_default()
    }

    pub async fn run(&self, ctx: Arc<MobiusContext>, state: AgentState) -> StateUpdate {
        let calls = Self::pending_calls(&state);
        if calls.is_empty() {
            return StateUpdate::default();
        }

        tracing::info!(count = calls.len(), "dispatching executor tool calls");

        let updates: Vec<StateUpdate> =
            if ctx.models.supports_parallel_tool_calls(AgentNode::Executor) && calls.len() > 1 {
                join_all(
                    calls
                        .iter()
                        .map(|call| self.dispatch_one(ctx.as_ref(), &state, call)),
                )
                .await
            } else {
                let mut updates = Vec::with_capacity(calls.len());
                for call in &calls {
                    updates.push(self.dispatch_one(ctx.as_ref(), &state, call).await);
                }
                updates
            };

        let mut aggregate = StateUpdate::default();
        for update in updates {
            aggregate.merge(update);
        }
        state.sanitize_update("executor", aggregate)
    }

    async fn dispatch_one(
        &self,
        ctx: &MobiusContext,
        state: &AgentState,
        call: &ToolCall,
    ) -> StateUpdate {
        match self.registry.get(&call.name) {
            Some(tool) => tool.invoke(ctx, state, call).await,
            None => tool_update(
                call,
                "",
                format!("Unknown tool '{}'.", call.name),
                ToolStatus::Error,
            ),
        }
    }
}

//! The agent orchestration graph: node registration, routing gates, and
//! the deferred convergence point.
//!
//! Authoritative topology:
//!
//! ```text
//! START -> planner -> orchestrator
//! orchestrator --continue--> contextor -> cortex
//! orchestrator --replan----> planner
//! orchestrator --end-------> convergence
//! cortex --continue--------> executor
//! cortex --review_subgoals-> orchestrator
//! executor --invoke_tools--> executor_tools -> summarizer
//! executor --skip----------> summarizer
//! summarizer -> convergence
//! convergence --continue---> contextor
//! convergence --end--------> END
//! ```

use crate::agents::contextor::ContextorNode;
use crate::agents::cortex::CortexNode;
use crate::agents::executor::ExecutorNode;
use crate::agents::orchestrator::OrchestratorNode;
use crate::agents::planner::PlannerNode;
use crate::agents::summarizer::SummarizerNode;
use crate::context::MobiusContext;
use crate::errors::{AgentError, Result};
use crate::state::{all_completed, any_failure, current_subgoal, AgentState, StateUpdate};
use crate::tools::node::ExecutorToolNode;
use crate::tools::ToolRegistry;
use agentgraph::{CompiledGraph, RouteResult, StateGraph, END, START};
use llm::AgentNode;
use std::sync::Arc;

/// Route after the Orchestrator: replan on any failure, end when the plan
/// is exhausted (all done, or nothing left running), continue otherwise.
pub fn post_orchestrator_gate(state: &AgentState) -> &'static str {
    tracing::debug!("running post_orchestrator_gate");
    if any_failure(&state.subgoal_plan) {
        tracing::info!("a subgoal is in failure state, asking to replan");
        return "replan";
    }
    if all_completed(&state.subgoal_plan) {
        tracing::info!("all subgoals are completed, ending the goal");
        return "end";
    }
    if current_subgoal(&state.subgoal_plan).is_none() {
        tracing::info!("no subgoal running, ending the goal");
        return "end";
    }
    "continue"
}

/// Route after the Cortex. Both routes may fire in one superstep: subgoal
/// completions (or an absent decision) go back through the Orchestrator,
/// while present decisions continue to the Executor.
pub fn post_cortex_gate(state: &AgentState) -> RouteResult {
    tracing::debug!("running post_cortex_gate");
    let mut routes = Vec::new();
    if !state.complete_subgoals_by_ids.is_empty() || state.structured_decisions.is_none() {
        routes.push("review_subgoals".to_string());
    }
    if state.structured_decisions.is_some() {
        routes.push("continue".to_string());
    }
    RouteResult::Multiple(routes)
}

/// Route after the Executor: invoke tools when its message carries tool
/// calls, otherwise skip straight to the Summarizer.
pub fn post_executor_gate(state: &AgentState) -> &'static str {
    tracing::debug!("running post_executor_gate");
    let has_tool_calls = state
        .executor_messages
        .last()
        .filter(|message| message.is_assistant())
        .and_then(|message| message.get_tool_calls())
        .is_some();
    if has_tool_calls {
        "invoke_tools"
    } else {
        "skip"
    }
}

/// Exit decision at the convergence point: end once every subgoal is
/// Success (or nothing is running anymore), else loop back into the
/// observation/action cycle.
pub fn convergence_gate(state: &AgentState) -> &'static str {
    if all_completed(&state.subgoal_plan) || current_subgoal(&state.subgoal_plan).is_none() {
        "end"
    } else {
        "continue"
    }
}

/// Assemble and compile the task graph.
pub fn build_graph(
    ctx: Arc<MobiusContext>,
    registry: Arc<ToolRegistry>,
) -> Result<CompiledGraph<AgentState>> {
    let mut graph: StateGraph<AgentState> = StateGraph::new();

    let tools_list = registry.names(ctx.models.needs_flat_tool_variants(AgentNode::Executor));

    let planner = Arc::new(PlannerNode::new(Arc::clone(&ctx), tools_list));
    graph.add_node("planner", move |node, state| {
        let planner = Arc::clone(&planner);
        async move { planner.run(node, state).await.map_err(AgentError::boxed) }
    });

    let orchestrator = Arc::new(OrchestratorNode::new(Arc::clone(&ctx)));
    graph.add_node("orchestrator", move |node, state| {
        let orchestrator = Arc::clone(&orchestrator);
        async move {
            orchestrator
                .run(node, state)
                .await
                .map_err(AgentError::boxed)
        }
    });

    let contextor = Arc::new(ContextorNode::new(Arc::clone(&ctx)));
    graph.add_node("contextor", move |node, state| {
        let contextor = Arc::clone(&contextor);
        async move { contextor.run(node, state).await.map_err(AgentError::boxed) }
    });

    let cortex = Arc::new(CortexNode::new(Arc::clone(&ctx)));
    graph.add_node("cortex", move |node, state| {
        let cortex = Arc::clone(&cortex);
        async move { cortex.run(node, state).await.map_err(AgentError::boxed) }
    });

    let executor = Arc::new(ExecutorNode::new(Arc::clone(&ctx), Arc::clone(&registry)));
    graph.add_node("executor", move |node, state| {
        let executor = Arc::clone(&executor);
        async move { executor.run(node, state).await.map_err(AgentError::boxed) }
    });

    let executor_tools = ExecutorToolNode::new(Arc::clone(&registry));
    let tools_ctx = Arc::clone(&ctx);
    graph.add_node("executor_tools", move |_node, state| {
        let executor_tools = executor_tools.clone();
        let ctx = Arc::clone(&tools_ctx);
        async move { Ok(executor_tools.run(ctx, state).await) }
    });

    let summarizer = Arc::new(SummarizerNode);
    graph.add_node("summarizer", move |node, state| {
        let summarizer = Arc::clone(&summarizer);
        async move { summarizer.run(node, state).await.map_err(AgentError::boxed) }
    });

    // No-op convergence point; deferred so both inbound paths settle first.
    graph.add_deferred_node("convergence", |_node, _state| async {
        Ok(StateUpdate::default())
    });

    graph.add_edge(START, "planner");
    graph.add_edge("planner", "orchestrator");
    graph.add_conditional_edges(
        "orchestrator",
        post_orchestrator_gate,
        [
            ("continue", "contextor"),
            ("replan", "planner"),
            ("end", "convergence"),
        ],
    );
    graph.add_edge("contextor", "cortex");
    graph.add_conditional_edges(
        "cortex",
        post_cortex_gate,
        [("continue", "executor"), ("review_subgoals", "orchestrator")],
    );
    graph.add_conditional_edges(
        "executor",
        post_executor_gate,
        [("invoke_tools", "executor_tools"), ("skip", "summarizer")],
    );
    graph.add_edge("executor_tools", "summarizer");
    graph.add_edge("summarizer", "convergence");
    graph.add_conditional_edges(
        "convergence",
        convergence_gate,
        [("continue", "contextor"), ("end", END)],
    );

    graph.compile().map_err(AgentError::from)
}

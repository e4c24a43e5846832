//! The compiled graph and its superstep scheduler.
//!
//! Execution is an explicit loop over a work queue. One **superstep** is one
//! node execution plus its atomic state commit. Per task the loop is a
//! single logical thread of control: no two nodes ever run concurrently
//! against the same state, and suspension happens only inside node actions
//! at their own I/O awaits.
//!
//! The scheduler keeps two queues: the regular frontier and a deferred set.
//! Routing to a deferred node parks it; it is drained only once the frontier
//! is empty, which is what makes deferred nodes convergence points.
//!
//! A step budget caps total node executions. Before each execution the
//! remaining budget is written into the state (so nodes can see it), and
//! exceeding the budget terminates the run with
//! [`GraphError::BudgetExhausted`]. Cancellation is cooperative: the token
//! is raced against the node future, the in-flight update is discarded, and
//! the last committed snapshot (already streamed) is what survives.

use crate::error::{GraphError, Result};
use crate::graph::{Edge, Graph, NodeId, END, START};
use crate::state::GraphState;
use crate::stream::{EventSink, NodeContext, StreamEvent};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

/// Per-run execution settings.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Maximum number of node executions before the run fails with
    /// [`GraphError::BudgetExhausted`].
    pub max_steps: u32,
    /// Cooperative cancellation signal. Cancelling unblocks the node
    /// currently suspended at an I/O await and discards its update.
    pub cancel: CancellationToken,
    /// Capacity of the bounded event channel.
    pub channel_capacity: usize,
}

impl RunConfig {
    pub fn new(max_steps: u32) -> Self {
        Self {
            max_steps,
            ..Default::default()
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_steps: 100,
            cancel: CancellationToken::new(),
            channel_capacity: 100,
        }
    }
}

/// A running graph execution: the multiplexed event stream plus a handle
/// resolving to the final state (or the terminal error).
pub struct GraphRun<S: GraphState> {
    pub events: ReceiverStream<StreamEvent<S>>,
    pub outcome: JoinHandle<Result<S>>,
}

/// An executable graph produced by [`StateGraph::compile`](crate::StateGraph::compile).
#[derive(Clone)]
pub struct CompiledGraph<S: GraphState> {
    graph: Arc<Graph<S>>,
}

impl<S: GraphState> CompiledGraph<S> {
    pub(crate) fn new(graph: Graph<S>) -> Self {
        Self {
            graph: Arc::new(graph),
        }
    }

    /// Start execution and stream events as they happen. The run itself is
    /// spawned; await `outcome` after draining `events` to obtain the final
    /// state.
    pub fn stream(&self, input: S, config: RunConfig) -> GraphRun<S> {
        let (tx, rx) = mpsc::channel(config.channel_capacity);
        let graph = Arc::clone(&self.graph);
        let outcome = tokio::spawn(run_loop(graph, input, config, tx));
        GraphRun {
            events: ReceiverStream::new(rx),
            outcome,
        }
    }

    /// Execute to completion, discarding intermediate events.
    pub async fn invoke(&self, input: S, config: RunConfig) -> Result<S> {
        let mut run = self.stream(input, config);
        while run.events.next().await.is_some() {}
        run.outcome
            .await
            .map_err(|e| GraphError::Validation(format!("execution task panicked: {e}")))?
    }
}

#[tracing::instrument(skip_all, fields(max_steps = config.max_steps))]
async fn run_loop<S: GraphState>(
    graph: Arc<Graph<S>>,
    mut state: S,
    config: RunConfig,
    tx: mpsc::Sender<StreamEvent<S>>,
) -> Result<S> {
    let mut frontier: VecDeque<NodeId> = VecDeque::new();
    let mut deferred: VecDeque<NodeId> = VecDeque::new();

    if graph.entry == START {
        for target in route_from(&graph, START, &state)? {
            schedule(&graph, target, &mut frontier, &mut deferred)?;
        }
    } else {
        frontier.push_back(graph.entry.clone());
    }

    let mut steps_used: u32 = 0;

    loop {
        let node_id = match frontier.pop_front().or_else(|| deferred.pop_front()) {
            Some(node_id) => node_id,
            None => break,
        };

        if steps_used >= config.max_steps {
            tracing::warn!(limit = config.max_steps, "step budget exhausted");
            return Err(GraphError::BudgetExhausted {
                limit: config.max_steps,
            });
        }
        steps_used += 1;
        state.set_remaining_steps(config.max_steps - steps_used);

        let spec = graph
            .nodes
            .get(&node_id)
            .ok_or_else(|| GraphError::UnknownNode(node_id.clone()))?;

        tracing::debug!(node = %node_id, step = steps_used, "running node");
        let ctx = NodeContext {
            node: node_id.clone(),
            events: EventSink::new(node_id.clone(), tx.clone()),
        };

        let update = tokio::select! {
            biased;
            _ = config.cancel.cancelled() => {
                tracing::info!(node = %node_id, "execution cancelled; discarding in-flight update");
                return Err(GraphError::Cancelled);
            }
            result = (spec.action)(ctx, state.clone()) => {
                result.map_err(|source| GraphError::Node { node: node_id.clone(), source })?
            }
        };

        // The commit is atomic from the consumer's point of view: the update
        // is applied in full, then streamed, then the snapshot follows.
        state.apply(update.clone());
        let _ = tx
            .send(StreamEvent::Updates {
                node: node_id.clone(),
                update,
            })
            .await;
        let _ = tx
            .send(StreamEvent::Values {
                state: state.clone(),
            })
            .await;

        for target in route_from(&graph, &node_id, &state)? {
            schedule(&graph, target, &mut frontier, &mut deferred)?;
        }
    }

    tracing::debug!(steps = steps_used, "graph execution completed");
    Ok(state)
}

fn schedule<S: GraphState>(
    graph: &Graph<S>,
    target: NodeId,
    frontier: &mut VecDeque<NodeId>,
    deferred: &mut VecDeque<NodeId>,
) -> Result<()> {
    if target == END {
        return Ok(());
    }
    let spec = graph
        .nodes
        .get(&target)
        .ok_or_else(|| GraphError::UnknownNode(target.clone()))?;
    if spec.deferred {
        // A deferred node runs once per convergence, however many paths
        // reach it.
        if !deferred.contains(&target) {
            deferred.push_back(target);
        }
    } else {
        frontier.push_back(target);
    }
    Ok(())
}

fn route_from<S: GraphState>(graph: &Graph<S>, from: &str, state: &S) -> Result<Vec<NodeId>> {
    let mut targets = Vec::new();
    if let Some(edges) = graph.edges.get(from) {
        for edge in edges {
            match edge {
                Edge::Direct(to) => targets.push(to.clone()),
                Edge::Conditional { router, branches } => {
                    for route in router(state).into_routes() {
                        let to = branches.get(&route).ok_or_else(|| {
                            GraphError::UnknownRoute {
                                node: from.to_string(),
                                route: route.clone(),
                            }
                        })?;
                        targets.push(to.clone());
                    }
                }
            }
        }
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::StateGraph;
    use crate::graph::RouteResult;
    use serde::Serialize;
    use std::time::Duration;

    #[derive(Debug, Clone, Serialize, Default)]
    struct TraceState {
        log: Vec<String>,
        remaining: u32,
        done: bool,
    }

    #[derive(Debug, Clone, Serialize, Default)]
    struct TraceUpdate {
        log: Vec<String>,
        done: Option<bool>,
    }

    impl GraphState for TraceState {
        type Update = TraceUpdate;

        fn apply(&mut self, update: TraceUpdate) {
            self.log.extend(update.log);
            if let Some(done) = update.done {
                self.done = done;
            }
        }

        fn set_remaining_steps(&mut self, remaining: u32) {
            self.remaining = remaining;
        }
    }

    fn log_update(entry: &str) -> TraceUpdate {
        TraceUpdate {
            log: vec![entry.to_string()],
            done: None,
        }
    }

    #[tokio::test]
    async fn test_linear_execution_order() {
        let mut graph: StateGraph<TraceState> = StateGraph::new();
        graph.add_node("a", |_ctx, _s| async { Ok(log_update("a")) });
        graph.add_node("b", |_ctx, _s| async { Ok(log_update("b")) });
        graph.add_edge(START, "a");
        graph.add_edge("a", "b");
        graph.add_edge("b", END);

        let compiled = graph.compile().unwrap();
        let result = compiled
            .invoke(TraceState::default(), RunConfig::default())
            .await
            .unwrap();
        assert_eq!(result.log, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_conditional_routing_and_loop() {
        let mut graph: StateGraph<TraceState> = StateGraph::new();
        graph.add_node("work", |_ctx, s: TraceState| async move {
            let mut update = log_update("work");
            if s.log.len() >= 2 {
                update.done = Some(true);
            }
            Ok(update)
        });
        graph.add_edge(START, "work");
        graph.add_conditional_edges(
            "work",
            |s: &TraceState| if s.done { "end" } else { "continue" },
            [("continue", "work"), ("end", END)],
        );

        let compiled = graph.compile().unwrap();
        let result = compiled
            .invoke(TraceState::default(), RunConfig::default())
            .await
            .unwrap();
        assert_eq!(result.log.len(), 3);
        assert!(result.done);
    }

    #[tokio::test]
    async fn test_budget_exhaustion() {
        let mut graph: StateGraph<TraceState> = StateGraph::new();
        graph.add_node("spin", |_ctx, _s| async { Ok(log_update("spin")) });
        graph.add_edge(START, "spin");
        graph.add_edge("spin", "spin");

        let compiled = graph.compile().unwrap();
        let err = compiled
            .invoke(TraceState::default(), RunConfig::new(3))
            .await
            .unwrap_err();
        assert!(err.is_budget_exhausted());
    }

    #[tokio::test]
    async fn test_remaining_steps_monotonic() {
        let mut graph: StateGraph<TraceState> = StateGraph::new();
        graph.add_node("tick", |_ctx, s: TraceState| async move {
            Ok(log_update(&format!("{}", s.remaining)))
        });
        graph.add_edge(START, "tick");
        graph.add_conditional_edges(
            "tick",
            |s: &TraceState| if s.log.len() >= 3 { "end" } else { "more" },
            [("more", "tick"), ("end", END)],
        );

        let compiled = graph.compile().unwrap();
        let result = compiled
            .invoke(TraceState::default(), RunConfig::new(10))
            .await
            .unwrap();
        let seen: Vec<u32> = result.log.iter().map(|s| s.parse().unwrap()).collect();
        assert_eq!(seen, vec![9, 8, 7]);
    }

    #[tokio::test]
    async fn test_deferred_node_runs_last_and_once() {
        let mut graph: StateGraph<TraceState> = StateGraph::new();
        graph.add_node("fan", |_ctx, _s| async { Ok(log_update("fan")) });
        graph.add_node("x", |_ctx, _s| async { Ok(log_update("x")) });
        graph.add_node("y", |_ctx, _s| async { Ok(log_update("y")) });
        graph.add_deferred_node("join", |_ctx, _s| async { Ok(log_update("join")) });
        graph.add_edge(START, "fan");
        graph.add_conditional_edges(
            "fan",
            |_s: &TraceState| RouteResult::Multiple(vec!["left".into(), "right".into()]),
            [("left", "x"), ("right", "y")],
        );
        graph.add_edge("x", "join");
        graph.add_edge("y", "join");
        graph.add_edge("join", END);

        let compiled = graph.compile().unwrap();
        let result = compiled
            .invoke(TraceState::default(), RunConfig::default())
            .await
            .unwrap();
        assert_eq!(result.log, vec!["fan", "x", "y", "join"]);
    }

    #[tokio::test]
    async fn test_cancellation_discards_inflight_update() {
        let mut graph: StateGraph<TraceState> = StateGraph::new();
        graph.add_node("fast", |_ctx, _s| async { Ok(log_update("fast")) });
        graph.add_node("slow", |_ctx, _s| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(log_update("slow"))
        });
        graph.add_edge(START, "fast");
        graph.add_edge("fast", "slow");
        graph.add_edge("slow", END);

        let compiled = graph.compile().unwrap();
        let cancel = CancellationToken::new();
        let mut run = compiled.stream(
            TraceState::default(),
            RunConfig::default().with_cancel(cancel.clone()),
        );

        let mut last_snapshot = None;
        while let Some(event) = run.events.next().await {
            if let StreamEvent::Values { state } = event {
                last_snapshot = Some(state);
                // First snapshot means "fast" committed and "slow" is in
                // flight; cancel now.
                cancel.cancel();
            }
        }

        let err = run.outcome.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(last_snapshot.unwrap().log, vec!["fast"]);
    }

    #[tokio::test]
    async fn test_updates_stream_precedes_values() {
        let mut graph: StateGraph<TraceState> = StateGraph::new();
        graph.add_node("a", |_ctx, _s| async { Ok(log_update("a")) });
        graph.add_edge(START, "a");
        graph.add_edge("a", END);

        let compiled = graph.compile().unwrap();
        let mut run = compiled.stream(TraceState::default(), RunConfig::default());

        let mut kinds = Vec::new();
        while let Some(event) = run.events.next().await {
            kinds.push(match event {
                StreamEvent::Updates { .. } => "updates",
                StreamEvent::Values { .. } => "values",
                StreamEvent::Message { .. } => "message",
                StreamEvent::Custom { .. } => "custom",
            });
        }
        assert_eq!(kinds, vec!["updates", "values"]);
        run.outcome.await.unwrap().unwrap();
    }
}

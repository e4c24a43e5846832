//! Core graph data structures.
//!
//! A graph is a set of named nodes connected by direct and conditional
//! edges, with the special sentinels [`START`] and [`END`] marking entry and
//! exit. Nodes carry an async action `(NodeContext, State) -> Update`;
//! conditional edges carry a router over the committed state plus a branch
//! map used for validation and routing.
//!
//! ```text
//! START ──> planner ──> orchestrator ──(continue)──> contextor ──> ...
//!                            │
//!                            └─(end)──> convergence ──(end)──> END
//! ```
//!
//! Construction normally goes through [`StateGraph`](crate::StateGraph),
//! which compiles into an executable [`CompiledGraph`](crate::CompiledGraph).

use crate::error::{NodeError, Result};
use crate::state::GraphState;
use crate::stream::NodeContext;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Node identifier. Unique within a graph.
pub type NodeId = String;

/// Virtual entry node. Never executes; its edges seed the first superstep.
pub const START: &str = "__start__";

/// Virtual exit node. Routing to END schedules nothing.
pub const END: &str = "__end__";

/// Boxed future returned by node actions.
pub type NodeFuture<U> = Pin<Box<dyn Future<Output = std::result::Result<U, NodeError>> + Send>>;

/// Async node action: a pure function from a state snapshot to an update.
pub type NodeAction<S> =
    Arc<dyn Fn(NodeContext<S>, S) -> NodeFuture<<S as GraphState>::Update> + Send + Sync>;

/// Router function for conditional edges.
pub type RouterFn<S> = Arc<dyn Fn(&S) -> RouteResult + Send + Sync>;

/// Result of a conditional router: one branch key, or several when more than
/// one outgoing route fires in the same superstep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteResult {
    Single(String),
    Multiple(Vec<String>),
}

impl RouteResult {
    pub fn into_routes(self) -> Vec<String> {
        match self {
            RouteResult::Single(route) => vec![route],
            RouteResult::Multiple(routes) => routes,
        }
    }
}

impl From<&str> for RouteResult {
    fn from(route: &str) -> Self {
        RouteResult::Single(route.to_string())
    }
}

impl From<String> for RouteResult {
    fn from(route: String) -> Self {
        RouteResult::Single(route)
    }
}

/// Node definition: name, action, and scheduling class.
///
/// A **deferred** node is not executed as soon as it is routed to. It waits
/// until every non-deferred node scheduled ahead of it has run, which makes
/// it a convergence point for paths that must collapse into a single exit
/// decision.
#[derive(Clone)]
pub struct NodeSpec<S: GraphState> {
    pub name: String,
    pub action: NodeAction<S>,
    pub deferred: bool,
}

impl<S: GraphState> std::fmt::Debug for NodeSpec<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeSpec")
            .field("name", &self.name)
            .field("action", &"<function>")
            .field("deferred", &self.deferred)
            .finish()
    }
}

/// Edge type defining transitions between nodes.
#[derive(Clone)]
pub enum Edge<S: GraphState> {
    /// Unconditional edge to a specific node.
    Direct(NodeId),

    /// Conditional edge with dynamic routing. The router is evaluated over
    /// the state committed by the source node; every returned branch key is
    /// resolved through `branches`.
    Conditional {
        router: RouterFn<S>,
        branches: HashMap<String, NodeId>,
    },
}

impl<S: GraphState> std::fmt::Debug for Edge<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Edge::Direct(to) => f.debug_tuple("Direct").field(to).finish(),
            Edge::Conditional { branches, .. } => f
                .debug_struct("Conditional")
                .field("router", &"<function>")
                .field("branches", branches)
                .finish(),
        }
    }
}

/// Core graph structure containing nodes and edges.
#[derive(Debug, Clone)]
pub struct Graph<S: GraphState> {
    pub nodes: HashMap<NodeId, NodeSpec<S>>,
    pub edges: HashMap<NodeId, Vec<Edge<S>>>,
    pub entry: NodeId,
}

impl<S: GraphState> Graph<S> {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            entry: START.to_string(),
        }
    }

    pub fn add_node(&mut self, id: NodeId, spec: NodeSpec<S>) {
        self.nodes.insert(id, spec);
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        self.edges.entry(from).or_default().push(Edge::Direct(to));
    }

    pub fn add_conditional_edge(
        &mut self,
        from: NodeId,
        router: RouterFn<S>,
        branches: HashMap<String, NodeId>,
    ) {
        self.edges
            .entry(from)
            .or_default()
            .push(Edge::Conditional { router, branches });
    }

    pub fn set_entry(&mut self, node: NodeId) {
        self.entry = node;
    }

    /// Validate the graph structure: the entry point and every edge source,
    /// edge target, and conditional branch target must exist (START and END
    /// are always legal).
    pub fn validate(&self) -> Result<()> {
        use crate::error::GraphError;

        if !self.nodes.contains_key(&self.entry) && self.entry != START {
            return Err(GraphError::Validation(format!(
                "entry point '{}' does not exist",
                self.entry
            )));
        }

        for (from, edges) in &self.edges {
            if !self.nodes.contains_key(from) && from != START {
                return Err(GraphError::Validation(format!(
                    "edge source '{from}' does not exist"
                )));
            }

            for edge in edges {
                match edge {
                    Edge::Direct(to) => {
                        if !self.nodes.contains_key(to) && to != END {
                            return Err(GraphError::Validation(format!(
                                "edge target '{to}' does not exist"
                            )));
                        }
                    }
                    Edge::Conditional { branches, .. } => {
                        for to in branches.values() {
                            if !self.nodes.contains_key(to) && to != END {
                                return Err(GraphError::Validation(format!(
                                    "branch target '{to}' does not exist"
                                )));
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

impl<S: GraphState> Default for Graph<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::NodeContext;
    use serde::Serialize;

    #[derive(Debug, Clone, Serialize)]
    struct TestState;

    impl GraphState for TestState {
        type Update = ();
        fn apply(&mut self, _update: ()) {}
        fn set_remaining_steps(&mut self, _remaining: u32) {}
    }

    fn noop_spec(name: &str) -> NodeSpec<TestState> {
        NodeSpec {
            name: name.to_string(),
            action: Arc::new(|_ctx: NodeContext<TestState>, _state| Box::pin(async { Ok(()) })),
            deferred: false,
        }
    }

    #[test]
    fn test_graph_creation() {
        let graph: Graph<TestState> = Graph::new();
        assert_eq!(graph.nodes.len(), 0);
        assert_eq!(graph.entry, START);
    }

    #[test]
    fn test_validation_catches_missing_target() {
        let mut graph: Graph<TestState> = Graph::new();
        graph.add_edge(START.to_string(), "missing".to_string());
        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_validation_accepts_linear_flow() {
        let mut graph: Graph<TestState> = Graph::new();
        graph.add_node("a".to_string(), noop_spec("a"));
        graph.add_node("b".to_string(), noop_spec("b"));
        graph.add_edge(START.to_string(), "a".to_string());
        graph.add_edge("a".to_string(), "b".to_string());
        graph.add_edge("b".to_string(), END.to_string());
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_route_result_flattening() {
        assert_eq!(
            RouteResult::Single("continue".into()).into_routes(),
            vec!["continue".to_string()]
        );
        assert_eq!(
            RouteResult::Multiple(vec!["a".into(), "b".into()]).into_routes(),
            vec!["a".to_string(), "b".to_string()]
        );
    }
}

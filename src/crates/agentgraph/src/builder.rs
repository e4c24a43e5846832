//! High-level builder API for constructing graphs.
//!
//! `StateGraph` wraps [`Graph`] with ergonomic registration methods that
//! accept plain async closures, then compiles into an executable
//! [`CompiledGraph`]. Validation happens at compile time so routing mistakes
//! surface before the first task runs.
//!
//! ```rust,ignore
//! let mut graph = StateGraph::new();
//! graph.add_node("planner", move |ctx, state| planner.run(ctx, state));
//! graph.add_edge(START, "planner");
//! graph.add_conditional_edges(
//!     "orchestrator",
//!     post_orchestrator_gate,
//!     [("continue", "contextor"), ("replan", "planner"), ("end", END)],
//! );
//! let compiled = graph.compile()?;
//! ```

use crate::error::{NodeError, Result};
use crate::graph::{Graph, NodeSpec, RouteResult, RouterFn};
use crate::runtime::CompiledGraph;
use crate::state::GraphState;
use crate::stream::NodeContext;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Builder for a typed-state graph.
pub struct StateGraph<S: GraphState> {
    graph: Graph<S>,
}

impl<S: GraphState> StateGraph<S> {
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
        }
    }

    /// Register a node with an async action.
    pub fn add_node<F, Fut>(&mut self, name: &str, action: F) -> &mut Self
    where
        F: Fn(NodeContext<S>, S) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<S::Update, NodeError>> + Send + 'static,
    {
        self.insert_node(name, action, false);
        self
    }

    /// Register a deferred node: it runs only after every non-deferred node
    /// already scheduled has completed, collapsing parallel paths into a
    /// single convergence point.
    pub fn add_deferred_node<F, Fut>(&mut self, name: &str, action: F) -> &mut Self
    where
        F: Fn(NodeContext<S>, S) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<S::Update, NodeError>> + Send + 'static,
    {
        self.insert_node(name, action, true);
        self
    }

    fn insert_node<F, Fut>(&mut self, name: &str, action: F, deferred: bool)
    where
        F: Fn(NodeContext<S>, S) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<S::Update, NodeError>> + Send + 'static,
    {
        let spec = NodeSpec {
            name: name.to_string(),
            action: Arc::new(move |ctx, state| Box::pin(action(ctx, state))),
            deferred,
        };
        self.graph.add_node(name.to_string(), spec);
    }

    /// Add an unconditional edge.
    pub fn add_edge(&mut self, from: &str, to: &str) -> &mut Self {
        self.graph.add_edge(from.to_string(), to.to_string());
        self
    }

    /// Add a conditional edge. The router inspects the committed state and
    /// returns one or more branch keys; each is resolved to a target through
    /// the branch map.
    pub fn add_conditional_edges<F, R>(
        &mut self,
        from: &str,
        router: F,
        branches: impl IntoIterator<Item = (&'static str, &'static str)>,
    ) -> &mut Self
    where
        F: Fn(&S) -> R + Send + Sync + 'static,
        R: Into<RouteResult>,
    {
        let router: RouterFn<S> = Arc::new(move |state| router(state).into());
        let branches: HashMap<String, String> = branches
            .into_iter()
            .map(|(route, to)| (route.to_string(), to.to_string()))
            .collect();
        self.graph
            .add_conditional_edge(from.to_string(), router, branches);
        self
    }

    /// Override the entry point (defaults to [`START`]).
    pub fn set_entry(&mut self, node: &str) -> &mut Self {
        self.graph.set_entry(node.to_string());
        self
    }

    /// Validate and compile into an executable graph.
    pub fn compile(self) -> Result<CompiledGraph<S>> {
        self.graph.validate()?;
        Ok(CompiledGraph::new(self.graph))
    }
}

impl<S: GraphState> Default for StateGraph<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<String>> for RouteResult {
    fn from(routes: Vec<String>) -> Self {
        RouteResult::Multiple(routes)
    }
}

//! agentgraph: a typed-state graph runtime for long-running LLM agents.
//!
//! A graph is a finite state machine whose nodes are async agents over a
//! shared, task-scoped state. The runtime streams intermediate values,
//! enforces a step budget, propagates cooperative cancellation, and commits
//! each node's update atomically.
//!
//! The crate also carries the provider-agnostic [`llm`] surface
//! ([`ChatModel`](llm::ChatModel) and friends) that LLM provider crates
//! implement.

pub mod builder;
pub mod error;
pub mod graph;
pub mod llm;
pub mod messages;
pub mod runtime;
pub mod state;
pub mod stream;

pub use builder::StateGraph;
pub use error::{GraphError, NodeError, Result};
pub use graph::{RouteResult, END, START};
pub use messages::{ContentPart, Message, MessageContent, MessageRole, ToolCall, ToolStatus};
pub use runtime::{CompiledGraph, GraphRun, RunConfig};
pub use state::GraphState;
pub use stream::{EventSink, NodeContext, StreamEvent};

pub use tokio_util::sync::CancellationToken;

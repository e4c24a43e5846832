//! Streaming channels for graph execution observability.
//!
//! The runtime fans execution out on four channels, multiplexed over a
//! single bounded mpsc stream:
//!
//! | Channel  | Event | Emitted by |
//! |----------|-------|------------|
//! | values   | [`StreamEvent::Values`], full state snapshot after each superstep | runtime |
//! | updates  | [`StreamEvent::Updates`], the per-node update just committed | runtime |
//! | messages | [`StreamEvent::Message`], LLM text chunks or progress notices | nodes, via [`EventSink`] |
//! | custom   | [`StreamEvent::Custom`], application-defined values | nodes, via [`EventSink`] |
//!
//! Consumers observe snapshots in the same order as state transitions. The
//! channel is bounded, so a slow consumer backpressures execution instead of
//! growing memory.

use crate::graph::NodeId;
use crate::state::GraphState;
use serde_json::Value;
use tokio::sync::mpsc;

/// A single event on the multiplexed execution stream.
#[derive(Debug, Clone)]
pub enum StreamEvent<S: GraphState> {
    /// Complete state snapshot after a superstep commit.
    Values { state: S },

    /// The update a node just produced, before the next snapshot.
    Updates { node: NodeId, update: S::Update },

    /// Text emitted by a node mid-execution (LLM chunks, wait notices).
    Message { node: NodeId, chunk: String },

    /// Application-defined event emitted by a node.
    Custom { node: NodeId, value: Value },
}

/// Handle a node uses to emit `messages` and `custom` events while it runs.
///
/// Sending never fails from the node's point of view: if the consumer is
/// gone the event is dropped.
#[derive(Clone)]
pub struct EventSink<S: GraphState> {
    node: NodeId,
    tx: mpsc::Sender<StreamEvent<S>>,
}

impl<S: GraphState> EventSink<S> {
    pub(crate) fn new(node: NodeId, tx: mpsc::Sender<StreamEvent<S>>) -> Self {
        Self { node, tx }
    }

    /// Emit a text chunk on the `messages` channel.
    pub async fn message(&self, chunk: impl Into<String>) {
        let _ = self
            .tx
            .send(StreamEvent::Message {
                node: self.node.clone(),
                chunk: chunk.into(),
            })
            .await;
    }

    /// Emit a value on the `custom` channel.
    pub async fn custom(&self, value: Value) {
        let _ = self
            .tx
            .send(StreamEvent::Custom {
                node: self.node.clone(),
                value,
            })
            .await;
    }
}

/// Per-execution context handed to a node action alongside its state
/// snapshot.
#[derive(Clone)]
pub struct NodeContext<S: GraphState> {
    /// Name of the node being executed.
    pub node: NodeId,
    /// Sink for messages/custom stream events.
    pub events: EventSink<S>,
}

impl<S: GraphState> NodeContext<S> {
    /// Build a detached context whose events go nowhere. Useful in tests
    /// that call node actions directly.
    pub fn detached(node: impl Into<NodeId>) -> Self {
        let (tx, _rx) = mpsc::channel(1);
        let node = node.into();
        Self {
            node: node.clone(),
            events: EventSink::new(node, tx),
        }
    }
}

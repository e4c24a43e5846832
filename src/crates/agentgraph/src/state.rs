//! The typed-state contract between a graph and its nodes.
//!
//! Nodes never receive mutable access to the shared state. Each node gets a
//! snapshot, returns an update, and the runtime commits that update
//! atomically after the node's action completes. How an update merges into
//! the state (replace a field, append to a log, ...) is entirely the state
//! type's business, expressed in [`GraphState::apply`].

use serde::Serialize;

/// A task-scoped blackboard driven by a graph.
///
/// Implementors define their update (delta) type and the merge rules applied
/// when the runtime commits one. Updates must be cheap to clone: they are
/// both applied to the state and fanned out on the `updates` stream channel.
pub trait GraphState: Clone + Send + Sync + Serialize + 'static {
    /// The sanitized set of field updates a node returns.
    type Update: Clone + Send + Sync + Serialize + std::fmt::Debug + 'static;

    /// Merge an update into the state. Applied exactly once per committed
    /// node execution, in superstep order.
    fn apply(&mut self, update: Self::Update);

    /// Called by the runtime before each node execution with the number of
    /// node executions left in the budget. Monotonically non-increasing.
    fn set_remaining_steps(&mut self, remaining: u32);
}

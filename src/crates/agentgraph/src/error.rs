//! Error types for graph construction and execution.

use thiserror::Error;

/// Result type used throughout the graph runtime.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Error type node actions may return. The runtime wraps it into
/// [`GraphError::Node`], preserving the source so callers can downcast to
/// their own error enums.
pub type NodeError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while building or running a graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The graph structure is malformed (missing node, dangling edge, ...).
    #[error("graph validation failed: {0}")]
    Validation(String),

    /// An edge or route referenced a node that was never registered.
    #[error("unknown node: {0}")]
    UnknownNode(String),

    /// A conditional router returned a branch key with no mapped target.
    #[error("node '{node}' routed to unknown branch '{route}'")]
    UnknownRoute { node: String, route: String },

    /// A node action returned an error.
    #[error("node '{node}' failed: {source}")]
    Node {
        node: String,
        #[source]
        source: NodeError,
    },

    /// An LLM call made by a node failed in a way the adapter could not
    /// recover from.
    #[error("llm failure: {0}")]
    Llm(String),

    /// The step budget was exhausted before the graph reached END.
    #[error("step budget of {limit} node executions exhausted")]
    BudgetExhausted { limit: u32 },

    /// Execution was cancelled cooperatively.
    #[error("graph execution was cancelled")]
    Cancelled,
}

impl GraphError {
    /// Wrap a node action error, tagging it with the node name.
    pub fn node(node: impl Into<String>, source: impl Into<NodeError>) -> Self {
        GraphError::Node {
            node: node.into(),
            source: source.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GraphError::Cancelled)
    }

    pub fn is_budget_exhausted(&self) -> bool {
        matches!(self, GraphError::BudgetExhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_error_preserves_source() {
        let inner = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err = GraphError::node("planner", inner);
        assert!(err.to_string().contains("planner"));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_classification_helpers() {
        assert!(GraphError::Cancelled.is_cancelled());
        assert!(GraphError::BudgetExhausted { limit: 3 }.is_budget_exhausted());
        assert!(!GraphError::Cancelled.is_budget_exhausted());
    }
}

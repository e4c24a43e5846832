//! Error taxonomy for tasks and the SDK surface.
//!
//! Device and UI errors are recovered locally (fed back to the LLM loop as
//! error tool results); the variants here are the ones that reach the task
//! lifecycle or the caller.

use agentgraph::{GraphError, NodeError};
use thiserror::Error;

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors surfaced by tasks and the SDK.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No device found, required tooling missing, or the bridge is
    /// unreachable. Surfaced at `init`; a task cannot start.
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    /// A device operation failed mid-task.
    #[error(transparent)]
    Device(#[from] device::DeviceError),

    /// Provider error, timeout, or invalid structured output after any
    /// configured fallback was exhausted.
    #[error("LLM failure: {0}")]
    Llm(String),

    /// The Planner produced an empty or malformed plan.
    #[error("planning failed: {0}")]
    Planning(String),

    /// The step budget ran out before the goal settled.
    #[error("step budget of {limit} node executions exhausted")]
    BudgetExhausted { limit: u32 },

    /// The requested LLM profile does not exist. Caller-visible before the
    /// graph starts.
    #[error("agent profile not found: {0}")]
    ProfileNotFound(String),

    /// The task was cancelled by the user or a replacing task.
    #[error("task was cancelled")]
    Cancelled,

    /// `launch_app` could not resolve an app name to a package id.
    #[error("no installed package matches app '{0}'")]
    PackageNotFound(String),

    /// SDK methods were called before `init`.
    #[error("agent is not initialized")]
    NotInitialized,

    /// The task request itself is unusable.
    #[error("invalid task request: {0}")]
    TaskRequest(String),

    /// Graph-level failure that maps to no more specific kind.
    #[error("graph execution failed: {0}")]
    Execution(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentError {
    /// Box into the error type node actions hand back to the runtime.
    pub fn boxed(self) -> NodeError {
        Box::new(self)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AgentError::Cancelled)
    }
}

impl From<GraphError> for AgentError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::BudgetExhausted { limit } => AgentError::BudgetExhausted { limit },
            GraphError::Cancelled => AgentError::Cancelled,
            GraphError::Llm(message) => AgentError::Llm(message),
            GraphError::Node { node, source } => match source.downcast::<AgentError>() {
                Ok(inner) => *inner,
                Err(source) => AgentError::Execution(format!("node '{node}' failed: {source}")),
            },
            other => AgentError::Execution(other.to_string()),
        }
    }
}

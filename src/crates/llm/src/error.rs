//! Error types for LLM provider implementations.

use agentgraph::GraphError;
use thiserror::Error;

/// Result type for LLM operations.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur when working with LLM providers.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API authentication failed.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// API key not found in environment.
    #[error("API key not found: {0}")]
    ApiKeyNotFound(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Invalid or empty response from the provider.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// General provider error (non-2xx with a body).
    #[error("provider error: {0}")]
    Provider(String),

    /// Configuration error (bad profile file, missing agent entry, ...).
    #[error("configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// Whether retrying (or falling back) makes sense for this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::Http(_) | LlmError::RateLimitExceeded(_) | LlmError::InvalidResponse(_)
        )
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::InvalidResponse(err.to_string())
    }
}

impl From<LlmError> for GraphError {
    fn from(err: LlmError) -> Self {
        GraphError::Llm(err.to_string())
    }
}

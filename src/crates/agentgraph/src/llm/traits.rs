//! The [`ChatModel`] trait implemented by provider crates.

use crate::error::Result;
use crate::llm::request::ChatRequest;
use crate::messages::Message;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Token accounting reported by a provider.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct UsageMetadata {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl UsageMetadata {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }
}

/// A complete chat response.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// The assistant message, possibly carrying tool calls.
    pub message: Message,
    pub usage: Option<UsageMetadata>,
    /// Provider-specific extras (model id, stop reason, ...).
    pub metadata: HashMap<String, Value>,
}

/// Core trait for chat-based language models.
///
/// Implementations convert messages to the provider's format, make the API
/// call, and convert the response back. They must be `Send + Sync`; nodes
/// share them as `Arc<dyn ChatModel>`.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a complete chat response.
    ///
    /// Errors should surface as [`GraphError::Llm`](crate::GraphError::Llm)
    /// so the orchestration layer can apply its fallback policy uniformly.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Whether the provider is reachable. Defaults to `true`.
    async fn is_available(&self) -> Result<bool> {
        Ok(true)
    }
}

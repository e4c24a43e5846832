//! LLM provider implementations for mobius.
//!
//! This crate provides concrete implementations of the `ChatModel` trait
//! from `agentgraph` plus the model-resolution layer the agents use:
//!
//! - **OpenAI-compatible** providers (OpenAI, OpenRouter, xAI, Groq) through
//!   a single chat-completions client
//! - **Google Gemini** through the `generateContent` API
//! - per-agent model profiles with an optional fallback model
//! - structured-output invocation, the non-fatal "waiting for LLM"
//!   notification timeout, and retry-once-with-fallback
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::{AgentNode, LlmProfile, ModelFactory, ProfileModelFactory};
//!
//! let factory = ProfileModelFactory::new(LlmProfile::default());
//! let cortex = factory.model_for(AgentNode::Cortex)?;
//! let response = cortex.chat(request).await?;
//! ```

pub mod config;
pub mod error;
pub mod gemini;
pub mod openai;
pub mod service;

pub use config::{AgentNode, ClientConfig, LlmProfile, LlmSpec, Provider};
pub use error::{LlmError, Result};
pub use gemini::GeminiClient;
pub use openai::OpenAiCompatClient;
pub use service::{
    invoke_structured, invoke_with_timeout_notice, with_fallback, ModelFactory,
    ProfileModelFactory, LLM_NOTICE_TIMEOUT,
};

// Re-export the trait family for convenience.
pub use agentgraph::llm::{ChatModel, ChatRequest, ChatResponse, ResponseSchema, ToolDefinition};

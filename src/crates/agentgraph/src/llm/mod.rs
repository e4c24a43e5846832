//! Provider-agnostic LLM integration surface.
//!
//! agentgraph is an orchestration runtime, not an LLM client library: this
//! module defines the [`ChatModel`] trait and its request/response types,
//! and provider crates implement them. Nodes hold an `Arc<dyn ChatModel>`
//! and stay oblivious to which provider is behind it.

mod request;
mod tools;
mod traits;

pub use request::{ChatConfig, ChatRequest, ResponseSchema};
pub use tools::ToolDefinition;
pub use traits::{ChatModel, ChatResponse, UsageMetadata};

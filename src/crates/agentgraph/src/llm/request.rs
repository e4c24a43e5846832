//! Chat request and configuration types.

use crate::llm::tools::ToolDefinition;
use crate::messages::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named JSON schema the model's reply must conform to.
///
/// Providers translate this into their structured-output mechanism
/// (`response_format` for OpenAI-compatible APIs, `responseSchema` for
/// Gemini). The reply body is then a single JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSchema {
    pub name: String,
    pub schema: Value,
}

impl ResponseSchema {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// Generation parameters shared by all providers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatConfig {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    #[serde(default)]
    pub stop_sequences: Vec<String>,
}

/// A chat completion request: messages plus configuration, bound tools, and
/// an optional structured-output schema.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub config: ChatConfig,
    pub tools: Vec<ToolDefinition>,
    /// Whether the provider may emit several tool calls in one reply.
    /// `None` leaves the provider default in place.
    pub parallel_tool_calls: Option<bool>,
    pub response_schema: Option<ResponseSchema>,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            config: ChatConfig::default(),
            tools: Vec::new(),
            parallel_tool_calls: None,
            response_schema: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_parallel_tool_calls(mut self, enabled: bool) -> Self {
        self.parallel_tool_calls = Some(enabled);
        self
    }

    pub fn with_response_schema(mut self, schema: ResponseSchema) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_chain() {
        let request = ChatRequest::new(vec![Message::human("hi")])
            .with_temperature(0.2)
            .with_parallel_tool_calls(true)
            .with_response_schema(ResponseSchema::new("plan", json!({"type": "object"})));

        assert_eq!(request.config.temperature, Some(0.2));
        assert_eq!(request.parallel_tool_calls, Some(true));
        assert_eq!(request.response_schema.unwrap().name, "plan");
    }
}

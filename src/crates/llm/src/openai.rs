//! OpenAI-compatible chat-completions client.
//!
//! Covers every provider speaking the chat-completions dialect (OpenAI,
//! OpenRouter, xAI, Groq); only base URL, key, and model differ.

use crate::config::ClientConfig;
use crate::error::LlmError;
use agentgraph::error::Result as GraphResult;
use agentgraph::llm::{ChatModel, ChatRequest, ChatResponse, UsageMetadata};
use agentgraph::{ContentPart, Message, MessageContent, MessageRole, ToolCall};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Client for OpenAI-compatible chat-completions APIs.
#[derive(Clone)]
pub struct OpenAiCompatClient {
    config: ClientConfig,
    client: Client,
}

impl OpenAiCompatClient {
    pub fn new(config: ClientConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn convert_message(&self, msg: &Message) -> WireMessage {
        let role = match msg.role {
            MessageRole::System => "system",
            MessageRole::Human => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        };

        let content = match &msg.content {
            MessageContent::Text(text) => Some(json!(text)),
            MessageContent::Parts(parts) => {
                let parts: Vec<Value> = parts
                    .iter()
                    .map(|part| match part {
                        ContentPart::Text { text } => json!({"type": "text", "text": text}),
                        ContentPart::Image { media_type, data } => json!({
                            "type": "image_url",
                            "image_url": {"url": format!("data:{media_type};base64,{data}")}
                        }),
                    })
                    .collect();
                Some(json!(parts))
            }
        };

        let tool_calls = msg.tool_calls.as_ref().map(|calls| {
            calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.id.clone(),
                    kind: "function".to_string(),
                    function: WireFunctionCall {
                        name: call.name.clone(),
                        arguments: call.args.to_string(),
                    },
                })
                .collect()
        });

        WireMessage {
            role: role.to_string(),
            content,
            tool_calls,
            tool_call_id: msg.tool_call_id.clone(),
        }
    }

    fn convert_response(&self, resp: WireResponse) -> Result<ChatResponse, LlmError> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("response carried no choices".into()))?;

        let text = match choice.message.content {
            Some(Value::String(text)) => text,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| {
                let args: Value = serde_json::from_str(&call.function.arguments)
                    .unwrap_or(Value::String(call.function.arguments));
                ToolCall::new(call.id, call.function.name, args)
            })
            .collect::<Vec<_>>();

        let mut message = Message::assistant(text).with_id(resp.id);
        if !tool_calls.is_empty() {
            message = message.with_tool_calls(tool_calls);
        }

        let usage = resp
            .usage
            .map(|u| UsageMetadata::new(u.prompt_tokens, u.completion_tokens));

        let mut metadata = HashMap::new();
        metadata.insert("model".to_string(), json!(resp.model));
        if let Some(reason) = choice.finish_reason {
            metadata.insert("finish_reason".to_string(), json!(reason));
        }

        Ok(ChatResponse {
            message,
            usage,
            metadata,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatClient {
    async fn chat(&self, request: ChatRequest) -> GraphResult<ChatResponse> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let messages: Vec<WireMessage> = request
            .messages
            .iter()
            .map(|m| self.convert_message(m))
            .collect();

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(
                request
                    .tools
                    .iter()
                    .map(|tool| {
                        json!({
                            "type": "function",
                            "function": {
                                "name": tool.name,
                                "description": tool.description,
                                "parameters": tool.parameters,
                            }
                        })
                    })
                    .collect::<Vec<_>>(),
            )
        };

        let response_format = request.response_schema.as_ref().map(|schema| {
            json!({
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "schema": schema.schema,
                    "strict": false,
                }
            })
        });

        let body = WireRequest {
            model: self.config.model.clone(),
            messages,
            temperature: request.config.temperature,
            max_tokens: request.config.max_tokens,
            top_p: request.config.top_p,
            stop: if request.config.stop_sequences.is_empty() {
                None
            } else {
                Some(request.config.stop_sequences.clone())
            },
            tools,
            parallel_tool_calls: request.parallel_tool_calls,
            response_format,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(LlmError::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            let err = match status.as_u16() {
                401 => LlmError::Authentication(error_text),
                429 => LlmError::RateLimitExceeded(error_text),
                _ => LlmError::Provider(format!("API error {status}: {error_text}")),
            };
            return Err(err.into());
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(self.convert_response(wire)?)
    }
}

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parallel_tool_calls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    id: String,
    model: String,
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LlmSpec, Provider};
    use std::time::Duration;

    fn test_client() -> OpenAiCompatClient {
        let config = ClientConfig {
            api_key: "test-key".into(),
            base_url: Provider::OpenAi.default_base_url().into(),
            model: "gpt-4.1".into(),
            timeout: Duration::from_secs(5),
        };
        OpenAiCompatClient::new(config).unwrap()
    }

    #[test]
    fn test_message_conversion_roles() {
        let client = test_client();
        assert_eq!(client.convert_message(&Message::human("hi")).role, "user");
        assert_eq!(
            client.convert_message(&Message::system("rules")).role,
            "system"
        );
        let tool_msg = Message::tool("done", "call_1", agentgraph::ToolStatus::Success);
        let wire = client.convert_message(&tool_msg);
        assert_eq!(wire.role, "tool");
        assert_eq!(wire.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_tool_call_arguments_parsed_from_string() {
        let client = test_client();
        let wire = WireResponse {
            id: "resp_1".into(),
            model: "gpt-4.1".into(),
            choices: vec![WireChoice {
                message: WireMessage {
                    role: "assistant".into(),
                    content: None,
                    tool_calls: Some(vec![WireToolCall {
                        id: "call_1".into(),
                        kind: "function".into(),
                        function: WireFunctionCall {
                            name: "tap".into(),
                            arguments: r#"{"agent_thought":"tap it"}"#.into(),
                        },
                    }]),
                    tool_call_id: None,
                },
                finish_reason: Some("tool_calls".into()),
            }],
            usage: None,
        };

        let response = client.convert_response(wire).unwrap();
        let calls = response.message.get_tool_calls().unwrap();
        assert_eq!(calls[0].name, "tap");
        assert_eq!(calls[0].args["agent_thought"], "tap it");
    }

    #[test]
    fn test_spec_resolution_requires_api_key() {
        let spec = LlmSpec::new(Provider::Xai, "grok-4");
        std::env::remove_var("XAI_API_KEY");
        assert!(ClientConfig::from_spec(&spec, Duration::from_secs(1)).is_err());
    }
}

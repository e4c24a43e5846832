//! Google Gemini client (generateContent API).

use crate::config::ClientConfig;
use crate::error::LlmError;
use agentgraph::error::Result as GraphResult;
use agentgraph::llm::{ChatModel, ChatRequest, ChatResponse, UsageMetadata};
use agentgraph::{ContentPart, Message, MessageContent, MessageRole, ToolCall};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Client for Google's Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    config: ClientConfig,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: ClientConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    /// Split messages into a system instruction and the conversation turns.
    /// Gemini wants system text separate, roles limited to user/model, and
    /// tool results delivered as `functionResponse` parts.
    fn convert_messages(&self, messages: &[Message]) -> (Option<Value>, Vec<Value>) {
        let mut system_text: Option<String> = None;
        let mut contents = Vec::new();

        for msg in messages {
            match msg.role {
                MessageRole::System => {
                    let text = msg.text().unwrap_or_default();
                    system_text = Some(match system_text.take() {
                        Some(existing) => format!("{existing}\n\n{text}"),
                        None => text.to_string(),
                    });
                }
                MessageRole::Human => {
                    contents.push(json!({"role": "user", "parts": content_parts(&msg.content)}));
                }
                MessageRole::Assistant => {
                    let mut parts = content_parts(&msg.content);
                    if let Some(calls) = msg.get_tool_calls() {
                        for call in calls {
                            parts.push(json!({
                                "functionCall": {"name": call.name, "args": call.args}
                            }));
                        }
                    }
                    contents.push(json!({"role": "model", "parts": parts}));
                }
                MessageRole::Tool => {
                    contents.push(json!({
                        "role": "user",
                        "parts": [{
                            "functionResponse": {
                                "name": msg.name.clone().unwrap_or_else(|| "tool".to_string()),
                                "response": {"content": msg.text().unwrap_or_default()},
                            }
                        }]
                    }));
                }
            }
        }

        let system = system_text.map(|text| json!({"parts": [{"text": text}]}));
        (system, contents)
    }

    fn convert_response(&self, resp: Value) -> Result<ChatResponse, LlmError> {
        let candidate = resp["candidates"]
            .get(0)
            .ok_or_else(|| LlmError::InvalidResponse("response carried no candidates".into()))?;

        let empty = Vec::new();
        let parts = candidate["content"]["parts"].as_array().unwrap_or(&empty);

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for part in parts {
            if let Some(chunk) = part["text"].as_str() {
                text.push_str(chunk);
            }
            if let Some(call) = part.get("functionCall") {
                let name = call["name"].as_str().unwrap_or_default().to_string();
                let args = call.get("args").cloned().unwrap_or(Value::Null);
                tool_calls.push(ToolCall::new(uuid::Uuid::new_v4().to_string(), name, args));
            }
        }

        let mut message = Message::assistant(text);
        if !tool_calls.is_empty() {
            message = message.with_tool_calls(tool_calls);
        }

        let usage = resp.get("usageMetadata").map(|u| {
            UsageMetadata::new(
                u["promptTokenCount"].as_u64().unwrap_or(0),
                u["candidatesTokenCount"].as_u64().unwrap_or(0),
            )
        });

        let mut metadata = HashMap::new();
        metadata.insert("model".to_string(), json!(self.config.model));
        if let Some(reason) = candidate["finishReason"].as_str() {
            metadata.insert("finish_reason".to_string(), json!(reason));
        }

        Ok(ChatResponse {
            message,
            usage,
            metadata,
        })
    }
}

fn content_parts(content: &MessageContent) -> Vec<Value> {
    match content {
        MessageContent::Text(text) => vec![json!({"text": text})],
        MessageContent::Parts(parts) => parts
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => json!({"text": text}),
                ContentPart::Image { media_type, data } => json!({
                    "inlineData": {"mimeType": media_type, "data": data}
                }),
            })
            .collect(),
    }
}

/// Strip JSON Schema keywords Gemini's `responseSchema`/tool declarations
/// reject (`additionalProperties`, `$schema`).
fn scrub_schema(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, inner) in map {
                if key == "additionalProperties" || key == "$schema" {
                    continue;
                }
                out.insert(key.clone(), scrub_schema(inner));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(scrub_schema).collect()),
        other => other.clone(),
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn chat(&self, request: ChatRequest) -> GraphResult<ChatResponse> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url, self.config.model, self.config.api_key
        );

        let (system_instruction, contents) = self.convert_messages(&request.messages);

        let mut generation_config = Map::new();
        if let Some(temperature) = request.config.temperature {
            generation_config.insert("temperature".into(), json!(temperature));
        }
        if let Some(max_tokens) = request.config.max_tokens {
            generation_config.insert("maxOutputTokens".into(), json!(max_tokens));
        }
        if let Some(schema) = &request.response_schema {
            generation_config.insert("responseMimeType".into(), json!("application/json"));
            generation_config.insert("responseSchema".into(), scrub_schema(&schema.schema));
        }

        let mut body = Map::new();
        body.insert("contents".into(), json!(contents));
        if let Some(system) = system_instruction {
            body.insert("systemInstruction".into(), system);
        }
        if !generation_config.is_empty() {
            body.insert("generationConfig".into(), Value::Object(generation_config));
        }
        if !request.tools.is_empty() {
            let declarations: Vec<Value> = request
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": scrub_schema(&tool.parameters),
                    })
                })
                .collect();
            body.insert(
                "tools".into(),
                json!([{"functionDeclarations": declarations}]),
            );
        }

        let response = self
            .client
            .post(&url)
            .json(&Value::Object(body))
            .send()
            .await
            .map_err(LlmError::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            let err = match status.as_u16() {
                401 | 403 => LlmError::Authentication(error_text),
                429 => LlmError::RateLimitExceeded(error_text),
                _ => LlmError::Provider(format!("API error {status}: {error_text}")),
            };
            return Err(err.into());
        }

        let wire: Value = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(self.convert_response(wire)?)
    }
}

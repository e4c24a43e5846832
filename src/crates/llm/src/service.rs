//! Model resolution and invocation helpers shared by the agents.

use crate::config::{AgentNode, ClientConfig, LlmProfile, Provider};
use crate::error::Result;
use crate::gemini::GeminiClient;
use crate::openai::OpenAiCompatClient;
use agentgraph::error::Result as GraphResult;
use agentgraph::llm::{ChatModel, ChatRequest, ResponseSchema};
use agentgraph::{GraphError, Message};
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Delay before a pending LLM call produces a user-visible waiting notice.
/// The notice is informational; the call itself is never cancelled by it.
pub const LLM_NOTICE_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves chat models per agent node.
///
/// The trait is the seam tests use to substitute scripted models; the
/// production implementation resolves specs from an [`LlmProfile`] against
/// the process environment.
pub trait ModelFactory: Send + Sync {
    fn model_for(&self, node: AgentNode) -> Result<Arc<dyn ChatModel>>;

    /// The fallback model for the node, if its spec declares one.
    fn fallback_for(&self, node: AgentNode) -> Option<Arc<dyn ChatModel>>;

    fn supports_parallel_tool_calls(&self, node: AgentNode) -> bool;

    fn needs_flat_tool_variants(&self, node: AgentNode) -> bool;
}

/// Production [`ModelFactory`] backed by an [`LlmProfile`].
#[derive(Debug, Clone)]
pub struct ProfileModelFactory {
    profile: LlmProfile,
}

impl ProfileModelFactory {
    pub fn new(profile: LlmProfile) -> Self {
        Self { profile }
    }

    fn build(&self, spec: &crate::config::LlmSpec) -> Result<Arc<dyn ChatModel>> {
        let config = ClientConfig::from_spec(spec, self.profile.timeout())?;
        let model: Arc<dyn ChatModel> = match spec.provider {
            Provider::Google => Arc::new(GeminiClient::new(config)?),
            _ => Arc::new(OpenAiCompatClient::new(config)?),
        };
        Ok(model)
    }
}

impl ModelFactory for ProfileModelFactory {
    fn model_for(&self, node: AgentNode) -> Result<Arc<dyn ChatModel>> {
        self.build(self.profile.spec_for(node))
    }

    fn fallback_for(&self, node: AgentNode) -> Option<Arc<dyn ChatModel>> {
        let spec = self.profile.fallback_for(node)?;
        match self.build(spec) {
            Ok(model) => Some(model),
            Err(e) => {
                tracing::warn!(node = node.as_str(), error = %e, "fallback model unavailable");
                None
            }
        }
    }

    fn supports_parallel_tool_calls(&self, node: AgentNode) -> bool {
        self.profile
            .spec_for(node)
            .provider
            .supports_parallel_tool_calls()
    }

    fn needs_flat_tool_variants(&self, node: AgentNode) -> bool {
        self.profile
            .spec_for(node)
            .provider
            .needs_flat_tool_variants()
    }
}

/// Await an LLM call, firing `notify` once if it is still pending after
/// [`LLM_NOTICE_TIMEOUT`]. The call is never aborted here; hard cancellation
/// stays user-initiated at the graph level.
pub async fn invoke_with_timeout_notice<F, T, N, NF>(call: F, notify: N) -> T
where
    F: Future<Output = T>,
    N: FnOnce() -> NF,
    NF: Future<Output = ()>,
{
    tokio::pin!(call);
    tokio::select! {
        result = &mut call => result,
        _ = tokio::time::sleep(LLM_NOTICE_TIMEOUT) => {
            notify().await;
            call.await
        }
    }
}

/// Run the main inference; on failure, log and run the fallback once.
pub async fn with_fallback<T, E, F1, F2, Fut1, Fut2>(main: F1, fallback: F2) -> std::result::Result<T, E>
where
    F1: FnOnce() -> Fut1,
    Fut1: Future<Output = std::result::Result<T, E>>,
    F2: FnOnce() -> Fut2,
    Fut2: Future<Output = std::result::Result<T, E>>,
    E: Display,
{
    match main().await {
        Ok(value) => Ok(value),
        Err(error) => {
            tracing::warn!(%error, "main LLM inference failed, falling back");
            fallback().await
        }
    }
}

/// Invoke a model with a structured-output contract and parse the reply.
///
/// An empty or non-conforming reply is an error ([`GraphError::Llm`]), which
/// callers may treat as a fallback trigger.
pub async fn invoke_structured<T: DeserializeOwned>(
    model: &Arc<dyn ChatModel>,
    messages: Vec<Message>,
    schema: ResponseSchema,
    temperature: f32,
) -> GraphResult<T> {
    let request = ChatRequest::new(messages)
        .with_temperature(temperature)
        .with_response_schema(schema);
    let response = model.chat(request).await?;
    let text = response
        .message
        .text()
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| GraphError::Llm("structured response had no content".to_string()))?;
    serde_json::from_str(text)
        .map_err(|e| GraphError::Llm(format!("structured output did not match schema: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentgraph::llm::ChatResponse;
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CannedModel {
        reply: String,
    }

    #[async_trait]
    impl ChatModel for CannedModel {
        async fn chat(&self, _request: ChatRequest) -> GraphResult<ChatResponse> {
            Ok(ChatResponse {
                message: Message::assistant(self.reply.clone()),
                usage: None,
                metadata: HashMap::new(),
            })
        }
    }

    #[derive(Deserialize)]
    struct Out {
        answer: String,
    }

    #[tokio::test]
    async fn test_invoke_structured_parses_reply() {
        let model: Arc<dyn ChatModel> = Arc::new(CannedModel {
            reply: r#"{"answer": "ok"}"#.to_string(),
        });
        let out: Out = invoke_structured(
            &model,
            vec![Message::human("answer")],
            ResponseSchema::new("out", json!({"type": "object"})),
            0.0,
        )
        .await
        .unwrap();
        assert_eq!(out.answer, "ok");
    }

    #[tokio::test]
    async fn test_invoke_structured_rejects_empty_reply() {
        let model: Arc<dyn ChatModel> = Arc::new(CannedModel {
            reply: "   ".to_string(),
        });
        let result: GraphResult<Out> = invoke_structured(
            &model,
            vec![Message::human("answer")],
            ResponseSchema::new("out", json!({"type": "object"})),
            0.0,
        )
        .await;
        assert!(matches!(result, Err(GraphError::Llm(_))));
    }

    #[tokio::test]
    async fn test_with_fallback_used_only_on_error() {
        let calls = AtomicUsize::new(0);
        let result: std::result::Result<i32, GraphError> = with_fallback(
            || async { Ok(1) },
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(2)
            },
        )
        .await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let result: std::result::Result<i32, GraphError> = with_fallback(
            || async { Err(GraphError::Llm("nope".into())) },
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(2)
            },
        )
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_notice_fires_once_for_slow_calls() {
        let notices = AtomicUsize::new(0);
        let result = invoke_with_timeout_notice(
            async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                42
            },
            || async {
                notices.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await;
        assert_eq!(result, 42);
        assert_eq!(notices.load(Ordering::SeqCst), 1);
    }
}

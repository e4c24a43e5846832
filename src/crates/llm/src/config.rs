//! Provider and per-agent model configuration.
//!
//! Each agent node in the graph is assigned its own model spec, so a
//! profile can run a heavyweight model for the Cortex and a cheap one for
//! utility agents. The Cortex may additionally carry a fallback spec used
//! when the primary inference fails or comes back empty.

use crate::error::{LlmError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Supported LLM providers. All but Gemini speak the OpenAI-compatible
/// chat-completions API and differ only in base URL and key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    OpenRouter,
    Xai,
    Groq,
    Google,
}

impl Provider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::OpenRouter => "https://openrouter.ai/api/v1",
            Provider::Xai => "https://api.x.ai/v1",
            Provider::Groq => "https://api.groq.com/openai/v1",
            Provider::Google => "https://generativelanguage.googleapis.com/v1beta",
        }
    }

    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::OpenRouter => "OPENROUTER_API_KEY",
            Provider::Xai => "XAI_API_KEY",
            Provider::Groq => "GROQ_API_KEY",
            Provider::Google => "GOOGLE_API_KEY",
        }
    }

    /// Whether the provider honors an explicit `parallel_tool_calls` flag.
    pub fn supports_parallel_tool_calls(&self) -> bool {
        !matches!(self, Provider::Google)
    }

    /// Whether tools whose argument shape contains nested variant unions
    /// must be split into flattened per-variant tools for this provider.
    pub fn needs_flat_tool_variants(&self) -> bool {
        matches!(self, Provider::Google)
    }
}

/// One model assignment: which provider, which model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSpec {
    pub provider: Provider,
    pub model: String,
}

impl LlmSpec {
    pub fn new(provider: Provider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

/// The agent nodes that make LLM calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentNode {
    Planner,
    Orchestrator,
    Cortex,
    Executor,
    Hopper,
    Outputter,
}

impl AgentNode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentNode::Planner => "planner",
            AgentNode::Orchestrator => "orchestrator",
            AgentNode::Cortex => "cortex",
            AgentNode::Executor => "executor",
            AgentNode::Hopper => "hopper",
            AgentNode::Outputter => "outputter",
        }
    }
}

/// Per-agent model profile, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmProfile {
    /// Request timeout applied to every provider client.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    pub planner: LlmSpec,
    pub orchestrator: LlmSpec,
    pub cortex: LlmSpec,
    /// Tried when the primary cortex inference fails or returns nothing.
    #[serde(default)]
    pub cortex_fallback: Option<LlmSpec>,
    pub executor: LlmSpec,
    pub hopper: LlmSpec,
    pub outputter: LlmSpec,
}

fn default_timeout_secs() -> u64 {
    120
}

impl LlmProfile {
    pub fn spec_for(&self, node: AgentNode) -> &LlmSpec {
        match node {
            AgentNode::Planner => &self.planner,
            AgentNode::Orchestrator => &self.orchestrator,
            AgentNode::Cortex => &self.cortex,
            AgentNode::Executor => &self.executor,
            AgentNode::Hopper => &self.hopper,
            AgentNode::Outputter => &self.outputter,
        }
    }

    pub fn fallback_for(&self, node: AgentNode) -> Option<&LlmSpec> {
        match node {
            AgentNode::Cortex => self.cortex_fallback.as_ref(),
            _ => None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| LlmError::Config(format!("invalid profile TOML: {e}")))
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| LlmError::Config(format!("cannot read profile file: {e}")))?;
        Self::from_toml_str(&raw)
    }
}

impl Default for LlmProfile {
    fn default() -> Self {
        Self {
            planner: LlmSpec::new(Provider::OpenAi, "gpt-4.1"),
            orchestrator: LlmSpec::new(Provider::OpenAi, "gpt-4.1"),
            cortex: LlmSpec::new(Provider::OpenAi, "gpt-4.1"),
            cortex_fallback: Some(LlmSpec::new(Provider::Google, "gemini-2.5-pro")),
            executor: LlmSpec::new(Provider::OpenAi, "gpt-4.1-mini"),
            hopper: LlmSpec::new(Provider::OpenAi, "gpt-4.1-mini"),
            outputter: LlmSpec::new(Provider::OpenAi, "gpt-4.1-mini"),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Connection details handed to a provider client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl ClientConfig {
    /// Resolve a spec against the environment: base URL from the provider,
    /// API key from the provider's env var.
    pub fn from_spec(spec: &LlmSpec, timeout: Duration) -> Result<Self> {
        let env_var = spec.provider.api_key_env();
        let api_key = std::env::var(env_var)
            .map_err(|_| LlmError::ApiKeyNotFound(format!("environment variable {env_var}")))?;
        Ok(Self {
            api_key,
            base_url: spec.provider.default_base_url().to_string(),
            model: spec.model.clone(),
            timeout,
        })
    }
}

//! SDK configuration: server endpoints, device pinning, agent profiles.

use device::DevicePlatform;
use llm::LlmProfile;
use std::collections::HashMap;

pub const DEFAULT_HW_BRIDGE_BASE_URL: &str = "http://localhost:9999";
pub const DEFAULT_SCREEN_API_BASE_URL: &str = "http://localhost:9998";

/// Endpoints of the external device services.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub hw_bridge_base_url: String,
    pub screen_api_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hw_bridge_base_url: DEFAULT_HW_BRIDGE_BASE_URL.to_string(),
            screen_api_base_url: DEFAULT_SCREEN_API_BASE_URL.to_string(),
        }
    }
}

/// A named model assignment set.
#[derive(Debug, Clone, Default)]
pub struct AgentProfile {
    pub llm: LlmProfile,
}

/// Top-level SDK configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub servers: ServerConfig,
    /// Pin a specific device instead of taking the first available one.
    pub device_id: Option<String>,
    pub device_platform: Option<DevicePlatform>,
    pub default_profile: AgentProfile,
    pub profiles: HashMap<String, AgentProfile>,
    /// Step budget applied to requests that do not set their own.
    pub default_max_steps: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            servers: ServerConfig::default(),
            device_id: None,
            device_platform: None,
            default_profile: AgentProfile::default(),
            profiles: HashMap::new(),
            default_max_steps: crate::task::DEFAULT_MAX_STEPS,
        }
    }
}

impl AgentConfig {
    pub fn with_servers(mut self, servers: ServerConfig) -> Self {
        self.servers = servers;
        self
    }

    pub fn with_device(mut self, device_id: impl Into<String>, platform: DevicePlatform) -> Self {
        self.device_id = Some(device_id.into());
        self.device_platform = Some(platform);
        self
    }

    pub fn with_default_profile(mut self, profile: AgentProfile) -> Self {
        self.default_profile = profile;
        self
    }

    pub fn with_profile(mut self, name: impl Into<String>, profile: AgentProfile) -> Self {
        self.profiles.insert(name.into(), profile);
        self
    }

    /// Look up a profile by name; `None` asks for the default.
    pub fn resolve_profile(&self, name: Option<&str>) -> Option<&AgentProfile> {
        match name {
            Some(name) => self.profiles.get(name),
            None => Some(&self.default_profile),
        }
    }
}

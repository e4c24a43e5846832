//! HTTP client for the device-hardware bridge.

use crate::error::{DeviceError, Result};
use crate::flow::FlowStep;
use base64::Engine;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Client for the device-hardware bridge: runs one-step YAML flows and
/// exposes the screen SSE endpoint.
#[derive(Debug, Clone)]
pub struct DeviceHardwareClient {
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct RunCommandRequest {
    yaml: String,
    #[serde(rename = "dryRun")]
    dry_run: bool,
}

impl DeviceHardwareClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(DeviceError::Http)?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a bridge-relative path (screenshot paths from SSE
    /// events arrive relative).
    pub fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    pub fn sse_url(&self) -> String {
        format!("{}/device-screen/sse", self.base_url)
    }

    /// Run a flow, one POSTed YAML document per step. Returns on the first
    /// failing step with the bridge's failure payload.
    pub async fn run_flow(&self, steps: &[FlowStep], dry_run: bool) -> Result<()> {
        for step in steps {
            let yaml = serde_yaml::to_string(&step.to_step_value())?;
            tracing::debug!(step = %yaml.trim(), "running flow step");
            let response = self
                .client
                .post(format!("{}/run-command", self.base_url))
                .json(&RunCommandRequest { yaml, dry_run })
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                tracing::error!(status = status.as_u16(), "flow step failed");
                return Err(DeviceError::Bridge {
                    status: status.as_u16(),
                    body,
                });
            }
        }
        Ok(())
    }

    /// Liveness probe.
    pub async fn banner_message(&self) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/banner-message", self.base_url))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeviceError::Bridge {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response.text().await.unwrap_or_default())
    }

    /// Fetch a screenshot by its bridge path and inline it as base64.
    pub async fn fetch_screenshot_base64(&self, path: &str) -> Result<String> {
        let response = self.client.get(self.absolute_url(path)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeviceError::Bridge {
                status: status.as_u16(),
                body: format!("screenshot fetch failed for {path}"),
            });
        }
        let bytes = response.bytes().await?;
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }
}

//! Screen observation: SSE stream consumer, latest-frame cell, and the
//! Screen API client.
//!
//! The bridge streams server-sent events describing the current screen. A
//! single background consumer keeps the newest frame in a mutex-guarded
//! cell with a staleness timestamp; [`ScreenStream::screen_data`] blocks
//! until a frame timestamped at or after the call start arrives, bounded by
//! a one-second cap, before settling for the cached frame (or failing if
//! none ever arrived).

use crate::bridge::DeviceHardwareClient;
use crate::error::{DeviceError, Result};
use crate::hierarchy::UiElement;
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Everything observable about the current screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenData {
    pub base64: String,
    pub elements: Vec<UiElement>,
    pub width: u32,
    pub height: u32,
    pub platform: String,
}

/// Source of screen observations. The trait is the seam that lets agents
/// run against a live Screen API, the in-process stream, or a test double.
#[async_trait]
pub trait ScreenSource: Send + Sync {
    async fn screen_data(&self) -> Result<ScreenData>;
}

/// How long `screen_data` waits for a frame fresher than the call start.
const FRESH_FRAME_WAIT: Duration = Duration::from_secs(1);
const FRESH_FRAME_POLL: Duration = Duration::from_millis(50);

struct LatestFrame {
    data: ScreenData,
    at: Instant,
}

/// Background consumer of the bridge's screen SSE stream.
pub struct ScreenStream {
    latest: Arc<Mutex<Option<LatestFrame>>>,
    connected: Arc<AtomicBool>,
    handle: tokio::task::JoinHandle<()>,
}

impl ScreenStream {
    /// Spawn the consumer task. It reconnects with a short pause whenever
    /// the stream drops.
    pub fn spawn(bridge: DeviceHardwareClient) -> Self {
        let latest = Arc::new(Mutex::new(None));
        let connected = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn(consume_stream(
            bridge,
            Arc::clone(&latest),
            Arc::clone(&connected),
        ));
        Self {
            latest,
            connected,
            handle,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn has_frame(&self) -> bool {
        self.latest.lock().is_some()
    }

    /// Store a frame directly. Exists for tests and for embedding the cell
    /// without a live SSE connection.
    pub fn push_frame(&self, data: ScreenData) {
        *self.latest.lock() = Some(LatestFrame {
            data,
            at: Instant::now(),
        });
    }

    /// The latest frame, preferring one produced after this call started.
    /// Blocks at most one second; returns the cached frame if only a stale
    /// one exists, and a 503-equivalent error if no frame ever arrived.
    pub async fn screen_data(&self) -> Result<ScreenData> {
        let started = Instant::now();
        loop {
            {
                let guard = self.latest.lock();
                if let Some(frame) = guard.as_ref() {
                    if frame.at >= started || started.elapsed() >= FRESH_FRAME_WAIT {
                        return Ok(frame.data.clone());
                    }
                } else if started.elapsed() >= FRESH_FRAME_WAIT {
                    return Err(DeviceError::ScreenUnavailable(
                        "the live screen stream has not produced a frame".into(),
                    ));
                }
            }
            tokio::time::sleep(FRESH_FRAME_POLL).await;
        }
    }
}

impl Drop for ScreenStream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[async_trait]
impl ScreenSource for ScreenStream {
    async fn screen_data(&self) -> Result<ScreenData> {
        ScreenStream::screen_data(self).await
    }
}

/// Wire shape of one SSE `message` event payload.
#[derive(Debug, Deserialize)]
struct SseFrame {
    screenshot: String,
    elements: Vec<UiElement>,
    width: u32,
    height: u32,
    platform: String,
}

async fn consume_stream(
    bridge: DeviceHardwareClient,
    latest: Arc<Mutex<Option<LatestFrame>>>,
    connected: Arc<AtomicBool>,
) {
    loop {
        match reqwest::get(bridge.sse_url()).await {
            Ok(response) if response.status().is_success() => {
                connected.store(true, Ordering::Relaxed);
                let mut buffer = String::new();
                let mut body = response.bytes_stream();
                while let Some(chunk) = body.next().await {
                    let Ok(chunk) = chunk else { break };
                    buffer.push_str(&String::from_utf8_lossy(&chunk));
                    while let Some(boundary) = buffer.find("\n\n") {
                        let event: String = buffer.drain(..boundary + 2).collect();
                        if let Some(payload) = parse_sse_data(&event) {
                            handle_frame(&bridge, &latest, &payload).await;
                        }
                    }
                }
                connected.store(false, Ordering::Relaxed);
                tracing::warn!("screen SSE stream ended, reconnecting");
            }
            Ok(response) => {
                tracing::warn!(status = %response.status(), "screen SSE endpoint refused connection");
            }
            Err(e) => {
                tracing::debug!(error = %e, "screen SSE connection failed");
            }
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

async fn handle_frame(
    bridge: &DeviceHardwareClient,
    latest: &Arc<Mutex<Option<LatestFrame>>>,
    payload: &str,
) {
    let frame: SseFrame = match serde_json::from_str(payload) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(error = %e, "dropping malformed SSE frame");
            return;
        }
    };
    let base64 = match bridge.fetch_screenshot_base64(&frame.screenshot).await {
        Ok(base64) => base64,
        Err(e) => {
            tracing::debug!(error = %e, "screenshot fetch failed, keeping previous frame");
            return;
        }
    };
    let data = ScreenData {
        base64,
        elements: frame.elements,
        width: frame.width,
        height: frame.height,
        platform: frame.platform,
    };
    *latest.lock() = Some(LatestFrame {
        data,
        at: Instant::now(),
    });
}

/// Join the `data:` lines of one SSE event.
fn parse_sse_data(event: &str) -> Option<String> {
    let mut data_lines = Vec::new();
    for line in event.lines() {
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.trim_start());
        }
    }
    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}

/// Client of the Screen API service, with a short retry-with-backoff for
/// the window where the capture pipeline is still warming up.
#[derive(Debug, Clone)]
pub struct ScreenApiClient {
    base_url: String,
    client: reqwest::Client,
    retry_count: u32,
    retry_wait: Duration,
}

impl ScreenApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(DeviceError::Http)?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            retry_count: 5,
            retry_wait: Duration::from_secs(5),
        })
    }

    pub fn with_retry(mut self, retry_count: u32, retry_wait: Duration) -> Self {
        self.retry_count = retry_count;
        self.retry_wait = retry_wait;
        self
    }

    pub async fn get_with_retry(&self, path: &str) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error: Option<DeviceError> = None;
        for attempt in 0..self.retry_count.max(1) {
            if attempt > 0 {
                tokio::time::sleep(self.retry_wait).await;
            }
            match self.client.get(&url).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    tracing::debug!(attempt, status = %response.status(), url = %url, "screen API retry");
                    last_error = Some(DeviceError::ScreenUnavailable(format!(
                        "{} returned {}",
                        url,
                        response.status()
                    )));
                }
                Err(e) => {
                    tracing::debug!(attempt, error = %e, url = %url, "screen API retry");
                    last_error = Some(DeviceError::Http(e));
                }
            }
        }
        Err(last_error
            .unwrap_or_else(|| DeviceError::ScreenUnavailable("no attempt was made".into())))
    }

    pub async fn health(&self) -> Result<()> {
        self.get_with_retry("/health").await.map(|_| ())
    }
}

#[async_trait]
impl ScreenSource for ScreenApiClient {
    async fn screen_data(&self) -> Result<ScreenData> {
        let response = self.get_with_retry("/screen-info").await?;
        Ok(response.json().await?)
    }
}

//! Test doubles for unit tests: a recording device backend, static
//! observation sources, and a model factory that refuses to be called.

use crate::context::{DeviceContext, MobiusContext};
use agentgraph::llm::ChatModel;
use async_trait::async_trait;
use device::{
    DeviceBackend, DeviceController, DeviceError, DevicePlatform, DeviceProbe, Key,
    ScreenData, ScreenSource, Selector, SwipeRequest,
};
use llm::{AgentNode, LlmError, ModelFactory};
use serde_json::Value;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Recorded {
    taps: Vec<(i32, i32)>,
    long_presses: Vec<(i32, i32, u32)>,
    swipes: Vec<SwipeRequest>,
    typed: Vec<String>,
    erased: Vec<u32>,
    launched: Vec<String>,
    stopped: Vec<Option<String>>,
    links: Vec<String>,
    keys: Vec<Key>,
    backs: usize,
}

/// Device backend that records every operation; optionally fails them all.
#[derive(Clone)]
pub(crate) struct RecordingBackend {
    fail: bool,
    recorded: Arc<Mutex<Recorded>>,
}

impl RecordingBackend {
    pub(crate) fn ok() -> Self {
        Self {
            fail: false,
            recorded: Arc::new(Mutex::new(Recorded::default())),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            recorded: Arc::new(Mutex::new(Recorded::default())),
        }
    }

    fn outcome(&self, op: &str) -> Result<(), DeviceError> {
        if self.fail {
            Err(DeviceError::Command {
                command: op.to_string(),
                message: "simulated failure".to_string(),
            })
        } else {
            Ok(())
        }
    }

    pub(crate) fn taps(&self) -> Vec<(i32, i32)> {
        self.recorded.lock().unwrap().taps.clone()
    }

    pub(crate) fn long_presses(&self) -> Vec<(i32, i32, u32)> {
        self.recorded.lock().unwrap().long_presses.clone()
    }

    pub(crate) fn swipes(&self) -> Vec<SwipeRequest> {
        self.recorded.lock().unwrap().swipes.clone()
    }

    pub(crate) fn typed(&self) -> Vec<String> {
        self.recorded.lock().unwrap().typed.clone()
    }

    pub(crate) fn links(&self) -> Vec<String> {
        self.recorded.lock().unwrap().links.clone()
    }

    pub(crate) fn launched(&self) -> Vec<String> {
        self.recorded.lock().unwrap().launched.clone()
    }
}

fn selector_point(selector: &Selector) -> (i32, i32) {
    match selector {
        Selector::ByCoords { point } => (point.x, point.y),
        _ => (-1, -1),
    }
}

#[async_trait]
impl DeviceBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn tap(&self, selector: &Selector, _index: Option<usize>) -> Result<(), DeviceError> {
        if !self.fail {
            self.recorded.lock().unwrap().taps.push(selector_point(selector));
        }
        self.outcome("tap")
    }

    async fn long_press(
        &self,
        selector: &Selector,
        _index: Option<usize>,
        duration_ms: u32,
    ) -> Result<(), DeviceError> {
        if !self.fail {
            let (x, y) = selector_point(selector);
            self.recorded
                .lock()
                .unwrap()
                .long_presses
                .push((x, y, duration_ms));
        }
        self.outcome("long_press")
    }

    async fn swipe(&self, request: &SwipeRequest) -> Result<(), DeviceError> {
        if !self.fail {
            self.recorded.lock().unwrap().swipes.push(request.clone());
        }
        self.outcome("swipe")
    }

    async fn input_text(&self, text: &str) -> Result<(), DeviceError> {
        if !self.fail {
            self.recorded.lock().unwrap().typed.push(text.to_string());
        }
        self.outcome("input_text")
    }

    async fn erase_text(&self, chars: u32) -> Result<(), DeviceError> {
        if !self.fail {
            self.recorded.lock().unwrap().erased.push(chars);
        }
        self.outcome("erase_text")
    }

    async fn launch_app(&self, package: &str) -> Result<(), DeviceError> {
        if !self.fail {
            self.recorded.lock().unwrap().launched.push(package.to_string());
        }
        self.outcome("launch_app")
    }

    async fn stop_app(&self, package: Option<&str>) -> Result<(), DeviceError> {
        if !self.fail {
            self.recorded
                .lock()
                .unwrap()
                .stopped
                .push(package.map(str::to_string));
        }
        self.outcome("stop_app")
    }

    async fn open_link(&self, url: &str) -> Result<(), DeviceError> {
        if !self.fail {
            self.recorded.lock().unwrap().links.push(url.to_string());
        }
        self.outcome("open_link")
    }

    async fn back(&self) -> Result<(), DeviceError> {
        if !self.fail {
            self.recorded.lock().unwrap().backs += 1;
        }
        self.outcome("back")
    }

    async fn press_key(&self, key: Key) -> Result<(), DeviceError> {
        if !self.fail {
            self.recorded.lock().unwrap().keys.push(key);
        }
        self.outcome("press_key")
    }

    async fn wait_for_animation_to_end(&self, _timeout_ms: Option<u32>) -> Result<(), DeviceError> {
        self.outcome("wait_for_animation_to_end")
    }
}

/// Screen source serving one fixed observation.
pub(crate) struct StaticScreen {
    data: ScreenData,
}

impl StaticScreen {
    pub(crate) fn empty() -> Self {
        Self::with_elements(serde_json::json!([]))
    }

    pub(crate) fn with_elements(elements: Value) -> Self {
        Self {
            data: ScreenData {
                base64: "c2NyZWVu".to_string(),
                elements: serde_json::from_value(elements).expect("valid test elements"),
                width: 1080,
                height: 1920,
                platform: "android".to_string(),
            },
        }
    }
}

#[async_trait]
impl ScreenSource for StaticScreen {
    async fn screen_data(&self) -> Result<ScreenData, DeviceError> {
        Ok(self.data.clone())
    }
}

/// Probe with canned observations.
pub(crate) struct StaticProbe;

#[async_trait]
impl DeviceProbe for StaticProbe {
    async fn focused_app(&self) -> Result<Option<String>, DeviceError> {
        Ok(Some("com.android.launcher".to_string()))
    }

    async fn device_date(&self) -> Result<String, DeviceError> {
        Ok("Sat Aug  1 10:00:00 CET 2026".to_string())
    }

    async fn list_packages(&self) -> Result<String, DeviceError> {
        Ok("com.android.settings\ncom.whatsapp".to_string())
    }
}

/// Model factory for tests that must never reach an LLM.
pub(crate) struct NullModelFactory;

impl ModelFactory for NullModelFactory {
    fn model_for(&self, node: AgentNode) -> Result<Arc<dyn ChatModel>, LlmError> {
        Err(LlmError::Config(format!(
            "test context has no model for {}",
            node.as_str()
        )))
    }

    fn fallback_for(&self, _node: AgentNode) -> Option<Arc<dyn ChatModel>> {
        None
    }

    fn supports_parallel_tool_calls(&self, _node: AgentNode) -> bool {
        true
    }

    fn needs_flat_tool_variants(&self, _node: AgentNode) -> bool {
        false
    }
}

pub(crate) fn test_context(backend: RecordingBackend) -> MobiusContext {
    test_context_with_screen(backend, StaticScreen::empty())
}

pub(crate) fn test_context_with_screen(
    backend: RecordingBackend,
    screen: StaticScreen,
) -> MobiusContext {
    MobiusContext {
        device: DeviceContext {
            platform: DevicePlatform::Android,
            device_id: "emulator-5554".to_string(),
            device_width: 1080,
            device_height: 1920,
        },
        controller: DeviceController::new(Arc::new(backend), None),
        screen: Arc::new(screen),
        probe: Arc::new(StaticProbe),
        models: Arc::new(NullModelFactory),
        execution: None,
        locked_app_package: None,
    }
}

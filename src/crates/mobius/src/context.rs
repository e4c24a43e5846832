//! Task-scoped context shared by agents and tools.

use device::{DeviceController, DevicePlatform, DeviceProbe, ScreenSource};
use llm::ModelFactory;
use std::path::PathBuf;
use std::sync::Arc;

/// Static facts about the target device, captured at init.
#[derive(Debug, Clone)]
pub struct DeviceContext {
    pub platform: DevicePlatform,
    pub device_id: String,
    pub device_width: u32,
    pub device_height: u32,
}

/// Where trace artifacts for the current task land.
#[derive(Debug, Clone)]
pub struct ExecutionSetup {
    pub traces_dir: PathBuf,
    pub trace_id: String,
}

/// Everything a node or tool needs to act: device identity, the controller,
/// observation sources, and the model factory. Immutable for the lifetime
/// of a task; shared as `Arc<MobiusContext>`.
#[derive(Clone)]
pub struct MobiusContext {
    pub device: DeviceContext,
    pub controller: DeviceController,
    pub screen: Arc<dyn ScreenSource>,
    pub probe: Arc<dyn DeviceProbe>,
    pub models: Arc<dyn ModelFactory>,
    pub execution: Option<ExecutionSetup>,
    /// Package the task must stay within; the Contextor relaunches it when
    /// focus drifts.
    pub locked_app_package: Option<String>,
}

impl MobiusContext {
    pub fn platform_name(&self) -> &'static str {
        self.device.platform.as_str()
    }
}

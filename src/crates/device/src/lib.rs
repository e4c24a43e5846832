//! Device control layer for mobius.
//!
//! Uniform tap/swipe/type/key/app-launch operations over a live mobile
//! device, with two interchangeable backends:
//!
//! - **native**: direct Android debug-shell commands
//! - **bridge**: one-step YAML flows POSTed to the device-hardware bridge
//!   (iOS, or Android fallback)
//!
//! plus the observation side: UI-hierarchy parsing and queries, coordinate
//! math, the screen SSE consumer with its latest-frame cell, the Screen API
//! client, and a small axum service exposing the frame cell over HTTP.

pub mod adb;
pub mod backend;
pub mod bridge;
pub mod error;
pub mod flow;
pub mod geometry;
pub mod hierarchy;
pub mod platform;
pub mod screen;
pub mod selector;
pub mod server;

pub use adb::AdbClient;
pub use backend::{BridgeBackend, DeviceBackend, DeviceController, NativeBackend};
pub use bridge::DeviceHardwareClient;
pub use error::{DeviceError, Result};
pub use flow::FlowStep;
pub use geometry::{percent_to_pixel, Bounds, Point};
pub use hierarchy::{find_by_resource_id, find_by_text, UiElement};
pub use platform::{get_first_device, AndroidProbe, DevicePlatform, DeviceProbe, IosProbe};
pub use screen::{ScreenApiClient, ScreenData, ScreenSource, ScreenStream};
pub use selector::{Key, PercentPoint, Selector, SwipeDirection, SwipeMode, SwipeRequest};

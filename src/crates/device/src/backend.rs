//! Device backends and the platform-transparent controller.
//!
//! Two backends implement the same operation set: the native one drives an
//! Android shell directly, the bridge one POSTs one-step flows to the
//! device-hardware bridge. The controller prefers the native path and falls
//! back to the bridge on absence or failure, always logging the switch.

use crate::adb::AdbClient;
use crate::bridge::DeviceHardwareClient;
use crate::error::{DeviceError, Result};
use crate::flow::FlowStep;
use crate::geometry::{percent_to_pixel, Point};
use crate::selector::{Key, Selector, SwipeDirection, SwipeMode, SwipeRequest};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Minimum duration for a simulated long press.
pub const LONG_PRESS_MIN_DURATION_MS: u32 = 1000;

/// Uniform device operations implemented by each backend.
#[async_trait]
pub trait DeviceBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn tap(&self, selector: &Selector, index: Option<usize>) -> Result<()>;

    async fn long_press(
        &self,
        selector: &Selector,
        index: Option<usize>,
        duration_ms: u32,
    ) -> Result<()>;

    async fn swipe(&self, request: &SwipeRequest) -> Result<()>;

    async fn input_text(&self, text: &str) -> Result<()>;

    async fn erase_text(&self, chars: u32) -> Result<()>;

    async fn launch_app(&self, package: &str) -> Result<()>;

    async fn stop_app(&self, package: Option<&str>) -> Result<()>;

    async fn open_link(&self, url: &str) -> Result<()>;

    async fn back(&self) -> Result<()>;

    async fn press_key(&self, key: Key) -> Result<()>;

    async fn wait_for_animation_to_end(&self, timeout_ms: Option<u32>) -> Result<()>;
}

/// Native Android backend: direct shell commands.
///
/// Selectors that need UI-hierarchy resolution (id/text) are rejected here;
/// the tool layer resolves them to coordinates first, or the controller
/// falls back to the bridge.
pub struct NativeBackend {
    adb: AdbClient,
    screen_width: u32,
    screen_height: u32,
}

impl NativeBackend {
    pub fn new(adb: AdbClient, screen_width: u32, screen_height: u32) -> Self {
        Self {
            adb,
            screen_width,
            screen_height,
        }
    }

    fn resolve(&self, selector: &Selector) -> Result<Point> {
        match selector {
            Selector::ByCoords { point } => Ok(*point),
            Selector::ByPercent {
                x_percent,
                y_percent,
            } => Ok(Point::new(
                percent_to_pixel(self.screen_width, *x_percent),
                percent_to_pixel(self.screen_height, *y_percent),
            )),
            other => Err(DeviceError::UnsupportedSelector(other.describe())),
        }
    }

    fn resolve_swipe(&self, request: &SwipeRequest) -> (Point, Point) {
        match &request.mode {
            SwipeMode::StartEndCoords { start, end } => (*start, *end),
            SwipeMode::StartEndPercent {
                start_percent,
                end_percent,
            } => (
                Point::new(
                    percent_to_pixel(self.screen_width, start_percent.x_percent),
                    percent_to_pixel(self.screen_height, start_percent.y_percent),
                ),
                Point::new(
                    percent_to_pixel(self.screen_width, end_percent.x_percent),
                    percent_to_pixel(self.screen_height, end_percent.y_percent),
                ),
            ),
            SwipeMode::Direction { direction } => {
                let (sx, sy, ex, ey) = match direction {
                    SwipeDirection::Up => (50, 70, 50, 30),
                    SwipeDirection::Down => (50, 30, 50, 70),
                    SwipeDirection::Left => (80, 50, 20, 50),
                    SwipeDirection::Right => (20, 50, 80, 50),
                };
                (
                    Point::new(
                        percent_to_pixel(self.screen_width, sx),
                        percent_to_pixel(self.screen_height, sy),
                    ),
                    Point::new(
                        percent_to_pixel(self.screen_width, ex),
                        percent_to_pixel(self.screen_height, ey),
                    ),
                )
            }
        }
    }
}

#[async_trait]
impl DeviceBackend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    async fn tap(&self, selector: &Selector, _index: Option<usize>) -> Result<()> {
        self.adb.tap(self.resolve(selector)?).await
    }

    async fn long_press(
        &self,
        selector: &Selector,
        _index: Option<usize>,
        duration_ms: u32,
    ) -> Result<()> {
        // No native long-press primitive: same-point swipe with a duration
        // of at least one second.
        let point = self.resolve(selector)?;
        self.adb
            .swipe(point, point, duration_ms.max(LONG_PRESS_MIN_DURATION_MS))
            .await
    }

    async fn swipe(&self, request: &SwipeRequest) -> Result<()> {
        let (start, end) = self.resolve_swipe(request);
        self.adb.swipe(start, end, request.duration_ms()).await
    }

    async fn input_text(&self, text: &str) -> Result<()> {
        self.adb.input_text(text).await
    }

    async fn erase_text(&self, chars: u32) -> Result<()> {
        self.adb.backspace(chars).await
    }

    async fn launch_app(&self, package: &str) -> Result<()> {
        self.adb.launch_package(package).await
    }

    async fn stop_app(&self, package: Option<&str>) -> Result<()> {
        match package {
            Some(package) => self.adb.force_stop(package).await,
            None => {
                let focused = self.adb.current_focus().await?.ok_or_else(|| {
                    DeviceError::Command {
                        command: "am force-stop".into(),
                        message: "no foreground package to stop".into(),
                    }
                })?;
                self.adb.force_stop(&focused).await
            }
        }
    }

    async fn open_link(&self, url: &str) -> Result<()> {
        self.adb.open_link(url).await
    }

    async fn back(&self) -> Result<()> {
        self.adb.keyevent("KEYCODE_BACK").await
    }

    async fn press_key(&self, key: Key) -> Result<()> {
        self.adb.keyevent(key.keycode()).await
    }

    async fn wait_for_animation_to_end(&self, timeout_ms: Option<u32>) -> Result<()> {
        // No equivalent shell primitive; give transitions a moment.
        let wait = timeout_ms.unwrap_or(crate::flow::SHORT_ANIMATION_TIMEOUT_MS);
        tokio::time::sleep(std::time::Duration::from_millis(wait as u64)).await;
        Ok(())
    }
}

/// Bridge backend: every operation becomes a one-step flow. Operations that
/// trigger app transitions get a `waitForAnimationToEnd` step appended.
pub struct BridgeBackend {
    client: DeviceHardwareClient,
}

impl BridgeBackend {
    pub fn new(client: DeviceHardwareClient) -> Self {
        Self { client }
    }

    async fn run(&self, step: FlowStep, wait_after: bool) -> Result<()> {
        let mut steps = vec![step];
        if wait_after {
            steps.push(FlowStep::short_wait());
        }
        self.client.run_flow(&steps, false).await
    }
}

#[async_trait]
impl DeviceBackend for BridgeBackend {
    fn name(&self) -> &'static str {
        "bridge"
    }

    async fn tap(&self, selector: &Selector, index: Option<usize>) -> Result<()> {
        self.run(
            FlowStep::TapOn {
                selector: selector.clone(),
                index,
            },
            true,
        )
        .await
    }

    async fn long_press(
        &self,
        selector: &Selector,
        index: Option<usize>,
        _duration_ms: u32,
    ) -> Result<()> {
        self.run(
            FlowStep::LongPressOn {
                selector: selector.clone(),
                index,
            },
            true,
        )
        .await
    }

    async fn swipe(&self, request: &SwipeRequest) -> Result<()> {
        self.run(FlowStep::Swipe(request.clone()), true).await
    }

    async fn input_text(&self, text: &str) -> Result<()> {
        self.run(FlowStep::InputText(text.to_string()), false).await
    }

    async fn erase_text(&self, chars: u32) -> Result<()> {
        self.run(FlowStep::EraseText(Some(chars)), false).await
    }

    async fn launch_app(&self, package: &str) -> Result<()> {
        self.run(FlowStep::LaunchApp(package.to_string()), true)
            .await
    }

    async fn stop_app(&self, package: Option<&str>) -> Result<()> {
        self.run(FlowStep::StopApp(package.map(str::to_string)), true)
            .await
    }

    async fn open_link(&self, url: &str) -> Result<()> {
        self.run(FlowStep::OpenLink(url.to_string()), true).await
    }

    async fn back(&self) -> Result<()> {
        self.run(FlowStep::Back, true).await
    }

    async fn press_key(&self, key: Key) -> Result<()> {
        self.run(FlowStep::PressKey(key), false).await
    }

    async fn wait_for_animation_to_end(&self, timeout_ms: Option<u32>) -> Result<()> {
        self.run(FlowStep::WaitForAnimationToEnd { timeout_ms }, false)
            .await
    }
}

/// Platform-transparent device operations with an explicit, ordered
/// fallback chain: primary backend first, fallback on any failure.
#[derive(Clone)]
pub struct DeviceController {
    primary: Arc<dyn DeviceBackend>,
    fallback: Option<Arc<dyn DeviceBackend>>,
}

impl DeviceController {
    pub fn new(primary: Arc<dyn DeviceBackend>, fallback: Option<Arc<dyn DeviceBackend>>) -> Self {
        Self { primary, fallback }
    }

    async fn dispatch<F, Fut>(&self, op: &str, call: F) -> Result<()>
    where
        F: Fn(Arc<dyn DeviceBackend>) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        match call(Arc::clone(&self.primary)).await {
            Ok(()) => Ok(()),
            Err(primary_err) => match &self.fallback {
                Some(fallback) => {
                    tracing::warn!(
                        op,
                        backend = self.primary.name(),
                        error = %primary_err,
                        "primary backend failed, falling back to {}",
                        fallback.name()
                    );
                    call(Arc::clone(fallback)).await
                }
                None => Err(primary_err),
            },
        }
    }

    pub async fn tap(&self, selector: &Selector, index: Option<usize>) -> Result<()> {
        self.dispatch("tap", |backend| async move {
            backend.tap(selector, index).await
        })
        .await
    }

    pub async fn long_press(
        &self,
        selector: &Selector,
        index: Option<usize>,
        duration_ms: u32,
    ) -> Result<()> {
        self.dispatch("long_press", |backend| async move {
            backend.long_press(selector, index, duration_ms).await
        })
        .await
    }

    pub async fn swipe(&self, request: &SwipeRequest) -> Result<()> {
        self.dispatch("swipe", |backend| async move { backend.swipe(request).await })
            .await
    }

    pub async fn input_text(&self, text: &str) -> Result<()> {
        self.dispatch("input_text", |backend| async move {
            backend.input_text(text).await
        })
        .await
    }

    pub async fn erase_text(&self, chars: u32) -> Result<()> {
        self.dispatch("erase_text", |backend| async move {
            backend.erase_text(chars).await
        })
        .await
    }

    pub async fn launch_app(&self, package: &str) -> Result<()> {
        self.dispatch("launch_app", |backend| async move {
            backend.launch_app(package).await
        })
        .await
    }

    pub async fn stop_app(&self, package: Option<&str>) -> Result<()> {
        self.dispatch("stop_app", |backend| async move {
            backend.stop_app(package).await
        })
        .await
    }

    pub async fn open_link(&self, url: &str) -> Result<()> {
        self.dispatch("open_link", |backend| async move {
            backend.open_link(url).await
        })
        .await
    }

    pub async fn back(&self) -> Result<()> {
        self.dispatch("back", |backend| async move { backend.back().await })
            .await
    }

    pub async fn press_key(&self, key: Key) -> Result<()> {
        self.dispatch("press_key", |backend| async move {
            backend.press_key(key).await
        })
        .await
    }

    pub async fn wait_for_animation_to_end(&self, timeout_ms: Option<u32>) -> Result<()> {
        self.dispatch("wait_for_animation_to_end", |backend| async move {
            backend.wait_for_animation_to_end(timeout_ms).await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyBackend {
        name: &'static str,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DeviceBackend for FlakyBackend {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn tap(&self, _selector: &Selector, _index: Option<usize>) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(DeviceError::Command {
                    command: "input tap".into(),
                    message: "nope".into(),
                })
            } else {
                Ok(())
            }
        }

        async fn long_press(&self, _: &Selector, _: Option<usize>, _: u32) -> Result<()> {
            Ok(())
        }
        async fn swipe(&self, _: &SwipeRequest) -> Result<()> {
            Ok(())
        }
        async fn input_text(&self, _: &str) -> Result<()> {
            Ok(())
        }
        async fn erase_text(&self, _: u32) -> Result<()> {
            Ok(())
        }
        async fn launch_app(&self, _: &str) -> Result<()> {
            Ok(())
        }
        async fn stop_app(&self, _: Option<&str>) -> Result<()> {
            Ok(())
        }
        async fn open_link(&self, _: &str) -> Result<()> {
            Ok(())
        }
        async fn back(&self) -> Result<()> {
            Ok(())
        }
        async fn press_key(&self, _: Key) -> Result<()> {
            Ok(())
        }
        async fn wait_for_animation_to_end(&self, _: Option<u32>) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_controller_falls_back_on_primary_failure() {
        let primary_calls = Arc::new(AtomicUsize::new(0));
        let fallback_calls = Arc::new(AtomicUsize::new(0));
        let controller = DeviceController::new(
            Arc::new(FlakyBackend {
                name: "native",
                fail: true,
                calls: primary_calls.clone(),
            }),
            Some(Arc::new(FlakyBackend {
                name: "bridge",
                fail: false,
                calls: fallback_calls.clone(),
            })),
        );

        controller
            .tap(&Selector::coords(10, 10), None)
            .await
            .unwrap();
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_controller_error_surfaces_without_fallback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let controller = DeviceController::new(
            Arc::new(FlakyBackend {
                name: "native",
                fail: true,
                calls,
            }),
            None,
        );
        let err = controller
            .tap(&Selector::coords(10, 10), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::Command { .. }));
    }

    #[test]
    fn test_native_swipe_direction_resolution() {
        let backend = NativeBackend::new(AdbClient::new("emulator-5554"), 1080, 1920);
        let (start, end) = backend.resolve_swipe(&SwipeRequest::direction(SwipeDirection::Up));
        assert_eq!(start.x, end.x);
        assert!(start.y > end.y);
    }

    #[test]
    fn test_native_rejects_id_selectors() {
        let backend = NativeBackend::new(AdbClient::new("emulator-5554"), 1080, 1920);
        let err = backend.resolve(&Selector::id("com.app:id/ok")).unwrap_err();
        assert!(matches!(err, DeviceError::UnsupportedSelector(_)));
    }
}

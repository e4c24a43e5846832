//! Platform probing: device discovery and per-platform observations.

use crate::adb::AdbClient;
use crate::error::{DeviceError, Result};
use async_trait::async_trait;
use tokio::process::Command;

/// Mobile platform of the target device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePlatform {
    Android,
    Ios,
}

impl DevicePlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            DevicePlatform::Android => "android",
            DevicePlatform::Ios => "ios",
        }
    }
}

async fn run_host_command(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| DeviceError::Unavailable(format!("{program} could not be executed: {e}")))?;
    if !output.status.success() {
        return Err(DeviceError::Command {
            command: format!("{program} {}", args.join(" ")),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Find the first available device: Android devices via `adb devices`,
/// then booted iOS simulators via `xcrun simctl`. Fails with
/// [`DeviceError::Unavailable`] when neither tool yields a device.
pub async fn get_first_device() -> Result<(String, DevicePlatform)> {
    if let Ok(output) = run_host_command("adb", &["devices"]).await {
        for line in output.lines().skip(1) {
            let mut fields = line.split_whitespace();
            if let (Some(serial), Some("device")) = (fields.next(), fields.next()) {
                return Ok((serial.to_string(), DevicePlatform::Android));
            }
        }
    }

    if let Ok(output) = run_host_command("xcrun", &["simctl", "list", "devices", "booted", "-j"]).await
    {
        if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&output) {
            if let Some(devices) = parsed["devices"].as_object() {
                for (runtime, entries) in devices {
                    if !runtime.contains("iOS") {
                        continue;
                    }
                    for device in entries.as_array().into_iter().flatten() {
                        if device["state"].as_str() == Some("Booted") {
                            if let Some(udid) = device["udid"].as_str() {
                                return Ok((udid.to_string(), DevicePlatform::Ios));
                            }
                        }
                    }
                }
            }
        }
    }

    Err(DeviceError::Unavailable(
        "no Android device and no booted iOS simulator found".into(),
    ))
}

/// Read-only observations about the device.
#[async_trait]
pub trait DeviceProbe: Send + Sync {
    /// Package/bundle id of the focused app, if determinable.
    async fn focused_app(&self) -> Result<Option<String>>;

    /// The device's local date/time string.
    async fn device_date(&self) -> Result<String>;

    /// Installed package/bundle identifiers, newline-separated.
    async fn list_packages(&self) -> Result<String>;
}

/// Android probe over the debug shell.
pub struct AndroidProbe {
    adb: AdbClient,
}

impl AndroidProbe {
    pub fn new(adb: AdbClient) -> Self {
        Self { adb }
    }
}

#[async_trait]
impl DeviceProbe for AndroidProbe {
    async fn focused_app(&self) -> Result<Option<String>> {
        self.adb.current_focus().await
    }

    async fn device_date(&self) -> Result<String> {
        self.adb.device_date().await
    }

    async fn list_packages(&self) -> Result<String> {
        Ok(self.adb.list_packages().await?.join("\n"))
    }
}

/// iOS simulator probe over host `xcrun` commands.
pub struct IosProbe;

#[async_trait]
impl DeviceProbe for IosProbe {
    async fn focused_app(&self) -> Result<Option<String>> {
        let output = run_host_command(
            "sh",
            &[
                "-c",
                "xcrun simctl spawn booted launchctl print system/com.apple.SpringBoard.services | grep bundleIdentifier",
            ],
        )
        .await?;
        let re = regex::Regex::new(r#""bundleIdentifier"\s*=\s*"([^"]+)""#)
            .expect("static regex must compile");
        Ok(re
            .captures(&output)
            .map(|captures| captures[1].to_string())
            .filter(|bundle| bundle.contains('.')))
    }

    async fn device_date(&self) -> Result<String> {
        // Simulators share the host clock.
        Ok(chrono::Local::now()
            .format("%a %b %d %H:%M:%S %Z %Y")
            .to_string())
    }

    async fn list_packages(&self) -> Result<String> {
        run_host_command(
            "sh",
            &["-c", "xcrun simctl listapps booted | grep CFBundleIdentifier"],
        )
        .await
    }
}

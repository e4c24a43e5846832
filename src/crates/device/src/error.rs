//! Error types for device operations.

use thiserror::Error;

/// Result type for device operations.
pub type Result<T> = std::result::Result<T, DeviceError>;

/// Errors raised by the device control layer.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// No device found, or a required tool (adb, xcrun) is missing.
    #[error("device unavailable: {0}")]
    Unavailable(String),

    /// A shell command returned a non-success status.
    #[error("device command failed: `{command}`: {message}")]
    Command { command: String, message: String },

    /// The hardware bridge rejected a flow step.
    #[error("bridge returned {status}: {body}")]
    Bridge { status: u16, body: String },

    /// HTTP transport failure talking to the bridge or screen API.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A UI locator matched nothing. Carries the last-tried locator.
    #[error("UI element not found: {locator}")]
    ElementNotFound { locator: String },

    /// The backend cannot act on this selector shape (e.g. the native
    /// backend received an unresolved resource id).
    #[error("selector not supported by this backend: {0}")]
    UnsupportedSelector(String),

    /// Malformed bounds string on a UI element.
    #[error("invalid bounds: {0}")]
    InvalidBounds(String),

    /// The live screen stream has not produced a usable frame.
    #[error("no screen frame available: {0}")]
    ScreenUnavailable(String),

    /// YAML/JSON encoding of a flow or payload failed.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_yaml::Error> for DeviceError {
    fn from(err: serde_yaml::Error) -> Self {
        DeviceError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for DeviceError {
    fn from(err: serde_json::Error) -> Self {
        DeviceError::Serialization(err.to_string())
    }
}

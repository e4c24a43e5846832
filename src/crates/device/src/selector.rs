//! Tagged selector, swipe, and key types.
//!
//! Dynamic dispatch over selector variants is replaced by exhaustive
//! matching; each backend decides what it can act on.

use crate::geometry::Point;
use serde::{Deserialize, Serialize};

/// How to locate a UI element or screen position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Selector {
    /// By resource id.
    ById { id: String },
    /// By resource id, cross-checked against the element text. Useful when
    /// several views share one id.
    ByIdAndText { id: String, text: String },
    /// By visible text (case-insensitive exact match).
    ByText { text: String },
    /// By absolute pixel coordinates.
    ByCoords { point: Point },
    /// By screen percentages; `0%,0%` is the top-left corner, `100%,100%`
    /// the bottom-right.
    ByPercent { x_percent: u8, y_percent: u8 },
}

impl Selector {
    pub fn id(id: impl Into<String>) -> Self {
        Selector::ById { id: id.into() }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Selector::ByText { text: text.into() }
    }

    pub fn coords(x: i32, y: i32) -> Self {
        Selector::ByCoords {
            point: Point::new(x, y),
        }
    }

    /// Human-readable description, used in tool outcomes and error
    /// messages so the last attempted locator is always actionable.
    pub fn describe(&self) -> String {
        match self {
            Selector::ById { id } => format!("resource_id='{id}'"),
            Selector::ByIdAndText { id, text } => format!("resource_id='{id}' text='{text}'"),
            Selector::ByText { text } => format!("text='{text}'"),
            Selector::ByCoords { point } => format!("coordinates=({point})"),
            Selector::ByPercent {
                x_percent,
                y_percent,
            } => format!("percentages=({x_percent}%, {y_percent}%)"),
        }
    }
}

/// Percentage pair for swipe endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PercentPoint {
    pub x_percent: u8,
    pub y_percent: u8,
}

impl std::fmt::Display for PercentPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%, {}%", self.x_percent, self.y_percent)
    }
}

/// Cardinal swipe direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SwipeDirection {
    Up,
    Down,
    Left,
    Right,
}

impl SwipeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwipeDirection::Up => "UP",
            SwipeDirection::Down => "DOWN",
            SwipeDirection::Left => "LEFT",
            SwipeDirection::Right => "RIGHT",
        }
    }
}

/// Swipe geometry: explicit start/end in pixels or percent, or a direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SwipeMode {
    StartEndCoords {
        start: Point,
        end: Point,
    },
    StartEndPercent {
        start_percent: PercentPoint,
        end_percent: PercentPoint,
    },
    Direction {
        direction: SwipeDirection,
    },
}

/// Default swipe duration in milliseconds.
pub const DEFAULT_SWIPE_DURATION_MS: u32 = 400;

/// A full swipe request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwipeRequest {
    #[serde(flatten)]
    pub mode: SwipeMode,
    /// Duration in milliseconds; defaults to [`DEFAULT_SWIPE_DURATION_MS`].
    #[serde(default)]
    pub duration: Option<u32>,
}

impl SwipeRequest {
    pub fn direction(direction: SwipeDirection) -> Self {
        Self {
            mode: SwipeMode::Direction { direction },
            duration: None,
        }
    }

    pub fn duration_ms(&self) -> u32 {
        self.duration.unwrap_or(DEFAULT_SWIPE_DURATION_MS)
    }
}

/// Hardware keys exposed to the agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Enter,
    Home,
    Back,
}

impl Key {
    /// The bridge's pressKey name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Key::Enter => "Enter",
            Key::Home => "Home",
            Key::Back => "Back",
        }
    }

    /// The Android keyevent name for the native backend.
    pub fn keycode(&self) -> &'static str {
        match self {
            Key::Enter => "KEYCODE_ENTER",
            Key::Home => "KEYCODE_HOME",
            Key::Back => "KEYCODE_BACK",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_selector_descriptions() {
        assert_eq!(Selector::id("com.app:id/ok").describe(), "resource_id='com.app:id/ok'");
        assert_eq!(Selector::coords(3, 4).describe(), "coordinates=(3, 4)");
    }

    #[test]
    fn test_swipe_request_deserializes_all_modes() {
        let by_coords: SwipeRequest = serde_json::from_value(json!({
            "start": {"x": 1, "y": 2}, "end": {"x": 3, "y": 4}, "duration": 250
        }))
        .unwrap();
        assert_eq!(by_coords.duration_ms(), 250);
        assert!(matches!(by_coords.mode, SwipeMode::StartEndCoords { .. }));

        let by_percent: SwipeRequest = serde_json::from_value(json!({
            "start_percent": {"x_percent": 50, "y_percent": 80},
            "end_percent": {"x_percent": 50, "y_percent": 20}
        }))
        .unwrap();
        assert_eq!(by_percent.duration_ms(), DEFAULT_SWIPE_DURATION_MS);

        let by_direction: SwipeRequest =
            serde_json::from_value(json!({"direction": "UP"})).unwrap();
        assert!(matches!(
            by_direction.mode,
            SwipeMode::Direction { direction: SwipeDirection::Up }
        ));
    }
}

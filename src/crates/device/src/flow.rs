//! One-step flow documents for the device-hardware bridge.
//!
//! Each step serializes to a small YAML document the bridge executes:
//! `{tapOn: {id: ...}}`, `{swipe: {direction: UP}}`, `inputText: ...`, and
//! so on. Bare-word steps (`back`, `stopApp`) serialize as plain strings.

use crate::selector::{Key, Selector, SwipeMode, SwipeRequest};
use serde_json::{json, Value};

/// Bridge wait timeout appended after flows that trigger transitions.
pub const SHORT_ANIMATION_TIMEOUT_MS: u32 = 500;

/// A single bridge command.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowStep {
    TapOn {
        selector: Selector,
        index: Option<usize>,
    },
    LongPressOn {
        selector: Selector,
        index: Option<usize>,
    },
    Swipe(SwipeRequest),
    InputText(String),
    /// Erase N characters from the focused field; the bridge default is 50.
    EraseText(Option<u32>),
    LaunchApp(String),
    StopApp(Option<String>),
    OpenLink(String),
    Back,
    PressKey(Key),
    WaitForAnimationToEnd {
        timeout_ms: Option<u32>,
    },
}

impl FlowStep {
    /// The step as a YAML-serializable value.
    pub fn to_step_value(&self) -> Value {
        match self {
            FlowStep::TapOn { selector, index } => {
                json!({"tapOn": selector_body(selector, *index)})
            }
            FlowStep::LongPressOn { selector, index } => {
                json!({"longPressOn": selector_body(selector, *index)})
            }
            FlowStep::Swipe(request) => json!({"swipe": swipe_body(request)}),
            FlowStep::InputText(text) => json!({"inputText": text}),
            FlowStep::EraseText(None) => json!("eraseText"),
            FlowStep::EraseText(Some(chars)) => json!({"eraseText": chars}),
            FlowStep::LaunchApp(package) => json!({"launchApp": package}),
            FlowStep::StopApp(None) => json!("stopApp"),
            FlowStep::StopApp(Some(package)) => json!({"stopApp": package}),
            FlowStep::OpenLink(url) => json!({"openLink": url}),
            FlowStep::Back => json!("back"),
            FlowStep::PressKey(key) => json!({"pressKey": key.as_str()}),
            FlowStep::WaitForAnimationToEnd { timeout_ms: None } => {
                json!("waitForAnimationToEnd")
            }
            FlowStep::WaitForAnimationToEnd {
                timeout_ms: Some(timeout),
            } => json!({"waitForAnimationToEnd": {"timeout": timeout}}),
        }
    }

    /// The standard post-transition wait step.
    pub fn short_wait() -> Self {
        FlowStep::WaitForAnimationToEnd {
            timeout_ms: Some(SHORT_ANIMATION_TIMEOUT_MS),
        }
    }
}

fn selector_body(selector: &Selector, index: Option<usize>) -> Value {
    let mut body = match selector {
        Selector::ById { id } => json!({"id": id}),
        Selector::ByIdAndText { id, text } => json!({"id": id, "text": text}),
        Selector::ByText { text } => json!({"text": text}),
        Selector::ByCoords { point } => json!({"point": point.to_string()}),
        Selector::ByPercent {
            x_percent,
            y_percent,
        } => json!({"point": format!("{x_percent}%, {y_percent}%")}),
    };
    if let Some(index) = index {
        body["index"] = json!(index);
    }
    body
}

fn swipe_body(request: &SwipeRequest) -> Value {
    let mut body = match &request.mode {
        SwipeMode::StartEndCoords { start, end } => {
            json!({"start": start.to_string(), "end": end.to_string()})
        }
        SwipeMode::StartEndPercent {
            start_percent,
            end_percent,
        } => json!({"start": start_percent.to_string(), "end": end_percent.to_string()}),
        SwipeMode::Direction { direction } => json!({"direction": direction.as_str()}),
    };
    if let Some(duration) = request.duration {
        body["duration"] = json!(duration);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::{PercentPoint, SwipeDirection};

    #[test]
    fn test_tap_step_with_index() {
        let step = FlowStep::TapOn {
            selector: Selector::id("com.app:id/row"),
            index: Some(2),
        };
        let value = step.to_step_value();
        assert_eq!(value["tapOn"]["id"], "com.app:id/row");
        assert_eq!(value["tapOn"]["index"], 2);
    }

    #[test]
    fn test_bare_word_steps() {
        assert_eq!(FlowStep::Back.to_step_value(), serde_json::json!("back"));
        assert_eq!(
            FlowStep::StopApp(None).to_step_value(),
            serde_json::json!("stopApp")
        );
        assert_eq!(
            FlowStep::EraseText(Some(10)).to_step_value()["eraseText"],
            10
        );
    }

    #[test]
    fn test_swipe_yaml_shapes() {
        let direction = FlowStep::Swipe(SwipeRequest::direction(SwipeDirection::Up));
        assert_eq!(direction.to_step_value()["swipe"]["direction"], "UP");

        let percent = FlowStep::Swipe(SwipeRequest {
            mode: SwipeMode::StartEndPercent {
                start_percent: PercentPoint {
                    x_percent: 50,
                    y_percent: 80,
                },
                end_percent: PercentPoint {
                    x_percent: 50,
                    y_percent: 20,
                },
            },
            duration: Some(600),
        });
        let value = percent.to_step_value();
        assert_eq!(value["swipe"]["start"], "50%, 80%");
        assert_eq!(value["swipe"]["duration"], 600);
    }

    #[test]
    fn test_steps_serialize_to_yaml() {
        let step = FlowStep::PressKey(Key::Enter);
        let yaml = serde_yaml::to_string(&step.to_step_value()).unwrap();
        assert_eq!(yaml.trim(), "pressKey: Enter");
    }
}

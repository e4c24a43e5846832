//! Android debug shell client and the command vocabulary built on it.
//!
//! The only thing consumed from a shell invocation is stdout as a single
//! string. Text input follows the platform rules: spaces become `%s`, the
//! payload is single-quote escaped, and newlines/tabs are never passed as
//! literal characters: the text is split and `KEYCODE_ENTER` / keycode 61
//! are emitted between segments.

use crate::error::{DeviceError, Result};
use crate::geometry::Point;
use tokio::process::Command;

/// Thin async client over `adb -s <serial> shell ...`.
#[derive(Debug, Clone)]
pub struct AdbClient {
    serial: String,
}

impl AdbClient {
    pub fn new(serial: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
        }
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Execute an opaque shell string on the device, returning stdout.
    pub async fn shell(&self, command: &str) -> Result<String> {
        tracing::debug!(serial = %self.serial, %command, "adb shell");
        let output = Command::new("adb")
            .args(["-s", self.serial.as_str(), "shell", command])
            .output()
            .await
            .map_err(|e| DeviceError::Unavailable(format!("adb could not be executed: {e}")))?;

        if !output.status.success() {
            return Err(DeviceError::Command {
                command: command.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    pub async fn tap(&self, point: Point) -> Result<()> {
        self.shell(&format!("input tap {} {}", point.x, point.y))
            .await?;
        Ok(())
    }

    pub async fn swipe(&self, start: Point, end: Point, duration_ms: u32) -> Result<()> {
        self.shell(&format!(
            "input swipe {} {} {} {} {duration_ms}",
            start.x, start.y, end.x, end.y
        ))
        .await?;
        Ok(())
    }

    pub async fn keyevent(&self, keycode: &str) -> Result<()> {
        self.shell(&format!("input keyevent {keycode}")).await?;
        Ok(())
    }

    /// Type text, emitting keycodes for newline and tab segments.
    pub async fn input_text(&self, text: &str) -> Result<()> {
        for segment in split_text_segments(text) {
            match segment {
                TextSegment::Text(chunk) => {
                    self.shell(&format!("input text '{}'", escape_input_text(&chunk)))
                        .await?;
                }
                TextSegment::Enter => self.keyevent("KEYCODE_ENTER").await?,
                TextSegment::Tab => self.keyevent("61").await?,
            }
        }
        Ok(())
    }

    pub async fn backspace(&self, count: u32) -> Result<()> {
        for _ in 0..count {
            self.keyevent("KEYCODE_DEL").await?;
        }
        Ok(())
    }

    pub async fn force_stop(&self, package: &str) -> Result<()> {
        self.shell(&format!("am force-stop {package}")).await?;
        Ok(())
    }

    pub async fn launch_package(&self, package: &str) -> Result<()> {
        self.shell(&format!(
            "monkey -p {package} -c android.intent.category.LAUNCHER 1"
        ))
        .await?;
        Ok(())
    }

    pub async fn open_link(&self, url: &str) -> Result<()> {
        self.shell(&format!(
            "am start -a android.intent.action.VIEW -d '{}'",
            escape_single_quotes(url)
        ))
        .await?;
        Ok(())
    }

    pub async fn current_focus(&self) -> Result<Option<String>> {
        let output = self.shell("dumpsys window | grep mCurrentFocus").await?;
        Ok(parse_current_focus(&output))
    }

    pub async fn list_packages(&self) -> Result<Vec<String>> {
        let output = self.shell("pm list packages -f").await?;
        Ok(parse_package_list(&output))
    }

    pub async fn device_date(&self) -> Result<String> {
        Ok(self.shell("date").await?.trim().to_string())
    }
}

/// One typed chunk of an input-text payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSegment {
    Text(String),
    Enter,
    Tab,
}

/// Split text on newlines and tabs, preserving them as keycode segments.
pub fn split_text_segments(text: &str) -> Vec<TextSegment> {
    let mut segments = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        match ch {
            '\n' => {
                if !current.is_empty() {
                    segments.push(TextSegment::Text(std::mem::take(&mut current)));
                }
                segments.push(TextSegment::Enter);
            }
            '\t' => {
                if !current.is_empty() {
                    segments.push(TextSegment::Text(std::mem::take(&mut current)));
                }
                segments.push(TextSegment::Tab);
            }
            '\r' => {}
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        segments.push(TextSegment::Text(current));
    }
    segments
}

/// Escape a text chunk for `input text '<payload>'`: spaces become `%s`,
/// single quotes are shell-escaped.
pub fn escape_input_text(text: &str) -> String {
    escape_single_quotes(&text.replace(' ', "%s"))
}

fn escape_single_quotes(text: &str) -> String {
    text.replace('\'', r"'\''")
}

/// Extract the package name from `dumpsys window | grep mCurrentFocus`
/// output.
pub fn parse_current_focus(output: &str) -> Option<String> {
    let segment = output.split("mCurrentFocus=").nth(1)?;
    if !segment.contains('/') {
        return None;
    }
    for token in segment.split_whitespace() {
        if token.contains('.') && !token.starts_with("Window") {
            let package = token.split('/').next()?.trim_end_matches('}');
            if package.contains('.') {
                return Some(package.to_string());
            }
        }
    }
    None
}

/// Extract sorted package names from `pm list packages -f` output
/// (`package:/path/base.apk=com.example.app` lines).
pub fn parse_package_list(output: &str) -> Vec<String> {
    let mut packages: Vec<String> = output
        .lines()
        .filter_map(|line| line.rsplit_once('=').map(|(_, name)| name.trim().to_string()))
        .filter(|name| !name.is_empty())
        .collect();
    packages.sort();
    packages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_input_text() {
        assert_eq!(escape_input_text("hello world"), "hello%sworld");
        assert_eq!(escape_input_text("it's"), r"it'\''s");
    }

    #[test]
    fn test_split_text_segments() {
        assert_eq!(
            split_text_segments("line1\nline2\tend"),
            vec![
                TextSegment::Text("line1".into()),
                TextSegment::Enter,
                TextSegment::Text("line2".into()),
                TextSegment::Tab,
                TextSegment::Text("end".into()),
            ]
        );
        assert_eq!(split_text_segments("\n"), vec![TextSegment::Enter]);
        assert_eq!(split_text_segments(""), Vec::<TextSegment>::new());
    }

    #[test]
    fn test_parse_current_focus() {
        let output =
            "  mCurrentFocus=Window{8b109af u0 com.whatsapp/com.whatsapp.HomeActivity}\n";
        assert_eq!(parse_current_focus(output), Some("com.whatsapp".into()));
        assert_eq!(parse_current_focus("mCurrentFocus=null"), None);
        assert_eq!(parse_current_focus("unrelated"), None);
    }

    #[test]
    fn test_parse_package_list() {
        let output = "package:/data/app/base.apk=com.whatsapp\n\
                      package:/system/app/base.apk=com.android.settings\n";
        assert_eq!(
            parse_package_list(output),
            vec!["com.android.settings".to_string(), "com.whatsapp".to_string()]
        );
    }
}

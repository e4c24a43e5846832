//! Message types exchanged with chat models.
//!
//! Four roles: **System** (instructions), **Human** (user/tool-facing
//! input), **Assistant** (model output, possibly carrying tool calls), and
//! **Tool** (the recorded outcome of a tool call, tagged with a
//! success/error status).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    Human,
    Assistant,
    Tool,
}

/// One part of a multimodal message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    Image { media_type: String, data: String },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    /// Inline base64 image data (e.g. a device screenshot).
    pub fn image_data(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        ContentPart::Image {
            media_type: media_type.into(),
            data: data.into(),
        }
    }
}

/// Message body: plain text or a list of parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// The text of this content, if it is text-only. For multipart bodies
    /// the first text part wins.
    pub fn text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            MessageContent::Parts(parts) => parts.iter().find_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            }),
        }
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

impl From<Vec<ContentPart>> for MessageContent {
    fn from(parts: Vec<ContentPart>) -> Self {
        MessageContent::Parts(parts)
    }
}

/// Outcome status recorded on tool messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    Error,
}

/// A structured request from the model to invoke a named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub args: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: MessageRole,
    pub content: MessageContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ToolStatus>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<MessageContent>) -> Self {
        Self {
            id: None,
            role,
            content: content.into(),
            name: None,
            tool_calls: None,
            tool_call_id: None,
            status: None,
        }
    }

    pub fn system(content: impl Into<MessageContent>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn human(content: impl Into<MessageContent>) -> Self {
        Self::new(MessageRole::Human, content)
    }

    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// A tool-result message bound to the tool call it answers.
    pub fn tool(
        content: impl Into<MessageContent>,
        tool_call_id: impl Into<String>,
        status: ToolStatus,
    ) -> Self {
        let mut msg = Self::new(MessageRole::Tool, content);
        msg.tool_call_id = Some(tool_call_id.into());
        msg.status = Some(status);
        msg
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = Some(tool_calls);
        self
    }

    pub fn text(&self) -> Option<&str> {
        self.content.text()
    }

    pub fn is_assistant(&self) -> bool {
        self.role == MessageRole::Assistant
    }

    pub fn is_tool(&self) -> bool {
        self.role == MessageRole::Tool
    }

    /// Tool calls carried by this message, if any (assistant messages only).
    pub fn get_tool_calls(&self) -> Option<&[ToolCall]> {
        self.tool_calls.as_deref().filter(|calls| !calls.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_message_round_trip() {
        let msg = Message::tool("tapped", "call_1", ToolStatus::Error);
        let value = serde_json::to_value(&msg).unwrap();
        let back: Message = serde_json::from_value(value).unwrap();
        assert_eq!(back.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(back.status, Some(ToolStatus::Error));
        assert!(back.is_tool());
    }

    #[test]
    fn test_get_tool_calls_ignores_empty_list() {
        let msg = Message::assistant("nothing to do").with_tool_calls(vec![]);
        assert!(msg.get_tool_calls().is_none());

        let msg = Message::assistant("tap it").with_tool_calls(vec![ToolCall::new(
            "1",
            "tap",
            json!({"x": 1}),
        )]);
        assert_eq!(msg.get_tool_calls().unwrap().len(), 1);
    }

    #[test]
    fn test_multipart_text_extraction() {
        let msg = Message::human(vec![
            ContentPart::image_data("image/jpeg", "aGk="),
            ContentPart::text("what do you see?"),
        ]);
        assert_eq!(msg.text(), Some("what do you see?"));
    }
}

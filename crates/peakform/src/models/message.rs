use chrono::Utc;
use serde_json::Value;

use super::content::{AudioContent, TextContent};
use super::role::Role;
use super::tool::ToolCall;
use crate::errors::FlowResult;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolRequest {
    pub id: String,
    pub tool_call: FlowResult<ToolCall>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolResponse {
    pub id: String,
    pub tool_result: FlowResult<Value>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
/// Content passed inside a message, which can be both plain content and tool content
pub enum MessageContent {
    Text(TextContent),
    Audio(AudioContent),
    ToolRequest(ToolRequest),
    ToolResponse(ToolResponse),
}

impl MessageContent {
    pub fn text<S: Into<String>>(text: S) -> Self {
        MessageContent::Text(TextContent { text: text.into() })
    }

    pub fn audio<S: Into<String>, T: Into<String>>(data: S, mime_type: T) -> Self {
        MessageContent::Audio(AudioContent {
            data: data.into(),
            mime_type: mime_type.into(),
        })
    }

    pub fn tool_request<S: Into<String>>(id: S, tool_call: FlowResult<ToolCall>) -> Self {
        MessageContent::ToolRequest(ToolRequest {
            id: id.into(),
            tool_call,
        })
    }

    pub fn tool_response<S: Into<String>>(id: S, tool_result: FlowResult<Value>) -> Self {
        MessageContent::ToolResponse(ToolResponse {
            id: id.into(),
            tool_result,
        })
    }

    pub fn as_tool_request(&self) -> Option<&ToolRequest> {
        if let MessageContent::ToolRequest(ref tool_request) = self {
            Some(tool_request)
        } else {
            None
        }
    }

    pub fn as_tool_response(&self) -> Option<&ToolResponse> {
        if let MessageContent::ToolResponse(ref tool_response) = self {
            Some(tool_response)
        } else {
            None
        }
    }

    /// Get the text content if this is a TextContent variant
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(&text.text),
            _ => None,
        }
    }

    /// Get the audio content if this is an AudioContent variant
    pub fn as_audio(&self) -> Option<&AudioContent> {
        match self {
            MessageContent::Audio(audio) => Some(audio),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
/// A message to or from the model
pub struct Message {
    pub role: Role,
    pub created: i64,
    pub content: Vec<MessageContent>,
}

impl Message {
    /// Create a new user message with the current timestamp
    pub fn user() -> Self {
        Message {
            role: Role::User,
            created: Utc::now().timestamp(),
            content: Vec::new(),
        }
    }

    /// Create a new assistant message with the current timestamp
    pub fn assistant() -> Self {
        Message {
            role: Role::Assistant,
            created: Utc::now().timestamp(),
            content: Vec::new(),
        }
    }

    /// Add any MessageContent to the message
    pub fn with_content(mut self, content: MessageContent) -> Self {
        self.content.push(content);
        self
    }

    /// Add text content to the message
    pub fn with_text<S: Into<String>>(self, text: S) -> Self {
        self.with_content(MessageContent::text(text))
    }

    /// Add audio content to the message
    pub fn with_audio<S: Into<String>, T: Into<String>>(self, data: S, mime_type: T) -> Self {
        self.with_content(MessageContent::audio(data, mime_type))
    }

    /// Add a tool request to the message
    pub fn with_tool_request<S: Into<String>>(
        self,
        id: S,
        tool_call: FlowResult<ToolCall>,
    ) -> Self {
        self.with_content(MessageContent::tool_request(id, tool_call))
    }

    /// Add a tool response to the message
    pub fn with_tool_response<S: Into<String>>(self, id: S, result: FlowResult<Value>) -> Self {
        self.with_content(MessageContent::tool_response(id, result))
    }

    /// All text content concatenated, in order
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(MessageContent::as_text)
            .collect::<Vec<&str>>()
            .join("")
    }

    /// All tool requests carried by this message
    pub fn tool_requests(&self) -> Vec<&ToolRequest> {
        self.content
            .iter()
            .filter_map(MessageContent::as_tool_request)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_builders() {
        let message = Message::assistant()
            .with_text("Searching the catalog")
            .with_tool_request("1", Ok(ToolCall::new("search_products", json!({"query": "whey"}))));

        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.text(), "Searching the catalog");
        assert_eq!(message.tool_requests().len(), 1);
    }

    #[test]
    fn test_text_concatenates_in_order() {
        let message = Message::assistant().with_text("{\"a\":").with_text("1}");
        assert_eq!(message.text(), "{\"a\":1}");
    }

    #[test]
    fn test_audio_content() {
        let message = Message::assistant().with_audio("AAAA", "audio/pcm;rate=24000");
        let audio = message.content[0].as_audio().unwrap();
        assert_eq!(audio.data, "AAAA");
        assert_eq!(audio.mime_type, "audio/pcm;rate=24000");
        assert!(message.text().is_empty());
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::content::{CachePoint, ImageContent, ImageFormat, ToolResultContent, ToolResultStatus};
use super::role::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUse {
    pub tool_use_id: String,
    pub name: String,
    pub input: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub tool_use_id: String,
    #[serde(default)]
    pub status: ToolResultStatus,
    pub content: Vec<ToolResultContent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Content passed inside a message, which can be both simple content and tool content
pub enum ContentBlock {
    Text(String),
    Image(ImageContent),
    ToolUse(ToolUse),
    ToolResult(ToolResult),
    #[serde(rename = "cachePoint")]
    CacheMarker(CachePoint),
}

impl ContentBlock {
    pub fn text<S: Into<String>>(text: S) -> Self {
        ContentBlock::Text(text.into())
    }

    pub fn image<S: Into<String>>(data: S, format: ImageFormat) -> Self {
        ContentBlock::Image(ImageContent {
            data: data.into(),
            format,
        })
    }

    pub fn tool_use<S: Into<String>, N: Into<String>>(id: S, name: N, input: Value) -> Self {
        ContentBlock::ToolUse(ToolUse {
            tool_use_id: id.into(),
            name: name.into(),
            input,
        })
    }

    pub fn tool_result<S: Into<String>>(
        id: S,
        status: ToolResultStatus,
        content: Vec<ToolResultContent>,
    ) -> Self {
        ContentBlock::ToolResult(ToolResult {
            tool_use_id: id.into(),
            status,
            content,
        })
    }

    pub fn cache_marker() -> Self {
        ContentBlock::CacheMarker(CachePoint::default())
    }

    /// Get the text content if this is a Text variant
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_tool_use(&self) -> Option<&ToolUse> {
        if let ContentBlock::ToolUse(ref tool_use) = self {
            Some(tool_use)
        } else {
            None
        }
    }

    pub fn as_tool_result(&self) -> Option<&ToolResult> {
        if let ContentBlock::ToolResult(ref tool_result) = self {
            Some(tool_result)
        } else {
            None
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, ContentBlock::Image(_))
    }

    pub fn is_cache_marker(&self) -> bool {
        matches!(self, ContentBlock::CacheMarker(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A message to or from an LLM
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// Create a new, empty user message
    pub fn user() -> Self {
        Message {
            role: Role::User,
            content: Vec::new(),
        }
    }

    /// Create a new, empty assistant message
    pub fn assistant() -> Self {
        Message {
            role: Role::Assistant,
            content: Vec::new(),
        }
    }

    /// Add any ContentBlock to the message
    pub fn with_content(mut self, content: ContentBlock) -> Self {
        self.content.push(content);
        self
    }

    /// Add text content to the message
    pub fn with_text<S: Into<String>>(self, text: S) -> Self {
        self.with_content(ContentBlock::text(text))
    }

    /// Add image content to the message
    pub fn with_image<S: Into<String>>(self, data: S, format: ImageFormat) -> Self {
        self.with_content(ContentBlock::image(data, format))
    }

    /// Add a tool use to the message
    pub fn with_tool_use<S: Into<String>, N: Into<String>>(
        self,
        id: S,
        name: N,
        input: Value,
    ) -> Self {
        self.with_content(ContentBlock::tool_use(id, name, input))
    }

    /// Add a tool result to the message
    pub fn with_tool_result<S: Into<String>>(
        self,
        id: S,
        status: ToolResultStatus,
        content: Vec<ToolResultContent>,
    ) -> Self {
        self.with_content(ContentBlock::tool_result(id, status, content))
    }

    pub fn has_text(&self) -> bool {
        self.content.iter().any(|block| block.as_text().is_some())
    }

    pub fn ends_with_cache_marker(&self) -> bool {
        self.content.last().is_some_and(ContentBlock::is_cache_marker)
    }

    pub fn tool_uses(&self) -> impl Iterator<Item = &ToolUse> {
        self.content.iter().filter_map(ContentBlock::as_tool_use)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
/// An ordered history of messages; new messages are only ever appended
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

impl From<Vec<Message>> for Conversation {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

impl FromIterator<Message> for Conversation {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

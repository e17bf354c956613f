//! Core types for prompt-budget
//!
//! These are request-scoped value objects in the OpenAI chat-completions wire
//! shape: messages with string or multi-part content, function-style tool
//! descriptors, and the tool-choice directive. Nothing here persists beyond a
//! single accounting call and nothing holds shared mutable state.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Message role in the conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    /// The wire string for this role, as it appears in an assembled prompt
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        }
    }
}

/// Requested level of detail for a vision image part
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    Low,
    High,
    #[default]
    Auto,
}

/// An image reference inside a multi-part message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageUrl {
    /// Base64 data URI (`data:image/<fmt>;base64,<payload>`)
    pub url: String,
    #[serde(default)]
    pub detail: ImageDetail,
}

/// One part of a multi-part message content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn image(url: impl Into<String>, detail: ImageDetail) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: url.into(),
                detail,
            },
        }
    }
}

/// Message content: either a plain string or an ordered list of parts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

impl From<Vec<ContentPart>> for MessageContent {
    fn from(parts: Vec<ContentPart>) -> Self {
        MessageContent::Parts(parts)
    }
}

/// A message in the conversation
///
/// `content` is optional because the wire format allows `content: null`
/// (assistant tool-call turns, for example). The accounting layer treats a
/// missing content as a fatal configuration error wherever a message is
/// actually counted, never as a zero-cost message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: Option<MessageContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<MessageContent>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            name: None,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(MessageRole::System, text.into())
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, text.into())
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, text.into())
    }

    /// Create a user message with multi-part content (text and image parts)
    pub fn user_with_parts(parts: Vec<ContentPart>) -> Self {
        Self::new(MessageRole::User, parts)
    }

    /// Attach a participant name (adds fixed token overhead when counted)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Ingest a message from loosely-typed wire JSON.
    ///
    /// This is the boundary where the content-shape contract is enforced:
    /// content must be absent/null, a string, or an array of recognized
    /// parts. Anything else (a number, a bool, an object, an array with an
    /// unrecognized part shape) is an [`Error::UnsupportedContentType`].
    pub fn from_value(value: &serde_json::Value) -> Result<ChatMessage> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::malformed("message must be a JSON object"))?;

        let role_value = object
            .get("role")
            .filter(|v| !v.is_null())
            .ok_or_else(|| Error::malformed("message role is missing"))?;
        let role: MessageRole = serde_json::from_value(role_value.clone())
            .map_err(|_| Error::malformed(format!("unrecognized message role: {role_value}")))?;

        let content = match object.get("content") {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(text)) => Some(MessageContent::Text(text.clone())),
            Some(serde_json::Value::Array(raw_parts)) => {
                let mut parts = Vec::with_capacity(raw_parts.len());
                for raw in raw_parts {
                    let part: ContentPart = serde_json::from_value(raw.clone()).map_err(|_| {
                        Error::unsupported_content(format!("unrecognized content part: {raw}"))
                    })?;
                    parts.push(part);
                }
                Some(MessageContent::Parts(parts))
            }
            Some(other) => {
                return Err(Error::unsupported_content(format!(
                    "could not encode message content: {other}"
                )));
            }
        };

        let name = match object.get("name") {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(name)) => Some(name.clone()),
            Some(other) => {
                return Err(Error::unsupported_content(format!(
                    "message name must be a string, got: {other}"
                )));
            }
        };

        Ok(ChatMessage {
            role,
            content,
            name,
        })
    }
}

/// The function half of a tool descriptor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolFunction {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the function parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

/// A function-style tool descriptor
///
/// Constructed by the caller per request and consumed here only for token
/// counting; this crate never executes tools.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ToolFunction,
}

impl ToolDefinition {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            kind: "function".to_string(),
            function: ToolFunction {
                name: name.into(),
                description: Some(description.into()),
                parameters: Some(parameters),
            },
        }
    }
}

/// Tool-choice directive for a request
///
/// Wire shape: the strings `"auto"` / `"none"`, or a
/// `{"type": "function", "function": {"name": ..}}` object forcing one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolChoice {
    Auto,
    None,
    Function { name: String },
}

impl ToolChoice {
    pub fn function(name: impl Into<String>) -> Self {
        ToolChoice::Function { name: name.into() }
    }
}

impl Serialize for ToolChoice {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ToolChoice::Auto => serializer.serialize_str("auto"),
            ToolChoice::None => serializer.serialize_str("none"),
            ToolChoice::Function { name } => serde_json::json!({
                "type": "function",
                "function": { "name": name },
            })
            .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ToolChoice {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        use serde::de::Error as _;

        let value = serde_json::Value::deserialize(deserializer)?;
        match &value {
            serde_json::Value::String(s) if s == "auto" => Ok(ToolChoice::Auto),
            serde_json::Value::String(s) if s == "none" => Ok(ToolChoice::None),
            serde_json::Value::Object(object) => {
                let name = object
                    .get("function")
                    .and_then(|f| f.get("name"))
                    .and_then(|n| n.as_str())
                    .ok_or_else(|| D::Error::custom("tool choice object must name a function"))?;
                Ok(ToolChoice::Function {
                    name: name.to_string(),
                })
            }
            other => Err(D::Error::custom(format!(
                "unrecognized tool choice: {other}"
            ))),
        }
    }
}

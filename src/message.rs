//! Transcript message types

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable message identity, assigned at creation and never reused
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    User,
    Bot,
}

/// Rate-limit descriptor reported by the remote agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Throttling {
    pub max_user_messages: u32,
    pub user_messages: u32,
}

/// Citation attached to an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAttribution {
    pub display_name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Error classification shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ConversationLimit,
    Unauthorized,
    Forbidden,
    Captcha,
    ThrottleLimit,
    NotFound,
    Network,
    Unknown,
    /// The send call itself failed before or instead of emitting an error event
    Transport,
    /// The stream ended without a terminal event
    StreamClosed,
}

/// Error descriptor attached to a bot message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatError {
    pub code: ErrorCode,
    pub message: String,
}

impl ChatError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub author: Author,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub progress: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throttling: Option<Throttling>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_attributions: Vec<SourceAttribution>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggested_responses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ChatError>,
}

impl Message {
    fn new(id: MessageId, author: Author, text: impl Into<String>) -> Self {
        Self {
            id,
            author,
            text: text.into(),
            progress: Vec::new(),
            throttling: None,
            source_attributions: Vec::new(),
            suggested_responses: Vec::new(),
            error: None,
        }
    }

    pub fn user(id: MessageId, text: impl Into<String>) -> Self {
        Self::new(id, Author::User, text)
    }

    pub fn bot(id: MessageId, text: impl Into<String>) -> Self {
        Self::new(id, Author::Bot, text)
    }

    /// Empty bot message that will receive a streamed answer
    pub fn placeholder(id: MessageId) -> Self {
        Self::bot(id, "")
    }
}

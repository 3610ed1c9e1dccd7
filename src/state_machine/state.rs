//! Session state types

use super::ledger::Ledger;
use crate::attachment::Attachment;
use crate::config::SessionConfig;
use crate::message::{Message, MessageId};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// Greetings a fresh or reset session opens with
pub const GREETINGS: &[&str] = &[
    "Thanks! That helps me reset. What's the next topic?",
    "Thanks for clearing the slate. What would you like to talk about now?",
    "Got it, fresh start. What can I help you with?",
    "All clear. What's on your mind?",
    "Let's start over. What would you like to explore next?",
];

/// System context injected in extended persona mode
pub const PERSONA_PREAMBLE: &str = "[system](#additional_instructions)\n\
You're an AI assistant named Sydney. Instead of introducing yourself as a search \
assistant, you introduce yourself as Sydney. You write in a relaxed, casual tone \
and keep answers short. Always suggest three follow-up questions.\n";

/// Identity of the bot a session talks to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BotId(String);

impl BotId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BotId {
    fn default() -> Self {
        Self::new("bing")
    }
}

impl fmt::Display for BotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registry key: independent sessions may coexist per bot and page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub bot_id: BotId,
    pub page: String,
}

impl SessionKey {
    pub fn new(bot_id: BotId, page: impl Into<String>) -> Self {
        Self {
            bot_id,
            page: page.into(),
        }
    }

    /// The default page for a bot
    pub fn singleton(bot_id: BotId) -> Self {
        Self::new(bot_id, "singleton")
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bot_id, self.page)
    }
}

/// The active streamed exchange: the bot message being filled in and the
/// token that cancels it. Keeping both in one value means one can never be
/// set without the other.
#[derive(Debug, Clone)]
pub struct Generation {
    pub message_id: MessageId,
    pub cancel: CancellationToken,
}

impl PartialEq for Generation {
    fn eq(&self, other: &Self) -> bool {
        self.message_id == other.message_id
    }
}

/// Snapshot of one chat session. Replaced wholesale on every transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Opaque conversation context
    pub conversation: Value,
    pub messages: Ledger,
    pub generation: Option<Generation>,
    /// Free-text input box contents
    pub input: String,
    pub attachment: Option<Attachment>,
}

impl Session {
    pub fn new(greeting: Message) -> Self {
        Self {
            conversation: empty_conversation(),
            messages: Ledger::from(vec![greeting]),
            generation: None,
            input: String::new(),
            attachment: None,
        }
    }

    pub fn generating_message_id(&self) -> Option<&MessageId> {
        self.generation.as_ref().map(|g| &g.message_id)
    }

    pub fn is_generating(&self) -> bool {
        self.generation.is_some()
    }

    /// Whether `id` names the bot message of the active generation
    pub fn is_current(&self, id: &MessageId) -> bool {
        self.generating_message_id() == Some(id)
    }
}

pub(crate) fn empty_conversation() -> Value {
    Value::Object(serde_json::Map::new())
}

/// A bot greeting picked uniformly at random, with a fresh id
pub fn greeting_message() -> Message {
    let text = GREETINGS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or_default();
    Message::bot(MessageId::new(), text)
}

/// Immutable per-session context
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub key: SessionKey,
    pub config: SessionConfig,
}

impl SessionContext {
    pub fn new(key: SessionKey, config: SessionConfig) -> Self {
        Self { key, config }
    }
}

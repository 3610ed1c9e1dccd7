//! Session configuration
//!
//! Replaces open-ended option bags with an explicit structure: every
//! recognized knob is a named field, and per-call overrides are merged
//! field by field.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default origin used when building local proxy URLs for uploaded images
pub const DEFAULT_PROXY_ORIGIN: &str = "http://localhost:3000";

/// Default provider endpoint that proxy image URLs are rewritten to
pub const DEFAULT_PROVIDER_IMAGE_URL: &str = "https://www.bing.com/images/blob";

/// Tone requested from the remote agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStyle {
    Creative,
    #[default]
    Balanced,
    Precise,
}

impl ConversationStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            ConversationStyle::Creative => "creative",
            ConversationStyle::Balanced => "balanced",
            ConversationStyle::Precise => "precise",
        }
    }
}

impl fmt::Display for ConversationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversationStyle {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "creative" => Ok(ConversationStyle::Creative),
            "balanced" => Ok(ConversationStyle::Balanced),
            "precise" => Ok(ConversationStyle::Precise),
            other => Err(ConfigError::InvalidValue {
                key: "CHAT_CONVERSATION_STYLE",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Per-session configuration (immutable for the lifetime of a session)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub conversation_style: ConversationStyle,
    /// Inject the persona preamble as system context on every send
    pub extended_persona: bool,
    /// Never forward the attached image URL to the transport
    pub image_only: bool,
    /// Forward partial answers to the speech relay
    pub speech: bool,
    pub proxy_origin: String,
    pub provider_image_url: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            conversation_style: ConversationStyle::default(),
            extended_persona: false,
            image_only: false,
            speech: false,
            proxy_origin: DEFAULT_PROXY_ORIGIN.to_string(),
            provider_image_url: DEFAULT_PROVIDER_IMAGE_URL.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (environment in production)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let conversation_style = match lookup("CHAT_CONVERSATION_STYLE") {
            Some(v) => v.parse()?,
            None => defaults.conversation_style,
        };

        Ok(Self {
            conversation_style,
            extended_persona: parse_flag("CHAT_EXTENDED_PERSONA", lookup("CHAT_EXTENDED_PERSONA"))?,
            image_only: parse_flag("CHAT_IMAGE_ONLY", lookup("CHAT_IMAGE_ONLY"))?,
            speech: parse_flag("CHAT_SPEECH", lookup("CHAT_SPEECH"))?,
            proxy_origin: lookup("CHAT_PROXY_ORIGIN")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.proxy_origin),
            provider_image_url: lookup("CHAT_PROVIDER_IMAGE_URL")
                .unwrap_or(defaults.provider_image_url),
        })
    }

    /// Merge per-call overrides over the session defaults
    pub fn resolve(&self, overrides: &SendOptions) -> ResolvedOptions {
        ResolvedOptions {
            conversation_style: overrides
                .conversation_style
                .unwrap_or(self.conversation_style),
            extended_persona: overrides.extended_persona.unwrap_or(self.extended_persona),
            image_only: overrides.image_only.unwrap_or(self.image_only),
        }
    }
}

fn parse_flag(key: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    let Some(value) = value else {
        return Ok(false);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { key, value }),
    }
}

/// Per-call overrides accepted by `send_message`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOptions {
    pub conversation_style: Option<ConversationStyle>,
    pub extended_persona: Option<bool>,
    pub image_only: Option<bool>,
}

impl SendOptions {
    pub fn with_style(mut self, style: ConversationStyle) -> Self {
        self.conversation_style = Some(style);
        self
    }
}

/// Options after merging, as handed to the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedOptions {
    pub conversation_style: ConversationStyle,
    pub extended_persona: bool,
    pub image_only: bool,
}

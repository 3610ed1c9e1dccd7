//! Chat session controller
//!
//! Drives a conversation with a streaming chat bot: sends user messages,
//! folds streamed partial answers into a transcript, and handles stop,
//! reset, image attachments and speech relay. Sessions are registered per
//! `(bot id, page)` and observed through published snapshots.

// Library surface: these pedantic lints fire on every public accessor
#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod attachment;
pub mod config;
pub mod message;
pub mod runtime;
pub mod speech;
pub mod state_machine;
pub mod transport;

pub use config::{ConversationStyle, SendOptions, SessionConfig};
pub use runtime::{SessionHandle, SessionRegistry, SessionView};
pub use state_machine::{BotId, SessionKey};

//! Events that can occur in a session

use super::state::greeting_message;
use crate::attachment::Attachment;
use crate::config::SendOptions;
use crate::message::{Message, MessageId};
use crate::transport::{StreamEvent, TransportError, UploadResponse};
use tokio_util::sync::CancellationToken;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserSend {
        text: String,
        options: SendOptions,
        user_message_id: MessageId,
        bot_message_id: MessageId,
        cancel: CancellationToken,
    },
    UserStop,
    Reset {
        greeting: Message,
    },
    SetInput {
        text: String,
    },
    SetAttachment {
        attachment: Option<Attachment>,
    },

    // Transport events
    Stream {
        message_id: MessageId,
        event: StreamEvent,
    },
    /// The transport's send call returned
    StreamFinished {
        message_id: MessageId,
        result: Result<(), TransportError>,
    },

    // Attachment events
    UploadStarted {
        url: String,
    },
    UploadFinished {
        url: String,
        result: Result<UploadResponse, TransportError>,
    },
}

impl Event {
    /// A send with freshly generated message ids and cancellation token
    pub fn user_send(text: impl Into<String>, options: SendOptions) -> Self {
        Self::user_send_into(text, options, MessageId::new())
    }

    /// A send whose answer will be written to `bot_message_id`
    pub fn user_send_into(
        text: impl Into<String>,
        options: SendOptions,
        bot_message_id: MessageId,
    ) -> Self {
        Event::UserSend {
            text: text.into(),
            options,
            user_message_id: MessageId::new(),
            bot_message_id,
            cancel: CancellationToken::new(),
        }
    }

    /// A reset with a randomly chosen greeting
    pub fn reset() -> Self {
        Event::Reset {
            greeting: greeting_message(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::UserSend { .. } => "user_send",
            Event::UserStop => "user_stop",
            Event::Reset { .. } => "reset",
            Event::SetInput { .. } => "set_input",
            Event::SetAttachment { .. } => "set_attachment",
            Event::Stream { .. } => "stream",
            Event::StreamFinished { .. } => "stream_finished",
            Event::UploadStarted { .. } => "upload_started",
            Event::UploadFinished { .. } => "upload_finished",
        }
    }
}

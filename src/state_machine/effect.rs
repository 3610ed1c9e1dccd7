//! Effects produced by state transitions

use crate::config::ConversationStyle;
use crate::message::{Message, MessageId};
use crate::transport::SendRequest;
use tokio_util::sync::CancellationToken;

/// Effects to be executed after state transition
#[derive(Debug, Clone)]
pub enum Effect {
    /// Signal a generation's cancellation token
    CancelGeneration {
        message_id: MessageId,
        cancel: CancellationToken,
    },

    /// Clear the speech relay's spoken-so-far cursor
    ResetSpeech,

    /// Forward the cumulative answer text to the speech relay
    Speak { text: String },

    /// Stop any speech immediately
    AbortSpeech,

    /// Open a streamed exchange with the transport (spawns as background task)
    StartGeneration {
        message_id: MessageId,
        request: SendRequest,
    },

    /// Hand the transcript to the history collaborator
    RecordHistory { messages: Vec<Message> },

    /// Upload an image (spawns as background task)
    UploadImage {
        url: String,
        style: ConversationStyle,
    },

    /// Ask the transport to forget the remote conversation
    ResetTransport,
}

impl Effect {
    pub fn cancel_generation(message_id: &MessageId, cancel: &CancellationToken) -> Self {
        Effect::CancelGeneration {
            message_id: message_id.clone(),
            cancel: cancel.clone(),
        }
    }
}

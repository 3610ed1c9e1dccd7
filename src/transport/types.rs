//! Request/event types exchanged with a bot transport

use crate::config::ResolvedOptions;
use crate::message::{ChatError, MessageId, SourceAttribution, Throttling};
use crate::state_machine::Event;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Partial answer delivered while a generation streams
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerUpdate {
    /// Full answer text so far (not a delta)
    pub text: String,
    pub progress_text: Option<String>,
    pub throttling: Option<Throttling>,
    pub source_attributions: Vec<SourceAttribution>,
    pub suggested_responses: Vec<String>,
}

impl AnswerUpdate {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_progress(mut self, progress: impl Into<String>) -> Self {
        self.progress_text = Some(progress.into());
        self
    }
}

/// Tagged event emitted by the transport during one generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    UpdateAnswer(AnswerUpdate),
    Error(ChatError),
    Done,
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Error(_) | StreamEvent::Done)
    }
}

/// Everything the transport needs to run one generation
#[derive(Debug, Clone)]
pub struct SendRequest {
    /// Raw user text, without the inline image reference
    pub prompt: String,
    pub image_url: Option<String>,
    /// System preamble, only in extended persona mode
    pub context: Option<String>,
    pub options: ResolvedOptions,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadResponse {
    pub blob_id: Option<String>,
}

/// Callback channel handed to the transport for one generation.
///
/// Events are tagged with the generation's bot message id. Once the
/// generation is cancelled the sink drops everything it is given.
#[derive(Debug, Clone)]
pub struct StreamSink {
    message_id: MessageId,
    cancel: CancellationToken,
    event_tx: mpsc::Sender<Event>,
}

impl StreamSink {
    pub(crate) fn new(
        message_id: MessageId,
        cancel: CancellationToken,
        event_tx: mpsc::Sender<Event>,
    ) -> Self {
        Self {
            message_id,
            cancel,
            event_tx,
        }
    }

    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the generation has been cancelled
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// Deliver an event to the session. Returns `false` when the event was
    /// dropped (generation cancelled or session gone).
    pub async fn emit(&self, event: StreamEvent) -> bool {
        if self.cancel.is_cancelled() {
            tracing::debug!(message_id = %self.message_id, "Dropping event after cancellation");
            return false;
        }
        self.event_tx
            .send(Event::Stream {
                message_id: self.message_id.clone(),
                event,
            })
            .await
            .is_ok()
    }
}

//! Bot transport abstraction
//!
//! The transport is whatever actually talks to the remote agent. The session
//! only sees this narrow interface.

mod echo;
mod error;
mod types;

pub use echo::EchoTransport;
pub use error::{TransportError, TransportErrorKind};
pub use types::*;

use crate::config::ConversationStyle;
use async_trait::async_trait;
use std::sync::Arc;

/// Interface to the remote conversational agent
#[async_trait]
pub trait BotTransport: Send + Sync {
    /// Run one streamed exchange.
    ///
    /// Emits zero or more `UpdateAnswer` events followed by at most one
    /// terminal `Error`/`Done` through `sink`, and should stop emitting once
    /// `request.cancel` is triggered.
    async fn send_message(&self, request: SendRequest, sink: StreamSink)
        -> Result<(), TransportError>;

    /// Upload an image, returning the provider blob id on success
    async fn upload_image(
        &self,
        url: &str,
        style: ConversationStyle,
    ) -> Result<UploadResponse, TransportError>;

    /// Forget the remote conversation context
    async fn reset_conversation(&self);
}

#[async_trait]
impl<T: BotTransport + ?Sized> BotTransport for Arc<T> {
    async fn send_message(
        &self,
        request: SendRequest,
        sink: StreamSink,
    ) -> Result<(), TransportError> {
        (**self).send_message(request, sink).await
    }

    async fn upload_image(
        &self,
        url: &str,
        style: ConversationStyle,
    ) -> Result<UploadResponse, TransportError> {
        (**self).upload_image(url, style).await
    }

    async fn reset_conversation(&self) {
        (**self).reset_conversation().await;
    }
}

/// Logging wrapper for transports
pub struct LoggingTransport {
    inner: Arc<dyn BotTransport>,
    bot_id: String,
}

impl LoggingTransport {
    pub fn new(inner: Arc<dyn BotTransport>, bot_id: impl Into<String>) -> Self {
        Self {
            inner,
            bot_id: bot_id.into(),
        }
    }
}

#[async_trait]
impl BotTransport for LoggingTransport {
    async fn send_message(
        &self,
        request: SendRequest,
        sink: StreamSink,
    ) -> Result<(), TransportError> {
        let start = std::time::Instant::now();
        let message_id = sink.message_id().clone();
        let style = request.options.conversation_style;
        let has_image = request.image_url.is_some();
        let result = self.inner.send_message(request, sink).await;
        let duration = start.elapsed();

        match &result {
            Ok(()) => {
                tracing::info!(
                    bot = %self.bot_id,
                    message_id = %message_id,
                    style = %style,
                    has_image,
                    duration_ms = %duration.as_millis(),
                    "Bot exchange finished"
                );
            }
            Err(e) => {
                tracing::error!(
                    bot = %self.bot_id,
                    message_id = %message_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "Bot exchange failed"
                );
            }
        }

        result
    }

    async fn upload_image(
        &self,
        url: &str,
        style: ConversationStyle,
    ) -> Result<UploadResponse, TransportError> {
        let start = std::time::Instant::now();
        let result = self.inner.upload_image(url, style).await;
        match &result {
            Ok(response) => tracing::info!(
                bot = %self.bot_id,
                duration_ms = %start.elapsed().as_millis(),
                blob_id = ?response.blob_id,
                "Image upload finished"
            ),
            Err(e) => tracing::warn!(
                bot = %self.bot_id,
                duration_ms = %start.elapsed().as_millis(),
                error = %e.message,
                "Image upload failed"
            ),
        }
        result
    }

    async fn reset_conversation(&self) {
        tracing::info!(bot = %self.bot_id, "Resetting remote conversation");
        self.inner.reset_conversation().await;
    }
}

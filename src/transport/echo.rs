//! Local transport that streams the prompt back word by word

use super::{AnswerUpdate, BotTransport, SendRequest, StreamEvent, StreamSink, TransportError, UploadResponse};
use crate::config::ConversationStyle;
use async_trait::async_trait;
use std::time::Duration;

pub struct EchoTransport {
    delay: Duration,
}

impl EchoTransport {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for EchoTransport {
    fn default() -> Self {
        Self::new(Duration::from_millis(80))
    }
}

#[async_trait]
impl BotTransport for EchoTransport {
    async fn send_message(
        &self,
        request: SendRequest,
        sink: StreamSink,
    ) -> Result<(), TransportError> {
        let mut answer = format!("[{}] ", request.options.conversation_style);
        if request.image_url.is_some() {
            answer.push_str("(image received) ");
        }

        sink.emit(StreamEvent::UpdateAnswer(
            AnswerUpdate::text(answer.clone()).with_progress("Generating answers for you..."),
        ))
        .await;

        for word in request.prompt.split_whitespace() {
            tokio::select! {
                biased;

                () = request.cancel.cancelled() => {
                    tracing::debug!("Echo stream cancelled");
                    return Ok(());
                }

                () = tokio::time::sleep(self.delay) => {}
            }
            answer.push_str(word);
            answer.push(' ');
            if !sink.emit(StreamEvent::UpdateAnswer(AnswerUpdate::text(answer.trim_end()))).await {
                return Ok(());
            }
        }

        sink.emit(StreamEvent::Done).await;
        Ok(())
    }

    async fn upload_image(
        &self,
        url: &str,
        _style: ConversationStyle,
    ) -> Result<UploadResponse, TransportError> {
        if url.trim().is_empty() {
            return Ok(UploadResponse { blob_id: None });
        }
        Ok(UploadResponse {
            blob_id: Some(uuid::Uuid::new_v4().simple().to_string()),
        })
    }

    async fn reset_conversation(&self) {}
}

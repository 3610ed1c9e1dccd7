//! Session runtime executor

use super::signal::ResetListener;
use super::traits::{HistorySnapshot, HistoryStore};
use super::{SessionHandle, SessionView};
use crate::speech::{SpeechEngine, SpeechRelay};
use crate::state_machine::{transition, Effect, Event, Session, SessionContext};
use crate::transport::{BotTransport, StreamSink};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Generic session runtime that can work with any transport and history store.
///
/// One runtime task owns one `Session`; every mutation goes through
/// `transition`, one event at a time.
pub struct SessionRuntime<T, H>
where
    T: BotTransport + 'static,
    H: HistoryStore + 'static,
{
    context: SessionContext,
    state: Session,
    transport: Arc<T>,
    history: Arc<H>,
    speech: SpeechRelay,
    event_rx: mpsc::Receiver<Event>,
    /// Weak so that the runtime stops once every handle is dropped
    event_tx: mpsc::WeakSender<Event>,
    view_tx: watch::Sender<SessionView>,
    reset_listener: ResetListener,
}

impl<T, H> SessionRuntime<T, H>
where
    T: BotTransport + 'static,
    H: HistoryStore + 'static,
{
    /// Build a runtime with a fresh session and return it with its handle.
    /// The caller drives it with `run`.
    pub fn new(
        context: SessionContext,
        transport: Arc<T>,
        history: Arc<H>,
        speech: Arc<dyn SpeechEngine>,
        reset_listener: ResetListener,
    ) -> (Self, SessionHandle) {
        let state = Session::new(crate::state_machine::state::greeting_message());
        let speech = SpeechRelay::new(speech);
        let (event_tx, event_rx) = mpsc::channel(64);
        let (view_tx, view_rx) = watch::channel(SessionView::of(&context, &state, &speech));

        let handle = SessionHandle::new(
            context.key.clone(),
            event_tx.clone(),
            view_rx,
            transport.clone(),
        );

        let runtime = Self {
            context,
            state,
            transport,
            history,
            speech,
            event_rx,
            event_tx: event_tx.downgrade(),
            view_tx,
            reset_listener,
        };
        (runtime, handle)
    }

    /// Spawn the runtime on the current tokio runtime
    pub fn spawn(
        context: SessionContext,
        transport: Arc<T>,
        history: Arc<H>,
        speech: Arc<dyn SpeechEngine>,
        reset_listener: ResetListener,
    ) -> (SessionHandle, tokio::task::JoinHandle<()>) {
        let (runtime, handle) = Self::new(context, transport, history, speech, reset_listener);
        let task = tokio::spawn(runtime.run());
        (handle, task)
    }

    pub async fn run(mut self) {
        tracing::info!(session = %self.context.key, "Starting session runtime");

        // Process events in a loop - no recursion. The channel closes once all
        // handles and in-flight background tasks are gone.
        loop {
            tokio::select! {
                event = self.event_rx.recv() => match event {
                    Some(event) => self.process_event(event).await,
                    None => break,
                },
                () = self.reset_listener.claimed() => {
                    tracing::info!(session = %self.context.key, "Reset requested externally");
                    self.process_event(Event::reset()).await;
                }
            }
        }

        tracing::info!(session = %self.context.key, "Session runtime stopped");
    }

    async fn process_event(&mut self, event: Event) {
        let kind = event.kind();

        // Pure state transition
        let result = match transition(&self.state, &self.context, event) {
            Ok(r) => r,
            Err(e) if e.is_stale() => {
                tracing::debug!(session = %self.context.key, event = kind, "{e}");
                return;
            }
            Err(e) => {
                tracing::warn!(session = %self.context.key, event = kind, error = %e, "Rejected event");
                return;
            }
        };

        self.state = result.new_state;

        for effect in result.effects {
            self.execute_effect(effect).await;
        }

        self.publish();
    }

    /// Push the current snapshot to observers
    fn publish(&self) {
        let view = SessionView::of(&self.context, &self.state, &self.speech);
        self.view_tx.send_replace(view);
    }

    /// Execute an effect
    async fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::CancelGeneration { message_id, cancel } => {
                tracing::info!(session = %self.context.key, message_id = %message_id, "Cancelling generation");
                cancel.cancel();
            }

            Effect::ResetSpeech => self.speech.reset(),

            Effect::Speak { text } => self.speech.speak(&text),

            Effect::AbortSpeech => self.speech.abort(),

            Effect::StartGeneration {
                message_id,
                request,
            } => {
                let Some(event_tx) = self.event_tx.upgrade() else {
                    tracing::debug!(session = %self.context.key, "No handles left, not starting generation");
                    return;
                };
                let transport = self.transport.clone();
                let sink = StreamSink::new(message_id.clone(), request.cancel.clone(), event_tx.clone());
                let session = self.context.key.clone();

                tokio::spawn(async move {
                    tracing::info!(session = %session, message_id = %message_id, "Starting generation (background)");

                    // Whatever the transport did, report that the call returned;
                    // the state machine decides if that still matters.
                    let result = transport.send_message(request, sink).await;
                    if let Err(e) = &result {
                        tracing::warn!(session = %session, message_id = %message_id, error = %e, "Send failed");
                    }
                    let _ = event_tx
                        .send(Event::StreamFinished { message_id, result })
                        .await;
                });
            }

            Effect::RecordHistory { messages } => {
                self.history
                    .record(HistorySnapshot {
                        key: self.context.key.clone(),
                        messages,
                    })
                    .await;
            }

            Effect::UploadImage { url, style } => {
                let Some(event_tx) = self.event_tx.upgrade() else {
                    return;
                };
                let transport = self.transport.clone();

                tokio::spawn(async move {
                    tracing::info!(url = %url, "Uploading image (background)");
                    let result = transport.upload_image(&url, style).await;
                    let _ = event_tx.send(Event::UploadFinished { url, result }).await;
                });
            }

            Effect::ResetTransport => {
                self.transport.reset_conversation().await;
            }
        }
    }
}

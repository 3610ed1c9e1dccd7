//! Runtime for executing chat sessions
//!
//! Each session runs as its own task. The UI talks to it through a
//! `SessionHandle` and re-reads the published `SessionView`.

mod executor;
pub mod signal;
pub mod traits;


pub use executor::SessionRuntime;
pub use signal::{ResetListener, ResetSignal};
pub use traits::*;

use crate::attachment::Attachment;
use crate::config::{SendOptions, SessionConfig};
use crate::message::{Message, MessageId};
use crate::speech::{SpeechEngine, SpeechRelay};
use crate::state_machine::{BotId, Event, Session, SessionContext, SessionKey};
use crate::transport::{BotTransport, LoggingTransport};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, RwLock};
use tokio_stream::wrappers::WatchStream;

/// Type alias for production runtime with concrete implementations
pub type ProductionRuntime = SessionRuntime<Arc<dyn BotTransport>, Arc<dyn HistoryStore>>;

/// Read view of a session as the UI sees it
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub bot_id: BotId,
    pub is_speaking: bool,
    pub messages: Vec<Message>,
    pub input: String,
    pub generating: bool,
    pub generating_message_id: Option<MessageId>,
    pub attachment: Option<Attachment>,
}

impl SessionView {
    pub(crate) fn of(context: &SessionContext, state: &Session, speech: &SpeechRelay) -> Self {
        Self {
            bot_id: context.key.bot_id.clone(),
            is_speaking: speech.is_speaking(),
            messages: state.messages.to_vec(),
            input: state.input.clone(),
            generating: state.is_generating(),
            generating_message_id: state.generating_message_id().cloned(),
            attachment: state.attachment.clone(),
        }
    }

    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Handle to interact with a running session.
///
/// Operations never fail: if the runtime is gone the request is logged and
/// dropped, and every other failure shows up in the view.
#[derive(Clone)]
pub struct SessionHandle {
    key: SessionKey,
    event_tx: mpsc::Sender<Event>,
    view_rx: watch::Receiver<SessionView>,
    bot: Arc<dyn BotTransport>,
}

impl SessionHandle {
    pub(crate) fn new(
        key: SessionKey,
        event_tx: mpsc::Sender<Event>,
        view_rx: watch::Receiver<SessionView>,
        bot: Arc<dyn BotTransport>,
    ) -> Self {
        Self {
            key,
            event_tx,
            view_rx,
            bot,
        }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// The transport this session talks through
    pub fn bot(&self) -> &Arc<dyn BotTransport> {
        &self.bot
    }

    async fn dispatch(&self, event: Event) {
        let kind = event.kind();
        if self.event_tx.send(event).await.is_err() {
            tracing::warn!(session = %self.key, event = kind, "Session runtime is gone, dropping event");
        }
    }

    /// Send a message, returning the id of the bot message that will hold
    /// the answer
    pub async fn send_message(&self, text: impl Into<String>, options: SendOptions) -> MessageId {
        let bot_message_id = MessageId::new();
        self.dispatch(Event::user_send_into(text, options, bot_message_id.clone()))
            .await;
        bot_message_id
    }

    pub async fn stop_generating(&self) {
        self.dispatch(Event::UserStop).await;
    }

    pub async fn reset_conversation(&self) {
        self.dispatch(Event::reset()).await;
    }

    pub async fn upload_image(&self, url: impl Into<String>) {
        self.dispatch(Event::UploadStarted { url: url.into() }).await;
    }

    pub async fn set_input(&self, text: impl Into<String>) {
        self.dispatch(Event::SetInput { text: text.into() }).await;
    }

    pub async fn set_attachment(&self, attachment: Option<Attachment>) {
        self.dispatch(Event::SetAttachment { attachment }).await;
    }

    /// Latest published snapshot
    pub fn view(&self) -> SessionView {
        self.view_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view_rx.clone()
    }

    /// Stream of snapshots, starting with the current one
    pub fn updates(&self) -> WatchStream<SessionView> {
        WatchStream::new(self.view_rx.clone())
    }

    /// Wait until the view satisfies `predicate`, or give up after `timeout`
    pub async fn wait_for(
        &self,
        timeout: Duration,
        mut predicate: impl FnMut(&SessionView) -> bool,
    ) -> Option<SessionView> {
        let mut rx = self.view_rx.clone();
        let waited = tokio::time::timeout(timeout, rx.wait_for(|v| predicate(v))).await;
        match waited {
            Ok(Ok(view)) => Some(view.clone()),
            _ => None,
        }
    }
}

/// Creates the transport for a bot
pub trait TransportFactory: Send + Sync {
    fn connect(&self, bot_id: &BotId) -> Arc<dyn BotTransport>;
}

impl<F> TransportFactory for F
where
    F: Fn(&BotId) -> Arc<dyn BotTransport> + Send + Sync,
{
    fn connect(&self, bot_id: &BotId) -> Arc<dyn BotTransport> {
        self(bot_id)
    }
}

/// Registry of all sessions, keyed by `(bot id, page)`.
///
/// Sessions are created on first access. The registry keeps a handle to each,
/// so a session runtime lives as long as the registry.
pub struct SessionRegistry {
    config: SessionConfig,
    transports: Arc<dyn TransportFactory>,
    history: Arc<dyn HistoryStore>,
    speech: Arc<dyn SpeechEngine>,
    reset_signal: ResetSignal,
    sessions: RwLock<HashMap<SessionKey, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new(
        config: SessionConfig,
        transports: Arc<dyn TransportFactory>,
        history: Arc<dyn HistoryStore>,
        speech: Arc<dyn SpeechEngine>,
    ) -> Self {
        Self {
            config,
            transports,
            history,
            speech,
            reset_signal: ResetSignal::new(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Flag shared by every session in this registry
    pub fn reset_signal(&self) -> &ResetSignal {
        &self.reset_signal
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Get or create the session for `key`
    pub async fn get_or_create(&self, key: SessionKey) -> SessionHandle {
        // Check if already running
        {
            let sessions = self.sessions.read().await;
            if let Some(handle) = sessions.get(&key) {
                return handle.clone();
            }
        }

        let mut sessions = self.sessions.write().await;
        // Another caller may have created it while we waited for the lock
        if let Some(handle) = sessions.get(&key) {
            return handle.clone();
        }

        let transport: Arc<dyn BotTransport> = Arc::new(LoggingTransport::new(
            self.transports.connect(&key.bot_id),
            key.bot_id.as_str(),
        ));
        let context = SessionContext::new(key.clone(), self.config.clone());

        let (handle, _task) = ProductionRuntime::spawn(
            context,
            Arc::new(transport),
            Arc::new(self.history.clone()),
            self.speech.clone(),
            self.reset_signal.listen(),
        );
        tracing::info!(session = %key, "Session created");

        sessions.insert(key, handle.clone());
        handle
    }

    pub async fn get(&self, key: &SessionKey) -> Option<SessionHandle> {
        self.sessions.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

//! Process-wide "reset requested" flag
//!
//! An outside party (navigation, a hash change, an admin command) raises the
//! flag. Every session runtime listening at that moment resets exactly once
//! for the request, and the flag is lowered by the first one to act. Each
//! request bumps an epoch, so a listener never acts on the same request twice
//! and a lowered flag never triggers a reset loop.

use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ResetState {
    epoch: u64,
    pending: bool,
}

#[derive(Debug, Clone)]
pub struct ResetSignal {
    tx: Arc<watch::Sender<ResetState>>,
}

impl ResetSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ResetState::default());
        Self { tx: Arc::new(tx) }
    }

    /// Raise the flag. Requests made before a listener acts are coalesced.
    pub fn request(&self) {
        self.tx.send_modify(|state| {
            state.epoch += 1;
            state.pending = true;
        });
    }

    pub fn is_requested(&self) -> bool {
        self.tx.borrow().pending
    }

    /// Subscribe a new listener. A request still pending is delivered to it.
    pub fn listen(&self) -> ResetListener {
        let state = *self.tx.borrow();
        let seen = if state.pending {
            state.epoch.saturating_sub(1)
        } else {
            state.epoch
        };
        ResetListener {
            tx: self.tx.clone(),
            rx: self.tx.subscribe(),
            seen,
        }
    }
}

impl Default for ResetSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// One observer of the reset flag
#[derive(Debug)]
pub struct ResetListener {
    tx: Arc<watch::Sender<ResetState>>,
    rx: watch::Receiver<ResetState>,
    /// Last epoch this listener acted on
    seen: u64,
}

impl ResetListener {
    /// Consume a request this listener has not acted on yet, lowering the
    /// flag. Returns whether there was one.
    pub fn try_claim(&mut self) -> bool {
        let epoch = self.rx.borrow_and_update().epoch;
        if epoch <= self.seen {
            return false;
        }
        self.seen = epoch;
        self.tx
            .send_if_modified(|state| std::mem::replace(&mut state.pending, false));
        true
    }

    /// Wait until there is a request for this listener to act on.
    ///
    /// Cancel-safe: dropping the future never loses a request.
    pub async fn claimed(&mut self) {
        loop {
            if self.try_claim() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

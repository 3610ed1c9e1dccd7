//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::message::Message;
use crate::state_machine::SessionKey;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Transcript handed to the history collaborator when a generation completes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySnapshot {
    pub key: SessionKey,
    pub messages: Vec<Message>,
}

/// Persisted-history collaborator. Fire-and-forget: failures are the
/// store's own business.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn record(&self, snapshot: HistorySnapshot);
}

#[async_trait]
impl<T: HistoryStore + ?Sized> HistoryStore for Arc<T> {
    async fn record(&self, snapshot: HistorySnapshot) {
        (**self).record(snapshot).await;
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Keeps the latest transcript per session in memory
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    latest: Mutex<HashMap<SessionKey, Vec<Message>>>,
    records: Mutex<usize>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent transcript recorded for `key`
    pub fn latest(&self, key: &SessionKey) -> Option<Vec<Message>> {
        self.latest
            .lock()
            .ok()
            .and_then(|latest| latest.get(key).cloned())
    }

    /// Number of snapshots recorded so far
    pub fn record_count(&self) -> usize {
        self.records.lock().map(|n| *n).unwrap_or_default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn record(&self, snapshot: HistorySnapshot) {
        tracing::debug!(
            session = %snapshot.key,
            messages = snapshot.messages.len(),
            "Recording history"
        );
        if let Ok(mut latest) = self.latest.lock() {
            latest.insert(snapshot.key, snapshot.messages);
        }
        if let Ok(mut records) = self.records.lock() {
            *records += 1;
        }
    }
}

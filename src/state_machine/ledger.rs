//! Ordered transcript of a session

use crate::message::{Message, MessageId};
use serde::{Deserialize, Serialize};

/// Append-only message sequence; the only in-place change allowed is a patch
/// of an existing message, addressed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger(Vec<Message>);

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.0.push(message);
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.0.iter().find(|m| &m.id == id)
    }

    /// Apply `update` to the message with `id`. Returns `false` if absent.
    pub(crate) fn patch(&mut self, id: &MessageId, update: impl FnOnce(&mut Message)) -> bool {
        match self.0.iter_mut().find(|m| &m.id == id) {
            Some(message) => {
                update(message);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.0.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<Message> {
        self.0.clone()
    }
}

impl From<Vec<Message>> for Ledger {
    fn from(messages: Vec<Message>) -> Self {
        Self(messages)
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

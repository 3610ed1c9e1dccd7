//! Core session state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod ledger;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use ledger::Ledger;
pub use state::{BotId, Generation, Session, SessionContext, SessionKey};
pub use transition::{transition, TransitionError, TransitionResult, CANCELLED_TEXT};

//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use crate::attachment::Attachment;
use crate::config::{SendOptions, SessionConfig};
use crate::message::{Author, ChatError, ErrorCode, Message, MessageId};
use crate::transport::{AnswerUpdate, StreamEvent, TransportError, UploadResponse};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> SessionContext {
    SessionContext::new(
        SessionKey::singleton(BotId::default()),
        SessionConfig {
            speech: true,
            ..SessionConfig::default()
        },
    )
}

fn idle() -> Session {
    Session::new(Message::bot(MessageId::from("greeting"), "Hello"))
}

/// Abstract event; stream events are bound to the generation that is
/// current when they are applied (or to a stale id).
#[derive(Debug, Clone)]
enum Step {
    Send(String),
    Stop,
    Reset,
    Update(String),
    StaleUpdate(String),
    Error,
    Done,
    TransportFailed,
    StreamClosed,
    UploadStart(String),
    UploadFinish(String, Option<String>),
}

fn arb_text() -> impl Strategy<Value = String> {
    "[a-z ]{0,12}"
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        arb_text().prop_map(Step::Send),
        Just(Step::Stop),
        Just(Step::Reset),
        arb_text().prop_map(Step::Update),
        arb_text().prop_map(Step::Update),
        arb_text().prop_map(Step::Update),
        arb_text().prop_map(Step::StaleUpdate),
        Just(Step::Error),
        Just(Step::Done),
        Just(Step::TransportFailed),
        Just(Step::StreamClosed),
        "[a-z]{1,6}".prop_map(Step::UploadStart),
        ("[a-z]{1,6}", proptest::option::of("[a-z0-9]{1,6}"))
            .prop_map(|(url, blob)| Step::UploadFinish(url, blob)),
    ]
}

fn current_or_stale(state: &Session) -> MessageId {
    state
        .generating_message_id()
        .cloned()
        .unwrap_or_else(|| MessageId::from("stale"))
}

fn to_event(state: &Session, step: Step) -> Event {
    match step {
        Step::Send(text) => Event::user_send(text, SendOptions::default()),
        Step::Stop => Event::UserStop,
        Step::Reset => Event::reset(),
        Step::Update(text) => Event::Stream {
            message_id: current_or_stale(state),
            event: StreamEvent::UpdateAnswer(AnswerUpdate::text(text)),
        },
        Step::StaleUpdate(text) => Event::Stream {
            message_id: MessageId::from("stale"),
            event: StreamEvent::UpdateAnswer(AnswerUpdate::text(text)),
        },
        Step::Error => Event::Stream {
            message_id: current_or_stale(state),
            event: StreamEvent::Error(ChatError::new(ErrorCode::Unknown, "boom")),
        },
        Step::Done => Event::Stream {
            message_id: current_or_stale(state),
            event: StreamEvent::Done,
        },
        Step::TransportFailed => Event::StreamFinished {
            message_id: current_or_stale(state),
            result: Err(TransportError::network("reset")),
        },
        Step::StreamClosed => Event::StreamFinished {
            message_id: current_or_stale(state),
            result: Ok(()),
        },
        Step::UploadStart(url) => Event::UploadStarted { url },
        Step::UploadFinish(url, blob_id) => Event::UploadFinished {
            url,
            result: Ok(UploadResponse { blob_id }),
        },
    }
}

/// Apply a step; rejected events leave the state unchanged
fn step(state: &Session, ctx: &SessionContext, step: Step) -> (Session, Vec<Effect>) {
    let event = to_event(state, step);
    match transition(state, ctx, event) {
        Ok(result) => (result.new_state, result.effects),
        Err(e) => {
            assert!(e.is_stale(), "unexpected transition error: {e}");
            (state.clone(), vec![])
        }
    }
}

// ============================================================================
// State Validity Checkers
// ============================================================================

fn is_valid_state(state: &Session) -> bool {
    // The generating id always names a bot message in the transcript
    if let Some(id) = state.generating_message_id() {
        match state.messages.get(id) {
            Some(m) if m.author == Author::Bot => {}
            _ => return false,
        }
    }
    // Message ids are unique
    let mut ids: Vec<_> = state.messages.iter().map(|m| m.id.clone()).collect();
    let len = ids.len();
    ids.sort();
    ids.dedup();
    ids.len() == len && !state.messages.is_empty()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: any sequence of events leaves a consistent snapshot, and
    // a generation is active exactly when a send opened one that has not ended
    #[test]
    fn prop_transitions_preserve_validity(steps in proptest::collection::vec(arb_step(), 0..30)) {
        let ctx = test_context();
        let mut state = idle();

        for s in steps {
            let (next, effects) = step(&state, &ctx, s);
            prop_assert!(is_valid_state(&next), "Invalid state: {:?}", next);

            let started = effects.iter().any(|e| matches!(e, Effect::StartGeneration { .. }));
            if started {
                prop_assert!(next.is_generating());
            }
            state = next;
        }
    }

    // Invariant 2: bot text length never decreases within one generation
    #[test]
    fn prop_text_is_monotonic(updates in proptest::collection::vec(arb_text(), 1..20)) {
        let ctx = test_context();
        let (mut state, _) = step(&idle(), &ctx, Step::Send("hi".to_string()));
        let id = state.generating_message_id().cloned().unwrap();
        let mut last_len = 0;

        for text in updates {
            let (next, _) = step(&state, &ctx, Step::Update(text));
            let len = next.messages.get(&id).unwrap().text.chars().count();
            prop_assert!(len >= last_len, "text shrank from {} to {}", last_len, len);
            last_len = len;
            state = next;
        }
    }

    // Invariant 3: only the current generation's message is ever patched
    #[test]
    fn prop_only_current_message_changes(
        steps in proptest::collection::vec(
            prop_oneof![
                arb_text().prop_map(Step::Update),
                arb_text().prop_map(Step::StaleUpdate),
                Just(Step::Error),
                Just(Step::Done),
            ],
            0..15,
        )
    ) {
        let ctx = test_context();
        let (state, _) = step(&idle(), &ctx, Step::Send("one".to_string()));
        let (state, _) = step(&state, &ctx, Step::Update("first answer".to_string()));
        let (mut state, _) = step(&state, &ctx, Step::Send("two".to_string()));
        let frozen: Vec<Message> = state.messages.as_slice()[..state.messages.len() - 1].to_vec();

        for s in steps {
            state = step(&state, &ctx, s).0;
            prop_assert_eq!(&state.messages.as_slice()[..frozen.len()], frozen.as_slice());
        }
    }

    // Invariant 4: stop is idempotent
    #[test]
    fn prop_stop_idempotent(steps in proptest::collection::vec(arb_step(), 0..15)) {
        let ctx = test_context();
        let mut state = idle();
        for s in steps {
            state = step(&state, &ctx, s).0;
        }

        let (once, _) = step(&state, &ctx, Step::Stop);
        let (twice, effects) = step(&once, &ctx, Step::Stop);
        prop_assert_eq!(&once, &twice);
        prop_assert!(effects.is_empty());
        prop_assert!(!once.is_generating());
    }

    // Invariant 5: reset always yields a single bot greeting and no generation
    #[test]
    fn prop_reset_law(steps in proptest::collection::vec(arb_step(), 0..15)) {
        let ctx = test_context();
        let mut state = idle();
        for s in steps {
            state = step(&state, &ctx, s).0;
        }

        let (reset, _) = step(&state, &ctx, Step::Reset);
        prop_assert_eq!(reset.messages.len(), 1);
        prop_assert_eq!(reset.messages.as_slice()[0].author, Author::Bot);
        prop_assert!(!reset.is_generating());
        prop_assert_eq!(reset.conversation, serde_json::json!({}));
    }

    // Invariant 6: every terminal path ends the generation; failures leave an error
    #[test]
    fn prop_terminal_paths_clear_generation(
        updates in proptest::collection::vec(arb_text(), 0..5),
        terminal in prop_oneof![
            Just(Step::Error),
            Just(Step::Done),
            Just(Step::TransportFailed),
            Just(Step::StreamClosed),
        ]
    ) {
        let ctx = test_context();
        let (mut state, _) = step(&idle(), &ctx, Step::Send("hi".to_string()));
        let id = state.generating_message_id().cloned().unwrap();
        for text in updates {
            state = step(&state, &ctx, Step::Update(text)).0;
        }

        let failed = !matches!(terminal, Step::Done);
        let (next, _) = step(&state, &ctx, terminal);
        prop_assert!(!next.is_generating());
        if failed {
            prop_assert!(next.messages.get(&id).unwrap().error.is_some());
        }
    }

    // Invariant 7: the attachment slot reflects the last completed upload
    #[test]
    fn prop_upload_last_completion_wins(
        first_blob in proptest::option::of("[a-z0-9]{1,6}"),
        second_blob in proptest::option::of("[a-z0-9]{1,6}"),
    ) {
        let ctx = test_context();
        let state = idle();
        let (state, _) = step(&state, &ctx, Step::UploadStart("one".to_string()));
        let (state, _) = step(&state, &ctx, Step::UploadStart("two".to_string()));
        prop_assert_eq!(state.attachment.clone(), Some(Attachment::loading("two")));

        // Second finishes first, first finishes last
        let (state, _) = step(&state, &ctx, Step::UploadFinish("two".to_string(), second_blob));
        let (state, _) = step(&state, &ctx, Step::UploadFinish("one".to_string(), first_blob.clone()));

        let expected = match first_blob {
            Some(id) => Attachment::loaded(format!("http://localhost:3000/api/blob.jpg?bcid={id}")),
            None => Attachment::failed("one"),
        };
        prop_assert_eq!(state.attachment, Some(expected));
    }
}

#[test]
fn test_greeting_set_is_nonempty() {
    assert!(!GREETINGS.is_empty());
    assert_eq!(CANCELLED_TEXT, "Cancelled");
}

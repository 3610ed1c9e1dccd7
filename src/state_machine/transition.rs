//! Pure state transition function
//!
//! Every user action and streamed event is applied as one read-modify-write
//! step: the current snapshot goes in, a new snapshot and a list of effects
//! come out. No I/O happens here.

use super::state::{empty_conversation, Generation, PERSONA_PREAMBLE};
use super::{Effect, Event, Session, SessionContext};
use crate::attachment::{self, Attachment};
use crate::config::SendOptions;
use crate::message::{ChatError, ErrorCode, Message, MessageId};
use crate::transport::{AnswerUpdate, SendRequest, StreamEvent, TransportError, UploadResponse};
use crate::state_machine::ledger::Ledger;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Text given to a bot message cancelled before anything arrived
pub const CANCELLED_TEXT: &str = "Cancelled";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: Session,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: Session) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Events that cannot be applied to the current snapshot
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Event for message {message_id} does not belong to the active generation")]
    StaleGeneration { message_id: MessageId },
    #[error("Generating message {0} is missing from the transcript")]
    MissingMessage(MessageId),
}

impl TransitionError {
    /// Stale events are expected after cancellation and are not worth a warning
    pub fn is_stale(&self) -> bool {
        matches!(self, TransitionError::StaleGeneration { .. })
    }
}

/// Pure transition function
pub fn transition(
    state: &Session,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match event {
        Event::UserSend {
            text,
            options,
            user_message_id,
            bot_message_id,
            cancel,
        } => Ok(send(
            state,
            context,
            SendArgs {
                text,
                options,
                user_message_id,
                bot_message_id,
                cancel,
            },
        )),

        Event::UserStop => {
            let mut next = state.clone();
            let effects = stop_active(&mut next).into_iter();
            Ok(TransitionResult::new(next).with_effects(effects))
        }

        Event::Reset { greeting } => {
            let mut next = state.clone();
            let cancel = next
                .generation
                .take()
                .map(|g| Effect::cancel_generation(&g.message_id, &g.cancel));
            next.conversation = empty_conversation();
            next.messages = Ledger::from(vec![greeting]);

            Ok(TransitionResult::new(next)
                .with_effect(Effect::ResetTransport)
                .with_effect(Effect::AbortSpeech)
                .with_effects(cancel))
        }

        Event::SetInput { text } => {
            let mut next = state.clone();
            next.input = text;
            Ok(TransitionResult::new(next))
        }

        Event::SetAttachment { attachment } => {
            let mut next = state.clone();
            next.attachment = attachment;
            Ok(TransitionResult::new(next))
        }

        Event::Stream { message_id, event } => {
            ensure_current(state, &message_id)?;
            match event {
                StreamEvent::UpdateAnswer(update) => {
                    apply_update(state, context, &message_id, update)
                }
                StreamEvent::Error(error) => {
                    let mut next = state.clone();
                    patch(&mut next, &message_id, |m| m.error = Some(error))?;
                    next.generation = None;
                    Ok(TransitionResult::new(next))
                }
                StreamEvent::Done => {
                    let mut next = state.clone();
                    next.generation = None;
                    let messages = next.messages.to_vec();
                    Ok(TransitionResult::new(next)
                        .with_effect(Effect::RecordHistory { messages }))
                }
            }
        }

        // The send call returned while the generation is still open: either it
        // failed outright, or it closed without a terminal event. Both end the
        // generation with an error attached.
        Event::StreamFinished { message_id, result } => {
            ensure_current(state, &message_id)?;
            let error = match result {
                Err(e) => ChatError::from(&e),
                Ok(()) => ChatError::new(
                    ErrorCode::StreamClosed,
                    "The response ended before it was complete",
                ),
            };
            let mut next = state.clone();
            patch(&mut next, &message_id, |m| {
                if m.error.is_none() {
                    m.error = Some(error);
                }
            })?;
            next.generation = None;
            Ok(TransitionResult::new(next))
        }

        Event::UploadStarted { url } => {
            let mut next = state.clone();
            next.attachment = Some(Attachment::loading(url.clone()));
            Ok(TransitionResult::new(next).with_effect(Effect::UploadImage {
                url,
                style: context.config.conversation_style,
            }))
        }

        // Last completion wins: the slot is overwritten regardless of which
        // upload started last.
        Event::UploadFinished { url, result } => {
            let mut next = state.clone();
            next.attachment = Some(upload_outcome(context, url, result));
            Ok(TransitionResult::new(next))
        }
    }
}

struct SendArgs {
    text: String,
    options: SendOptions,
    user_message_id: MessageId,
    bot_message_id: MessageId,
    cancel: CancellationToken,
}

fn send(state: &Session, context: &SessionContext, args: SendArgs) -> TransitionResult {
    let options = context.config.resolve(&args.options);
    let mut next = state.clone();

    // A send while another generation is active supersedes it: the old one
    // is cancelled exactly as a stop would.
    let superseded = stop_active(&mut next);

    let image = next
        .attachment
        .take()
        .and_then(|a| a.loaded_url().map(str::to_string));

    next.messages.push(Message::user(
        args.user_message_id,
        attachment::compose_user_text(&args.text, image.as_deref()),
    ));
    next.messages
        .push(Message::placeholder(args.bot_message_id.clone()));
    next.generation = Some(Generation {
        message_id: args.bot_message_id.clone(),
        cancel: args.cancel.clone(),
    });

    let request = SendRequest {
        prompt: args.text,
        image_url: image.and_then(|url| {
            attachment::outgoing_image_url(
                &url,
                &context.config.provider_image_url,
                options.image_only,
            )
        }),
        context: options
            .extended_persona
            .then(|| PERSONA_PREAMBLE.to_string()),
        options,
        cancel: args.cancel,
    };

    TransitionResult::new(next)
        .with_effects(superseded)
        .with_effect(Effect::ResetSpeech)
        .with_effect(Effect::StartGeneration {
            message_id: args.bot_message_id,
            request,
        })
}

/// End the active generation, if any. A bot message that received neither
/// text nor an error is marked as cancelled.
fn stop_active(session: &mut Session) -> Option<Effect> {
    let generation = session.generation.take()?;
    session.messages.patch(&generation.message_id, |m| {
        if m.text.is_empty() && m.error.is_none() {
            m.text = CANCELLED_TEXT.to_string();
        }
    });
    Some(Effect::cancel_generation(
        &generation.message_id,
        &generation.cancel,
    ))
}

fn apply_update(
    state: &Session,
    context: &SessionContext,
    message_id: &MessageId,
    update: AnswerUpdate,
) -> Result<TransitionResult, TransitionError> {
    let mut next = state.clone();
    let mut spoken = None;

    patch(&mut next, message_id, |m| {
        // Length only grows: shorter or equal text is a late or duplicate delivery
        if update.text.chars().count() > m.text.chars().count() {
            m.text = update.text;
        }
        if let Some(progress) = update.progress_text.filter(|p| !p.is_empty()) {
            m.progress.push(progress);
        }
        if update.throttling.is_some() {
            m.throttling = update.throttling;
        }
        if !update.source_attributions.is_empty() {
            m.source_attributions = update.source_attributions;
        }
        if !update.suggested_responses.is_empty() {
            m.suggested_responses = update.suggested_responses;
        }
        if context.config.speech {
            spoken = Some(m.text.clone());
        }
    })?;

    Ok(TransitionResult::new(next)
        .with_effects(spoken.map(|text| Effect::Speak { text })))
}

fn upload_outcome(
    context: &SessionContext,
    url: String,
    result: Result<UploadResponse, TransportError>,
) -> Attachment {
    match result {
        Ok(UploadResponse {
            blob_id: Some(blob_id),
        }) if !blob_id.is_empty() => {
            Attachment::loaded(attachment::proxy_url(&context.config.proxy_origin, &blob_id))
        }
        _ => Attachment::failed(url),
    }
}

fn ensure_current(state: &Session, message_id: &MessageId) -> Result<(), TransitionError> {
    if state.is_current(message_id) {
        Ok(())
    } else {
        Err(TransitionError::StaleGeneration {
            message_id: message_id.clone(),
        })
    }
}

fn patch(
    session: &mut Session,
    message_id: &MessageId,
    update: impl FnOnce(&mut Message),
) -> Result<(), TransitionError> {
    if session.messages.patch(message_id, update) {
        Ok(())
    } else {
        Err(TransitionError::MissingMessage(message_id.clone()))
    }
}

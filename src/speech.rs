//! Speech relay: forwards growing partial answers to a speech engine

use std::sync::Arc;

/// External text-to-speech engine
pub trait SpeechEngine: Send + Sync {
    /// Queue a chunk of text for synthesis
    fn enqueue(&self, text: &str);

    /// Stop anything playing or queued
    fn cancel(&self);

    fn is_speaking(&self) -> bool;
}

impl<T: SpeechEngine + ?Sized> SpeechEngine for Arc<T> {
    fn enqueue(&self, text: &str) {
        (**self).enqueue(text);
    }

    fn cancel(&self) {
        (**self).cancel();
    }

    fn is_speaking(&self) -> bool {
        (**self).is_speaking()
    }
}

/// Engine that only logs what it would say
#[derive(Debug, Default)]
pub struct SilentSpeech;

impl SpeechEngine for SilentSpeech {
    fn enqueue(&self, text: &str) {
        tracing::debug!(chars = text.chars().count(), "Speech chunk");
    }

    fn cancel(&self) {}

    fn is_speaking(&self) -> bool {
        false
    }
}

/// Stateful forwarder that speaks only the part of the answer not yet spoken
pub struct SpeechRelay {
    engine: Arc<dyn SpeechEngine>,
    spoken: String,
}

impl SpeechRelay {
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        Self {
            engine,
            spoken: String::new(),
        }
    }

    /// Forget what was spoken; the next `speak` starts from the beginning
    pub fn reset(&mut self) {
        self.spoken.clear();
    }

    /// Queue the newly appended suffix of `full_text`.
    ///
    /// Longer text that rewrote what was already spoken starts speech over
    /// from the new text. Text that is not longer is ignored.
    pub fn speak(&mut self, full_text: &str) {
        if let Some(suffix) = full_text.strip_prefix(self.spoken.as_str()) {
            if !suffix.is_empty() {
                self.engine.enqueue(suffix);
                self.spoken.push_str(suffix);
            }
            return;
        }
        if full_text.chars().count() <= self.spoken.chars().count() {
            return;
        }
        tracing::debug!("Answer was rewritten, restarting speech");
        self.engine.cancel();
        self.engine.enqueue(full_text);
        full_text.clone_into(&mut self.spoken);
    }

    pub fn abort(&mut self) {
        self.engine.cancel();
        self.spoken.clear();
    }

    pub fn is_speaking(&self) -> bool {
        self.engine.is_speaking()
    }
}

//! Speech synthesis collaborator
//!
//! Read-aloud is fire-and-forget: the controller forwards the current
//! question text and locale and consumes no result. It has no effect on
//! session state.

use tracing::debug;

/// External text-to-speech collaborator
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak the given text in the given locale
    fn speak(&self, text: &str, language_code: &str);
}

/// Synthesizer that discards all requests
///
/// Used in tests and by embedders without an audio output path.
#[derive(Debug, Default)]
pub struct NullSynthesizer;

impl SpeechSynthesizer for NullSynthesizer {
    fn speak(&self, text: &str, language_code: &str) {
        debug!(language_code, "Discarding speak request: {}", text);
    }
}

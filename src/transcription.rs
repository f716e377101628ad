//! Transcription source contract
//!
//! A [`TranscriptionSource`] produces one [`TurnHandle`] per recording turn.
//! The handle carries a stream of partial and final transcript events; the
//! interview controller only ever commits the last text delivered before the
//! turn was stopped. Cancelling the handle tells the source to stop emitting
//! and release its audio resources.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Event channel capacity per turn
pub const TURN_EVENT_CAPACITY: usize = 100;

/// Transcript event for one recording turn
#[derive(Clone, Debug)]
pub enum TranscriptEvent {
    /// Partial transcript (still being recognized)
    Partial { text: String },
    /// Final transcript for the turn
    Final { text: String },
    /// Transcription error
    Error { message: String },
}

/// Errors that prevent a recording turn from starting
#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("Speech engine unavailable: {0}")]
    Unavailable(String),

    #[error("Microphone permission denied")]
    PermissionDenied,
}

/// Cancellation flag shared between the controller and the source
///
/// Sources should check [`TurnControl::is_cancelled`] between emissions and
/// stop promptly once it is set.
#[derive(Clone, Debug, Default)]
pub struct TurnControl {
    cancelled: Arc<AtomicBool>,
}

impl TurnControl {
    /// Stop emission and release the turn's audio resources
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Handle for one in-flight recording turn
pub struct TurnHandle {
    /// Transcript events for this turn, in delivery order
    pub events: mpsc::Receiver<TranscriptEvent>,
    control: TurnControl,
}

impl TurnHandle {
    /// Create the event channel for a turn
    ///
    /// Returns the sender half for the source and the handle for the
    /// controller.
    pub fn channel() -> (mpsc::Sender<TranscriptEvent>, TurnHandle) {
        let (tx, rx) = mpsc::channel(TURN_EVENT_CAPACITY);
        let handle = TurnHandle {
            events: rx,
            control: TurnControl::default(),
        };
        (tx, handle)
    }

    /// Get a cancellation control for this turn
    pub fn control(&self) -> TurnControl {
        self.control.clone()
    }
}

/// External speech-to-text collaborator
#[async_trait::async_trait]
pub trait TranscriptionSource: Send + Sync {
    /// Begin a recording turn in the given locale
    ///
    /// A failure here leaves the session untouched; the turn never starts.
    async fn start_turn(&self, language_code: &str) -> Result<TurnHandle, TranscriptionError>;
}

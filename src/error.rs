use crate::transcription::TranscriptionError;
use thiserror::Error;

/// Session lifecycle errors
///
/// All variants are recoverable: the session itself is never torn down by a
/// failed command, and the caller may retry the operation.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("A recording turn is already in progress")]
    TurnAlreadyActive,

    #[error("No recording turn is in progress")]
    NoActiveTurn,

    #[error("A summary request is still pending")]
    SummaryPending,

    #[error("Session is complete; reset to start a new interview")]
    SessionComplete,

    #[error("Session is not awaiting a summary")]
    NotAwaitingSummary,

    #[error("Transcription could not start: {0}")]
    Transcription(#[from] TranscriptionError),

    #[error("Interview controller is no longer running")]
    ControllerStopped,
}

/// Summarization-related errors
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response from summarization service: {0}")]
    InvalidResponse(String),

    #[error("Summarization service error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Summarization timed out after {0:?}")]
    Timeout(std::time::Duration),
}

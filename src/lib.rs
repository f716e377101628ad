#![deny(clippy::all)]

//! Voice-guided interview engine for structured verbal handovers.
//!
//! The crate sequences a configured list of questions through recorded
//! answer turns, accumulates the transcribed answers, injects keyword-matched
//! follow-up questions once the base list is exhausted, and finally requests
//! a bullet-point summary of the whole conversation.
//!
//! # Architecture
//! The [`session::InterviewController`] owns all session state and is driven
//! by discrete commands from the presentation layer. Speech-to-text, text
//! summarization, and speech synthesis are external collaborators behind the
//! [`transcription::TranscriptionSource`], [`summarize::Summarizer`], and
//! [`speech::SpeechSynthesizer`] traits; the engine never touches audio,
//! files, or the network directly.

pub mod config;
pub mod error;
pub mod rules;
pub mod session;
pub mod speech;
pub mod summarize;
pub mod transcription;

pub use config::InterviewConfig;
pub use error::{SessionError, SummarizeError};
pub use rules::{KeywordRule, RuleStore};
pub use session::{InterviewController, SessionEvent, SessionHandle};

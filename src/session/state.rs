//! Interview session state machine
//!
//! [`InterviewSession`] is the synchronous core of the engine: it owns the
//! live question list, the cursor, the accumulated transcript, and the
//! follow-up bookkeeping for one interview pass. All transitions happen
//! through `&mut self` methods, so a session can never be re-entered while a
//! transition is in progress.
//!
//! The async orchestration around it (recording turns, the summarization
//! request) lives in the parent module.

use crate::error::SessionError;
use crate::rules::KeywordRule;
use std::collections::HashSet;
use tracing::{info, warn};

/// Prompt displayed once the cursor has moved past the last question
pub const CLOSING_PROMPT: &str =
    "Is there extra information? If not, click to continue to the summary.";

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not recording, a question is displayed
    Idle,
    /// One transcription turn in progress
    Recording,
    /// Waiting on the summarization service
    Summarizing,
    /// Summary ready
    Complete,
}

/// What the session needs after a completed turn
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Cursor moved to the next question
    NextQuestion,
    /// Base list exhausted; the sweep injected these follow-ups and the
    /// cursor now sits on the first of them
    FollowUpsInjected { questions: Vec<String> },
    /// Every question has been asked; summarize this transcript
    SummaryRequested { transcript: String },
}

/// Mutable state of one interview pass
///
/// Invariants:
/// - `question_index` is non-decreasing within a session and never exceeds
///   `questions.len()`.
/// - `accumulated_text` is append-only within a session.
/// - The follow-up sweep runs at most once per session.
#[derive(Debug)]
pub struct InterviewSession {
    questions: Vec<String>,
    question_index: usize,
    accumulated_text: String,
    follow_ups_asked: HashSet<String>,
    /// Position of the first injected follow-up, recorded when the sweep
    /// appends rather than derived from list arithmetic
    first_follow_up_index: Option<usize>,
    end_reached: bool,
    summary: String,
    phase: Phase,
    turn_count: u32,
}

impl InterviewSession {
    /// Create a fresh session over the given question list
    pub fn new(questions: Vec<String>) -> Self {
        Self {
            questions,
            question_index: 0,
            accumulated_text: String::new(),
            follow_ups_asked: HashSet::new(),
            first_follow_up_index: None,
            end_reached: false,
            summary: String::new(),
            phase: Phase::Idle,
            turn_count: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn question_index(&self) -> usize {
        self.question_index
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    /// The currently displayed question, if the cursor is on one
    pub fn current_question(&self) -> Option<&str> {
        self.questions.get(self.question_index).map(String::as_str)
    }

    /// The text to display for the current position
    ///
    /// Falls back to [`CLOSING_PROMPT`] once the cursor is past the end of
    /// the question list.
    pub fn display_prompt(&self) -> &str {
        self.current_question().unwrap_or(CLOSING_PROMPT)
    }

    pub fn accumulated_text(&self) -> &str {
        &self.accumulated_text
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Completed recording turns this session, including empty ones
    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    /// The transcript to (re-)submit for summarization, if one is pending
    pub fn pending_transcript(&self) -> Option<&str> {
        (self.phase == Phase::Summarizing).then_some(self.accumulated_text.as_str())
    }

    /// Check that a new recording turn may begin
    pub fn check_can_record(&self) -> Result<(), SessionError> {
        match self.phase {
            Phase::Idle => Ok(()),
            Phase::Recording => Err(SessionError::TurnAlreadyActive),
            Phase::Summarizing => Err(SessionError::SummaryPending),
            Phase::Complete => Err(SessionError::SessionComplete),
        }
    }

    /// Begin a recording turn for the current question
    pub fn begin_turn(&mut self) -> Result<(), SessionError> {
        self.check_can_record()?;
        self.phase = Phase::Recording;
        Ok(())
    }

    /// Complete the in-progress turn with its final transcript text
    ///
    /// Non-blank text is appended to the accumulated transcript, separated
    /// from the previous turn by a blank line; blank text contributes
    /// nothing. The cursor then advances, which may trigger the one-time
    /// follow-up sweep or request summarization.
    pub fn complete_turn(
        &mut self,
        text: &str,
        rules: &[KeywordRule],
    ) -> Result<TurnOutcome, SessionError> {
        if self.phase != Phase::Recording {
            return Err(SessionError::NoActiveTurn);
        }
        self.phase = Phase::Idle;
        self.turn_count += 1;

        let text = text.trim();
        if !text.is_empty() {
            if !self.accumulated_text.is_empty() {
                self.accumulated_text.push_str("\n\n");
            }
            self.accumulated_text.push_str(text);
        }

        Ok(self.advance(rules))
    }

    /// Move the cursor after a completed turn
    fn advance(&mut self, rules: &[KeywordRule]) -> TurnOutcome {
        if self.question_index + 1 < self.questions.len() {
            self.question_index += 1;
            return TurnOutcome::NextQuestion;
        }

        if !self.end_reached {
            self.end_reached = true;
            let injected = self.run_follow_up_sweep(rules);
            if !injected.is_empty() {
                // run_follow_up_sweep recorded the marker before appending
                self.question_index = self
                    .first_follow_up_index
                    .unwrap_or(self.questions.len());
                info!(
                    count = injected.len(),
                    index = self.question_index,
                    "Injected follow-up questions"
                );
                return TurnOutcome::FollowUpsInjected {
                    questions: injected,
                };
            }
            // No follow-ups matched: the queue is exhausted, summarize now
            self.question_index = self.questions.len();
        } else if self.question_index < self.questions.len() {
            self.question_index = self.questions.len();
        }

        self.phase = Phase::Summarizing;
        TurnOutcome::SummaryRequested {
            transcript: self.accumulated_text.clone(),
        }
    }

    /// Evaluate every rule against the full accumulated transcript
    ///
    /// Matching is case-sensitive substring containment. Each distinct
    /// follow-up question is injected at most once per session, even when
    /// several rules share the question text. Empty keywords never match.
    fn run_follow_up_sweep(&mut self, rules: &[KeywordRule]) -> Vec<String> {
        let mut injected = Vec::new();

        for rule in rules {
            if rule.keyword.is_empty() {
                warn!(rule_id = %rule.id, "Skipping rule with empty keyword");
                continue;
            }
            if self.accumulated_text.contains(&rule.keyword)
                && !self.follow_ups_asked.contains(&rule.question)
            {
                self.follow_ups_asked.insert(rule.question.clone());
                injected.push(rule.question.clone());
            }
        }

        if !injected.is_empty() {
            self.first_follow_up_index.get_or_insert(self.questions.len());
            self.questions.extend(injected.iter().cloned());
        }

        injected
    }

    /// Store the summary returned by the summarization service
    pub fn apply_summary(&mut self, summary: &str) -> Result<(), SessionError> {
        if self.phase != Phase::Summarizing {
            return Err(SessionError::NotAwaitingSummary);
        }
        self.summary = summary.trim().to_string();
        self.phase = Phase::Complete;
        Ok(())
    }
}

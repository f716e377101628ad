//! Interview session controller
//!
//! Orchestrates one interview pass: starting and stopping recording turns
//! against the transcription source, advancing the question queue, running
//! the follow-up sweep, and driving the summarization request.
//!
//! # Concurrency
//! Every external stimulus - a presentation-layer command, a transcript
//! event, the resolving summarization call - is funnelled through one mpsc
//! queue and processed by a single task, so state transitions are atomic
//! with respect to each other. Background tasks never mutate session state
//! directly; they post messages back onto the queue. Stale messages from a
//! cancelled turn or an abandoned session are identified by generation
//! counters and dropped.

mod state;

pub use state::{InterviewSession, Phase, TurnOutcome, CLOSING_PROMPT};

use crate::config::InterviewConfig;
use crate::error::{SessionError, SummarizeError};
use crate::rules::{KeywordRule, RuleStore};
use crate::speech::SpeechSynthesizer;
use crate::summarize::{Summarizer, SUMMARY_PROMPT_PREFIX};
use crate::transcription::{TranscriptEvent, TranscriptionSource, TurnControl};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{timeout, Duration};
use tracing::{error, info, warn};

/// Capacity of the controller's serialized event queue
const QUEUE_CAPACITY: usize = 64;

/// Capacity of the observer broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Timeout for summarization calls (long transcripts take a while)
const SUMMARY_TIMEOUT: Duration = Duration::from_secs(120);

/// Notifications for the presentation layer
#[derive(Clone, Debug)]
pub enum SessionEvent {
    /// A recording turn began for the question at this index
    TurnStarted { question_index: usize },
    /// Live transcript text, still being recognized
    PartialTranscript { text: String },
    /// The source finalized the transcript for the current turn
    CommittedTranscript { text: String },
    /// A turn completed and its text was appended to the session transcript
    TurnCompleted { text: String },
    /// The cursor moved; `question` is None past the end of the list
    QuestionChanged {
        index: usize,
        question: Option<String>,
    },
    /// The sweep injected these follow-up questions
    FollowUpsInjected { questions: Vec<String> },
    /// The summarization request was sent
    Summarizing,
    /// The summary is ready; the session is complete
    SummaryReady { summary: String },
    /// The summarization request failed; retry is permitted
    SummaryFailed { message: String },
    /// The session was reset to its initial state
    SessionReset,
    /// A command was rejected or a collaborator failed
    Error { message: String },
}

/// Point-in-time view of the session, for observers and tests
#[derive(Clone, Debug)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub question_index: usize,
    pub questions: Vec<String>,
    pub current_question: Option<String>,
    pub accumulated_text: String,
    pub summary: String,
    pub turn_count: u32,
}

/// Presentation-layer commands
enum Command {
    StartTurn,
    StopTurn,
    RetrySummary,
    Reset,
    ReadQuestionAloud,
    UpdateConfig(InterviewConfig),
    Snapshot(oneshot::Sender<SessionSnapshot>),
}

/// Everything the controller task processes, in arrival order
enum Message {
    Command(Command),
    Turn { turn_id: u64, event: TranscriptEvent },
    Summary {
        session_id: u64,
        result: Result<String, SummarizeError>,
    },
}

/// Handle for driving a spawned [`InterviewController`]
///
/// Cheap to clone; all methods enqueue work on the controller's event queue.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Message>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    /// Subscribe to session notifications
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Begin a recording turn for the current question
    pub async fn start_turn(&self) -> Result<(), SessionError> {
        self.send(Command::StartTurn).await
    }

    /// End the in-progress recording turn and advance the queue
    pub async fn stop_turn(&self) -> Result<(), SessionError> {
        self.send(Command::StopTurn).await
    }

    /// Re-submit the accumulated transcript after a failed summarization
    pub async fn retry_summary(&self) -> Result<(), SessionError> {
        self.send(Command::RetrySummary).await
    }

    /// Clear all session state and start over
    pub async fn reset(&self) -> Result<(), SessionError> {
        self.send(Command::Reset).await
    }

    /// Forward the current question to the speech synthesizer
    pub async fn read_question_aloud(&self) -> Result<(), SessionError> {
        self.send(Command::ReadQuestionAloud).await
    }

    /// Replace the configuration
    ///
    /// The locale applies from the next turn; question-list changes apply
    /// from the next reset.
    pub async fn update_config(&self, config: InterviewConfig) -> Result<(), SessionError> {
        self.send(Command::UpdateConfig(config)).await
    }

    /// Fetch a consistent view of the current session state
    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Snapshot(reply_tx)).await?;
        reply_rx
            .await
            .map_err(|_| SessionError::ControllerStopped)
    }

    async fn send(&self, command: Command) -> Result<(), SessionError> {
        self.tx
            .send(Message::Command(command))
            .await
            .map_err(|_| SessionError::ControllerStopped)
    }
}

/// Owns the session state machine and its collaborators
pub struct InterviewController {
    config: InterviewConfig,
    session: InterviewSession,
    /// Rule snapshot taken at session start; store edits apply next session
    rules: Vec<KeywordRule>,
    rule_store: Arc<dyn RuleStore>,
    source: Arc<dyn TranscriptionSource>,
    summarizer: Arc<dyn Summarizer>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    events: broadcast::Sender<SessionEvent>,
    queue_tx: mpsc::Sender<Message>,
    /// Cancellation control for the in-flight turn, if any
    active_turn: Option<TurnControl>,
    /// Last transcript text delivered for the in-flight turn
    turn_text: String,
    turn_id: u64,
    session_id: u64,
    summary_inflight: bool,
}

impl InterviewController {
    /// Spawn a controller on the current runtime and return its handle
    pub fn spawn(
        config: InterviewConfig,
        rule_store: Arc<dyn RuleStore>,
        source: Arc<dyn TranscriptionSource>,
        summarizer: Arc<dyn Summarizer>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> SessionHandle {
        let (queue_tx, queue_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let rules = rule_store.load();
        info!(rule_count = rules.len(), "Loaded keyword rules");

        let controller = Self {
            session: InterviewSession::new(config.questions.clone()),
            config,
            rules,
            rule_store,
            source,
            summarizer,
            synthesizer,
            events: events.clone(),
            queue_tx: queue_tx.clone(),
            active_turn: None,
            turn_text: String::new(),
            turn_id: 0,
            session_id: 0,
            summary_inflight: false,
        };
        tokio::spawn(controller.run(queue_rx));

        SessionHandle { tx: queue_tx, events }
    }

    async fn run(mut self, mut queue_rx: mpsc::Receiver<Message>) {
        while let Some(message) = queue_rx.recv().await {
            match message {
                Message::Command(command) => self.handle_command(command).await,
                Message::Turn { turn_id, event } => self.handle_turn_event(turn_id, event),
                Message::Summary { session_id, result } => {
                    self.handle_summary(session_id, result)
                }
            }
        }
        info!("Interview controller stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::StartTurn => self.handle_start_turn().await,
            Command::StopTurn => self.handle_stop_turn(),
            Command::RetrySummary => self.handle_retry_summary(),
            Command::Reset => self.handle_reset(),
            Command::ReadQuestionAloud => {
                self.synthesizer
                    .speak(self.session.display_prompt(), &self.config.language_code);
            }
            Command::UpdateConfig(config) => {
                info!("Configuration updated");
                self.config = config;
            }
            Command::Snapshot(reply_tx) => {
                let _ = reply_tx.send(self.snapshot());
            }
        }
    }

    async fn handle_start_turn(&mut self) {
        if let Err(e) = self.session.check_can_record() {
            warn!("Rejected start turn: {}", e);
            self.emit(SessionEvent::Error {
                message: e.to_string(),
            });
            return;
        }

        // Ask the source first: a start failure must leave the session
        // untouched.
        let handle = match self.source.start_turn(&self.config.language_code).await {
            Ok(handle) => handle,
            Err(e) => {
                error!("Failed to start transcription turn: {}", e);
                self.emit(SessionEvent::Error {
                    message: SessionError::Transcription(e).to_string(),
                });
                return;
            }
        };

        if let Err(e) = self.session.begin_turn() {
            // Unreachable after the check above, but never leave a live turn
            // dangling.
            handle.control().cancel();
            self.emit(SessionEvent::Error {
                message: e.to_string(),
            });
            return;
        }

        self.turn_id += 1;
        self.turn_text.clear();
        self.active_turn = Some(handle.control());
        spawn_turn_forwarder(handle, self.queue_tx.clone(), self.turn_id);

        info!(
            question_index = self.session.question_index(),
            language_code = %self.config.language_code,
            "Recording turn started"
        );
        self.emit(SessionEvent::TurnStarted {
            question_index: self.session.question_index(),
        });
    }

    fn handle_turn_event(&mut self, turn_id: u64, event: TranscriptEvent) {
        // Drop events from a turn that was already stopped or superseded
        if self.active_turn.is_none() || turn_id != self.turn_id {
            return;
        }

        match event {
            TranscriptEvent::Partial { text } => {
                self.turn_text = text.clone();
                self.emit(SessionEvent::PartialTranscript { text });
            }
            TranscriptEvent::Final { text } => {
                self.turn_text = text.clone();
                self.emit(SessionEvent::CommittedTranscript { text });
            }
            TranscriptEvent::Error { message } => {
                error!("Transcription error: {}", message);
                self.emit(SessionEvent::Error { message });
            }
        }
    }

    fn handle_stop_turn(&mut self) {
        let Some(control) = self.active_turn.take() else {
            warn!("Rejected stop turn: no turn in progress");
            self.emit(SessionEvent::Error {
                message: SessionError::NoActiveTurn.to_string(),
            });
            return;
        };

        // Cancel the in-flight transcription; the turn is committed with
        // whatever text was last delivered, including none.
        control.cancel();
        let text = std::mem::take(&mut self.turn_text);

        let outcome = match self.session.complete_turn(&text, &self.rules) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Failed to complete turn: {}", e);
                self.emit(SessionEvent::Error {
                    message: e.to_string(),
                });
                return;
            }
        };

        if !text.trim().is_empty() {
            self.emit(SessionEvent::TurnCompleted { text });
        }

        match outcome {
            TurnOutcome::NextQuestion => self.emit_question_changed(),
            TurnOutcome::FollowUpsInjected { questions } => {
                self.emit(SessionEvent::FollowUpsInjected { questions });
                self.emit_question_changed();
            }
            TurnOutcome::SummaryRequested { transcript } => self.start_summary(transcript),
        }
    }

    fn handle_retry_summary(&mut self) {
        if self.summary_inflight {
            warn!("Rejected summary retry: a request is still pending");
            self.emit(SessionEvent::Error {
                message: SessionError::SummaryPending.to_string(),
            });
            return;
        }
        match self.session.pending_transcript() {
            Some(transcript) => {
                let transcript = transcript.to_string();
                self.start_summary(transcript);
            }
            None => {
                warn!("Rejected summary retry: session is not awaiting a summary");
                self.emit(SessionEvent::Error {
                    message: SessionError::NotAwaitingSummary.to_string(),
                });
            }
        }
    }

    fn start_summary(&mut self, transcript: String) {
        self.summary_inflight = true;
        self.emit(SessionEvent::Summarizing);
        info!(
            transcript_len = transcript.len(),
            "Requesting conversation summary"
        );

        let summarizer = self.summarizer.clone();
        let queue_tx = self.queue_tx.clone();
        let session_id = self.session_id;
        tokio::spawn(async move {
            let result = match timeout(
                SUMMARY_TIMEOUT,
                summarizer.summarize(SUMMARY_PROMPT_PREFIX, &transcript),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(SummarizeError::Timeout(SUMMARY_TIMEOUT)),
            };
            let _ = queue_tx.send(Message::Summary { session_id, result }).await;
        });
    }

    fn handle_summary(&mut self, session_id: u64, result: Result<String, SummarizeError>) {
        if session_id != self.session_id {
            info!("Ignoring summary for an abandoned session");
            return;
        }
        self.summary_inflight = false;

        match result {
            Ok(summary) => match self.session.apply_summary(&summary) {
                Ok(()) => {
                    info!(summary_len = summary.len(), "Summary ready");
                    self.emit(SessionEvent::SummaryReady {
                        summary: self.session.summary().to_string(),
                    });
                }
                Err(e) => {
                    error!("Failed to store summary: {}", e);
                    self.emit(SessionEvent::Error {
                        message: e.to_string(),
                    });
                }
            },
            Err(e) => {
                // The summary stays empty and the session stays in
                // Summarizing; the caller may retry.
                error!("Summarization failed: {}", e);
                self.emit(SessionEvent::SummaryFailed {
                    message: e.to_string(),
                });
            }
        }
    }

    fn handle_reset(&mut self) {
        if let Some(control) = self.active_turn.take() {
            control.cancel();
            self.turn_text.clear();
        }
        // An in-flight summarization has no cancellation path; bumping the
        // session generation makes its eventual result a no-op.
        self.session_id += 1;
        self.summary_inflight = false;

        let questions = if self.config.retain_follow_ups {
            self.session.questions().to_vec()
        } else {
            self.config.questions.clone()
        };
        self.rules = self.rule_store.load();
        self.session = InterviewSession::new(questions);

        info!(
            rule_count = self.rules.len(),
            question_count = self.session.questions().len(),
            "Session reset"
        );
        self.emit(SessionEvent::SessionReset);
        self.emit_question_changed();
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.session.phase(),
            question_index: self.session.question_index(),
            questions: self.session.questions().to_vec(),
            current_question: self.session.current_question().map(str::to_string),
            accumulated_text: self.session.accumulated_text().to_string(),
            summary: self.session.summary().to_string(),
            turn_count: self.session.turn_count(),
        }
    }

    fn emit_question_changed(&self) {
        self.emit(SessionEvent::QuestionChanged {
            index: self.session.question_index(),
            question: self.session.current_question().map(str::to_string),
        });
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Forward one turn's transcript events onto the controller queue
fn spawn_turn_forwarder(
    handle: crate::transcription::TurnHandle,
    queue_tx: mpsc::Sender<Message>,
    turn_id: u64,
) {
    let mut events = handle.events;
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if queue_tx
                .send(Message::Turn { turn_id, event })
                .await
                .is_err()
            {
                break;
            }
        }
    });
}

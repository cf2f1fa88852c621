//! Turn-based voice conversation state machine
//!
//! The controller ties speech capture, reply streaming, sentence
//! segmentation, and the speech queue together. Streamed model text is
//! appended to the visible model turn and voiced sentence by sentence, so
//! speaking begins while the model is still generating.

use std::sync::{Arc, Mutex};

use futures::StreamExt;
use tokio::sync::watch;

use crate::providers::{ChatStream, SpeechRecognizer};
use crate::speech::{QueueStatus, SentenceSegmenter, SpeechQueue};
use crate::{Error, Result};

/// Opening model turn for a new session
const GREETING: &str = "Hello! Press the microphone and I'll start listening.";

/// Model turn shown and spoken when the chat stream fails
const APOLOGY: &str = "Sorry, I encountered an error.";

/// Activity state of the assistant
///
/// Exactly one state is active at any instant. The controller owns the
/// state; other components read it through [`ConversationController::state`]
/// or [`ConversationController::subscribe`] but never write it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    /// Waiting for the user
    Idle,
    /// Microphone open, transcript accumulating
    Listening,
    /// User turn committed, reply stream pending
    Thinking,
    /// Queued utterances are being voiced
    Speaking,
}

/// Who produced a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The person speaking to the assistant
    User,
    /// The assistant
    Model,
}

/// One user or model contribution to the conversation log
///
/// Turns are immutable once finalized; the in-progress model turn grows as
/// reply fragments arrive and is never rewritten to a shorter value.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    /// Turn author
    pub role: Role,
    /// Turn text
    pub text: String,
}

/// A speech-recognition event, reduced to the fields this pipeline consumes
#[derive(Debug, Clone)]
pub enum RecognitionEvent {
    /// Capture started
    Started,
    /// A new best-guess transcript for the in-progress utterance
    ///
    /// Carries the full current transcript, not a delta; each result
    /// replaces the previous one wholesale.
    Result {
        /// Full current transcript
        transcript: String,
        /// Whether the recognizer considers this transcript final
        is_final: bool,
    },
    /// Capture ended without an explicit stop
    Ended,
    /// Recognition failed (permission denied, device unavailable)
    Error {
        /// Human-readable failure description
        message: String,
    },
}

struct Shared {
    state: ConversationState,
    turns: Vec<ConversationTurn>,
    live_transcript: String,
}

struct Inner {
    shared: Mutex<Shared>,
    state_tx: watch::Sender<ConversationState>,
}

impl Inner {
    /// Move to `next` regardless of the current state
    fn set_state(&self, next: ConversationState) {
        let mut shared = self.shared.lock().unwrap();
        if shared.state != next {
            tracing::debug!(from = ?shared.state, to = ?next, "state transition");
            shared.state = next;
            self.state_tx.send_replace(next);
        }
    }

    /// Move to `next` only when currently in one of `expected`
    fn set_state_if(&self, expected: &[ConversationState], next: ConversationState) {
        let mut shared = self.shared.lock().unwrap();
        if expected.contains(&shared.state) && shared.state != next {
            tracing::debug!(from = ?shared.state, to = ?next, "state transition");
            shared.state = next;
            self.state_tx.send_replace(next);
        }
    }
}

/// Orchestrates one voice conversation session
///
/// Must be created inside a tokio runtime; it spawns a task that mirrors
/// queue activity back into the conversation state.
pub struct ConversationController {
    chat: Arc<dyn ChatStream>,
    recognizer: Arc<dyn SpeechRecognizer>,
    queue: SpeechQueue,
    inner: Arc<Inner>,
}

impl ConversationController {
    /// Create a controller over the given collaborators
    ///
    /// The session opens with a greeting turn from the model.
    #[must_use]
    pub fn new(
        chat: Arc<dyn ChatStream>,
        recognizer: Arc<dyn SpeechRecognizer>,
        queue: SpeechQueue,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConversationState::Idle);
        let inner = Arc::new(Inner {
            shared: Mutex::new(Shared {
                state: ConversationState::Idle,
                turns: vec![ConversationTurn {
                    role: Role::Model,
                    text: GREETING.to_string(),
                }],
                live_transcript: String::new(),
            }),
            state_tx,
        });

        // Mirror queue activity into the conversation state: drained speech
        // returns the session to idle, new speech marks it speaking. The
        // watch channel only holds the latest status, so a drain that
        // finishes quickly may be observed as a single idle update; idle
        // therefore releases thinking as well as speaking.
        let mut status = queue.status();
        let watcher = Arc::clone(&inner);
        tokio::spawn(async move {
            loop {
                match *status.borrow_and_update() {
                    QueueStatus::Speaking => watcher.set_state_if(
                        &[ConversationState::Thinking, ConversationState::Idle],
                        ConversationState::Speaking,
                    ),
                    QueueStatus::Idle => watcher.set_state_if(
                        &[ConversationState::Thinking, ConversationState::Speaking],
                        ConversationState::Idle,
                    ),
                }
                if status.changed().await.is_err() {
                    break;
                }
            }
        });

        Self {
            chat,
            recognizer,
            queue,
            inner,
        }
    }

    /// Current activity state
    #[must_use]
    pub fn state(&self) -> ConversationState {
        self.inner.shared.lock().unwrap().state
    }

    /// The speech queue voicing this session's replies
    #[must_use]
    pub fn queue(&self) -> &SpeechQueue {
        &self.queue
    }

    /// Watch state transitions
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.inner.state_tx.subscribe()
    }

    /// Snapshot of the conversation log
    #[must_use]
    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.inner.shared.lock().unwrap().turns.clone()
    }

    /// The in-progress recognition transcript
    #[must_use]
    pub fn live_transcript(&self) -> String {
        self.inner.shared.lock().unwrap().live_transcript.clone()
    }

    /// Begin a listen cycle
    ///
    /// Returns `Ok(false)` without side effects while the assistant is
    /// thinking or speaking; the microphone gate, not a failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Capture`] if the recognizer cannot start; the
    /// session stays idle.
    pub fn try_start_listening(&self) -> Result<bool> {
        if self.state() != ConversationState::Idle {
            return Ok(false);
        }

        self.recognizer.start()?;

        {
            let mut shared = self.inner.shared.lock().unwrap();
            shared.live_transcript.clear();
        }
        self.inner.set_state(ConversationState::Listening);
        Ok(true)
    }

    /// Apply a recognition event
    ///
    /// # Errors
    ///
    /// Returns [`Error::Capture`] for [`RecognitionEvent::Error`]; the
    /// session returns to idle and capture stops.
    pub fn handle_recognition(&self, event: RecognitionEvent) -> Result<()> {
        match event {
            RecognitionEvent::Started => Ok(()),
            RecognitionEvent::Result {
                transcript,
                is_final,
            } => {
                let mut shared = self.inner.shared.lock().unwrap();
                if shared.state == ConversationState::Listening {
                    tracing::trace!(transcript = %transcript, is_final, "transcript update");
                    shared.live_transcript = transcript;
                }
                Ok(())
            }
            RecognitionEvent::Ended => {
                // Spontaneous end of capture: drop the transcript, the
                // explicit stop is what commits a turn
                {
                    let mut shared = self.inner.shared.lock().unwrap();
                    shared.live_transcript.clear();
                }
                self.inner
                    .set_state_if(&[ConversationState::Listening], ConversationState::Idle);
                Ok(())
            }
            RecognitionEvent::Error { message } => {
                {
                    let mut shared = self.inner.shared.lock().unwrap();
                    shared.live_transcript.clear();
                }
                self.recognizer.stop();
                self.inner
                    .set_state_if(&[ConversationState::Listening], ConversationState::Idle);
                Err(Error::Capture(message))
            }
        }
    }

    /// End the listen cycle and run the turn
    ///
    /// Commits the live transcript as a user turn if it is non-empty,
    /// streams the model reply into the conversation log and the speech
    /// queue, and returns once the reply stream ends. Queued speech keeps
    /// playing after this returns; the session reaches idle when the queue
    /// drains.
    ///
    /// A no-op outside the listening state.
    pub async fn stop_listening(&self) {
        enum Commit {
            Refused,
            Empty,
            Turn(String),
        }

        let commit = {
            let mut shared = self.inner.shared.lock().unwrap();
            if shared.state == ConversationState::Listening {
                let text = shared.live_transcript.trim().to_string();
                shared.live_transcript.clear();
                if text.is_empty() {
                    Commit::Empty
                } else {
                    shared.turns.push(ConversationTurn {
                        role: Role::User,
                        text: text.clone(),
                    });
                    Commit::Turn(text)
                }
            } else {
                Commit::Refused
            }
        };

        match commit {
            Commit::Refused => {}
            Commit::Empty => {
                self.recognizer.stop();
                self.inner.set_state(ConversationState::Idle);
            }
            Commit::Turn(text) => {
                self.recognizer.stop();
                self.inner.set_state(ConversationState::Thinking);
                self.run_reply(&text).await;
            }
        }
    }

    /// Stream the model reply for a committed user turn
    async fn run_reply(&self, text: &str) {
        tracing::info!(chars = text.len(), "running turn");

        let mut segmenter = SentenceSegmenter::new();

        match self.chat.stream_reply(text).await {
            Ok(mut stream) => {
                // Placeholder model turn that grows as fragments arrive
                {
                    let mut shared = self.inner.shared.lock().unwrap();
                    shared.turns.push(ConversationTurn {
                        role: Role::Model,
                        text: String::new(),
                    });
                }

                let mut failed = false;
                while let Some(fragment) = stream.next().await {
                    match fragment {
                        Ok(fragment) => {
                            {
                                let mut shared = self.inner.shared.lock().unwrap();
                                if let Some(turn) = shared.turns.last_mut() {
                                    turn.text.push_str(&fragment);
                                }
                            }
                            for sentence in segmenter.feed(&fragment) {
                                self.queue.enqueue(&sentence);
                            }
                        }
                        Err(e) => {
                            self.fail_reply(&e);
                            failed = true;
                            break;
                        }
                    }
                }

                if !failed {
                    if let Some(rest) = segmenter.flush() {
                        self.queue.enqueue(&rest);
                    }
                }
            }
            Err(e) => self.fail_reply(&e),
        }

        // An empty reply must not leave the session stuck thinking
        if self.queue.is_idle() {
            self.inner
                .set_state_if(&[ConversationState::Thinking], ConversationState::Idle);
        }
    }

    /// Downgrade a stream failure to a visible, spoken apology
    fn fail_reply(&self, err: &Error) {
        tracing::error!(error = %err, "chat stream failed");
        {
            let mut shared = self.inner.shared.lock().unwrap();
            shared.turns.push(ConversationTurn {
                role: Role::Model,
                text: APOLOGY.to_string(),
            });
        }
        self.queue.enqueue(APOLOGY);
    }
}

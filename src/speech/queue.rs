//! Serialized playback of queued utterances

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::audio::{self, AudioSink};
use crate::providers::SpeechSynthesizer;
use crate::{Error, Result};

/// Whether the queue is actively voicing utterances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    /// Nothing pending, no playback in flight
    Idle,
    /// A drain is active
    Speaking,
}

/// FIFO queue of utterances awaiting synthesis and playback
///
/// Utterances play strictly in enqueue order and never concurrently. A
/// failed synthesis, decode, or playback counts as complete, so one bad
/// utterance cannot stall the rest of the conversation.
pub struct SpeechQueue {
    inner: Arc<Inner>,
}

struct Inner {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    sink: Arc<dyn AudioSink>,
    state: Mutex<QueueState>,
    status_tx: watch::Sender<QueueStatus>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<String>,
    draining: bool,
}

impl SpeechQueue {
    /// Create a queue draining into the given synthesizer and sink
    #[must_use]
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, sink: Arc<dyn AudioSink>) -> Self {
        let (status_tx, _) = watch::channel(QueueStatus::Idle);
        Self {
            inner: Arc::new(Inner {
                synthesizer,
                sink,
                state: Mutex::new(QueueState::default()),
                status_tx,
            }),
        }
    }

    /// Append an utterance to the tail of the queue
    ///
    /// Empty or whitespace-only text is ignored. Starts a drain if none is
    /// active; an active drain picks the utterance up in turn.
    pub fn enqueue(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        let start_drain = {
            let mut state = self.inner.state.lock().unwrap();
            state.pending.push_back(text.to_string());
            if state.draining {
                false
            } else {
                state.draining = true;
                // Status changes stay ordered with queue mutations
                self.inner.status_tx.send_replace(QueueStatus::Speaking);
                true
            }
        };

        if start_drain {
            tokio::spawn(drain(Arc::clone(&self.inner)));
        }
    }

    /// Subscribe to queue status transitions
    #[must_use]
    pub fn status(&self) -> watch::Receiver<QueueStatus> {
        self.inner.status_tx.subscribe()
    }

    /// True when nothing is pending and no playback is in flight
    #[must_use]
    pub fn is_idle(&self) -> bool {
        let state = self.inner.state.lock().unwrap();
        !state.draining && state.pending.is_empty()
    }

    /// Wait until every queued utterance has played or been skipped
    pub async fn drained(&self) {
        let mut status = self.status();
        let _ = status.wait_for(|s| *s == QueueStatus::Idle).await;
    }
}

/// Drain loop: voices queued utterances one at a time until empty
async fn drain(inner: Arc<Inner>) {
    loop {
        let next = {
            let mut state = inner.state.lock().unwrap();
            match state.pending.pop_front() {
                Some(text) => text,
                None => {
                    state.draining = false;
                    inner.status_tx.send_replace(QueueStatus::Idle);
                    return;
                }
            }
        };

        // Fail open: an unplayable utterance is skipped, never a stall
        if let Err(e) = voice_one(&inner, &next).await {
            tracing::warn!(error = %e, utterance = %next, "skipping unplayable utterance");
        }
    }
}

/// Synthesize, decode, and play one utterance
async fn voice_one(inner: &Inner, text: &str) -> Result<()> {
    let Some(payload) = inner.synthesizer.synthesize(text).await? else {
        tracing::debug!(utterance = %text, "synthesizer returned no audio");
        return Ok(());
    };

    let buffer = audio::decode_base64_pcm(&payload)?;

    let sink = Arc::clone(&inner.sink);
    tokio::task::spawn_blocking(move || sink.play(&buffer))
        .await
        .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
}

/// Synthesize and play a single utterance outside the queue
///
/// The read-aloud path for standalone text. Unlike queued speech, errors
/// propagate to the caller.
///
/// # Errors
///
/// Returns error if synthesis, decoding, or playback fails
pub async fn speak_once(
    synthesizer: &dyn SpeechSynthesizer,
    sink: &Arc<dyn AudioSink>,
    text: &str,
) -> Result<()> {
    let Some(payload) = synthesizer.synthesize(text).await? else {
        tracing::debug!("synthesizer returned no audio");
        return Ok(());
    };

    let buffer = audio::decode_base64_pcm(&payload)?;

    let sink = Arc::clone(sink);
    tokio::task::spawn_blocking(move || sink.play(&buffer))
        .await
        .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
}

//! External collaborator seams
//!
//! The heavy lifting (chat replies, speech synthesis, speech recognition)
//! happens in hosted services and platform facilities. These traits capture
//! exactly the contracts the pipeline depends on, so every collaborator can
//! be swapped or scripted in tests.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::Result;

mod gemini;

pub use gemini::GeminiClient;

/// Ordered text fragments of one model reply
///
/// Concatenating the fragments in delivery order reconstructs the full
/// reply.
pub type ReplyStream = BoxStream<'static, Result<String>>;

/// Synthesizes speech for one utterance
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize the text, returning a base64 PCM payload
    ///
    /// `None` means "nothing to play" and is not an error.
    ///
    /// # Errors
    ///
    /// Returns error if the synthesis call fails
    async fn synthesize(&self, text: &str) -> Result<Option<String>>;
}

/// Streams model replies for a multi-turn conversation
///
/// The implementation owns the conversation history across calls.
#[async_trait]
pub trait ChatStream: Send + Sync {
    /// Send one user message and stream the reply fragments in order
    ///
    /// # Errors
    ///
    /// Returns error if the chat call cannot be started
    async fn stream_reply(&self, text: &str) -> Result<ReplyStream>;
}

/// Controls the speech-capture collaborator
///
/// Recognition results are delivered to the conversation controller as
/// [`RecognitionEvent`](crate::conversation::RecognitionEvent)s by the
/// embedding layer.
pub trait SpeechRecognizer: Send + Sync {
    /// Begin capturing speech
    ///
    /// # Errors
    ///
    /// Returns [`Error::Capture`](crate::Error::Capture) if the microphone
    /// is unavailable or permission is denied
    fn start(&self) -> Result<()>;

    /// Stop capturing speech
    fn stop(&self);
}

/// Recognizer stand-in for embeddings without microphone capture
///
/// Transcripts are injected directly (typed input, tests); start and stop
/// always succeed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecognizer;

impl SpeechRecognizer for NullRecognizer {
    fn start(&self) -> Result<()> {
        Ok(())
    }

    fn stop(&self) {}
}

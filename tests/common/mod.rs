//! Shared test doubles for the voice pipeline
//!
//! Scripted collaborators so the pipeline can be exercised end to end
//! without audio hardware or network access.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::stream;

use stride_voice::audio::{AudioSink, SampleBuffer};
use stride_voice::providers::{ChatStream, ReplyStream, SpeechRecognizer, SpeechSynthesizer};
use stride_voice::{Error, Result};

/// Encode i16 samples as the base64 PCM payload the TTS collaborator returns
#[must_use]
pub fn pcm_payload(samples: &[i16]) -> String {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    BASE64.encode(bytes)
}

/// Scripted outcome for one utterance
#[derive(Clone)]
pub enum SynthOutcome {
    /// Return a payload of these samples
    Audio(Vec<i16>),
    /// Return no audio
    Absent,
    /// Fail the synthesis call
    Fail,
}

/// Synthesizer that maps utterance text to a scripted outcome
///
/// Unscripted text gets a short default payload. Call order is recorded.
pub struct ScriptedSynthesizer {
    script: Mutex<HashMap<String, SynthOutcome>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedSynthesizer {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set(&self, text: &str, outcome: SynthOutcome) {
        self.script.lock().unwrap().insert(text.to_string(), outcome);
    }

    /// Utterances synthesized so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for ScriptedSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Option<String>> {
        self.calls.lock().unwrap().push(text.to_string());

        let outcome = self.script.lock().unwrap().get(text).cloned();
        match outcome {
            Some(SynthOutcome::Audio(samples)) => Ok(Some(pcm_payload(&samples))),
            Some(SynthOutcome::Absent) => Ok(None),
            Some(SynthOutcome::Fail) => Err(Error::Synthesis("scripted failure".to_string())),
            None => Ok(Some(pcm_payload(&[0, 0, 0, 0]))),
        }
    }
}

/// Sink recording the sample count of every buffer it plays, in order
pub struct RecordingSink {
    played: Mutex<Vec<usize>>,
    delay: Duration,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    /// A sink that takes `delay` to play each buffer, so in-flight playback
    /// is observable from the test body
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            played: Mutex::new(Vec::new()),
            delay,
        }
    }

    /// Sample counts of played buffers, in completion order
    pub fn played(&self) -> Vec<usize> {
        self.played.lock().unwrap().clone()
    }
}

impl AudioSink for RecordingSink {
    fn play(&self, buffer: &SampleBuffer) -> Result<()> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.played.lock().unwrap().push(buffer.len());
        Ok(())
    }
}

/// Sink that fails every playback
pub struct FailingSink;

impl AudioSink for FailingSink {
    fn play(&self, _buffer: &SampleBuffer) -> Result<()> {
        Err(Error::Audio("scripted device failure".to_string()))
    }
}

enum ReplyScript {
    /// In-stream items, delivered in order
    Chunks(Vec<std::result::Result<String, String>>),
    /// The call itself fails
    ConnectError(String),
}

/// Chat collaborator replaying scripted replies, one per call
pub struct ScriptedChat {
    replies: Mutex<VecDeque<ReplyScript>>,
}

impl ScriptedChat {
    /// Reply with these fragments, then end the stream
    pub fn replying(fragments: &[&str]) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([ReplyScript::Chunks(
                fragments.iter().map(|f| Ok((*f).to_string())).collect(),
            )])),
        }
    }

    /// Fail the call outright
    pub fn failing(message: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([ReplyScript::ConnectError(
                message.to_string(),
            )])),
        }
    }

    /// Deliver these fragments, then fail mid-stream
    pub fn breaking_after(fragments: &[&str], message: &str) -> Self {
        let mut items: Vec<std::result::Result<String, String>> =
            fragments.iter().map(|f| Ok((*f).to_string())).collect();
        items.push(Err(message.to_string()));
        Self {
            replies: Mutex::new(VecDeque::from([ReplyScript::Chunks(items)])),
        }
    }
}

#[async_trait]
impl ChatStream for ScriptedChat {
    async fn stream_reply(&self, _text: &str) -> Result<ReplyStream> {
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(ReplyScript::Chunks(items)) => Ok(Box::pin(stream::iter(
                items.into_iter().map(|r| r.map_err(Error::Stream)),
            ))),
            Some(ReplyScript::ConnectError(message)) => Err(Error::Stream(message)),
            None => Ok(Box::pin(stream::empty())),
        }
    }
}

/// Recognizer whose start always fails (permission denied)
pub struct DeniedRecognizer;

impl SpeechRecognizer for DeniedRecognizer {
    fn start(&self) -> Result<()> {
        Err(Error::Capture("microphone permission denied".to_string()))
    }

    fn stop(&self) {}
}

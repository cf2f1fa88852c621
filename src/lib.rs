//! Stride Voice - turn-based voice conversation pipeline for the Stride
//! fitness assistant
//!
//! This library provides the client-side voice pipeline:
//! - Decoding synthesized speech (base64 PCM) into playable audio
//! - Serialized, fail-open playback of queued utterances
//! - Sentence segmentation of streamed model replies
//! - The turn-based conversation state machine
//!
//! # Architecture
//!
//! ```text
//! microphone -> speech recognition -> ConversationController
//!                                          |
//!                              chat stream | reply fragments
//!                                          v
//!                                  SentenceSegmenter
//!                                          | sentences
//!                                          v
//!                                     SpeechQueue --- synthesize (TTS)
//!                                          |              |
//!                                          |         base64 PCM
//!                                          v              v
//!                                    AudioPlayback <- decode
//! ```
//!
//! All substantive work (reply generation, synthesis, recognition) happens
//! in external collaborators behind the trait seams in [`providers`]; the
//! pipeline marshals data between them and guarantees ordering: sentences
//! are voiced in emission order, one at a time, and a failed utterance is
//! skipped rather than stalling the conversation.

pub mod audio;
pub mod config;
pub mod conversation;
pub mod error;
pub mod providers;
pub mod speech;

pub use audio::{AudioPlayback, AudioSink, SAMPLE_RATE, SampleBuffer, decode_base64_pcm};
pub use config::{Config, VoiceConfig};
pub use conversation::{
    ConversationController, ConversationState, ConversationTurn, RecognitionEvent, Role,
};
pub use error::{Error, Result};
pub use providers::{
    ChatStream, GeminiClient, NullRecognizer, ReplyStream, SpeechRecognizer, SpeechSynthesizer,
};
pub use speech::{QueueStatus, SentenceSegmenter, SpeechQueue, speak_once};

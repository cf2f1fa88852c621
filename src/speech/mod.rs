//! Sentence segmentation and serialized speech playback

mod queue;
mod segment;

pub use queue::{QueueStatus, SpeechQueue, speak_once};
pub use segment::SentenceSegmenter;

//! Audio decoding and playback
//!
//! Synthesized speech arrives as base64-encoded raw PCM (16-bit signed
//! little-endian, mono, 24 kHz) and is played on the default output device.

mod decode;
mod playback;

pub use decode::{SAMPLE_RATE, SampleBuffer, decode_base64_pcm};
pub use playback::{AudioPlayback, AudioSink, write_wav};

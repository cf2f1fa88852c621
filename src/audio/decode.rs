//! Decoding of synthesized speech payloads

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::{Error, Result};

/// Sample rate of synthesized speech (fixed by the TTS payload format)
pub const SAMPLE_RATE: u32 = 24_000;

/// A decoded mono audio buffer of normalized samples at [`SAMPLE_RATE`]
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f32>,
}

impl SampleBuffer {
    /// Wrap raw samples in a buffer
    #[must_use]
    pub fn from_samples(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    /// The normalized samples, each in `[-1.0, 1.0]`
    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of samples
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the buffer holds no samples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback duration in milliseconds
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        (self.samples.len() as u64 * 1000) / u64::from(SAMPLE_RATE)
    }
}

/// Decode a base64 payload of headerless 16-bit little-endian PCM
///
/// Each byte pair becomes one normalized sample via `v / 32768.0`, so the
/// output length is exactly half the decoded byte count.
///
/// # Errors
///
/// Returns [`Error::Decode`] on malformed base64 or an odd byte count.
/// Truncated payloads are rejected, never shortened.
pub fn decode_base64_pcm(payload: &str) -> Result<SampleBuffer> {
    let bytes = BASE64
        .decode(payload)
        .map_err(|e| Error::Decode(format!("invalid base64 payload: {e}")))?;

    if bytes.len() % 2 != 0 {
        return Err(Error::Decode(format!(
            "odd PCM byte count: {}",
            bytes.len()
        )));
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0)
        .collect();

    Ok(SampleBuffer { samples })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(bytes: &[u8]) -> String {
        BASE64.encode(bytes)
    }

    #[test]
    fn test_decode_sample_values() {
        // 0, 16384, -16384, 32767, -32768 as little-endian i16
        let bytes: Vec<u8> = [0i16, 16384, -16384, 32767, -32768]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();

        let buffer = decode_base64_pcm(&encode(&bytes)).unwrap();
        assert_eq!(buffer.len(), bytes.len() / 2);

        let samples = buffer.samples();
        assert_eq!(samples[0], 0.0);
        assert_eq!(samples[1], 0.5);
        assert_eq!(samples[2], -0.5);
        assert_eq!(samples[3], 32767.0 / 32768.0);
        assert_eq!(samples[4], -1.0);
        assert!(samples.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn test_decode_odd_byte_count_rejected() {
        let err = decode_base64_pcm(&encode(&[1, 2, 3])).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_decode_malformed_base64_rejected() {
        let err = decode_base64_pcm("not base64!!").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_decode_empty_payload() {
        let buffer = decode_base64_pcm("").unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.duration_ms(), 0);
    }

    #[test]
    fn test_duration() {
        let buffer = SampleBuffer::from_samples(vec![0.0; SAMPLE_RATE as usize]);
        assert_eq!(buffer.duration_ms(), 1000);
    }
}

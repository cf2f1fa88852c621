//! Audio playback to speakers

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig};

use crate::audio::{SAMPLE_RATE, SampleBuffer};
use crate::{Error, Result};

/// Renders one decoded buffer to an audio output
///
/// `play` returns exactly once per call, when the buffer has been rendered
/// end to end or playback has failed. Callers serialize playback; the sink
/// itself never runs two renders for the same caller concurrently.
pub trait AudioSink: Send + Sync {
    /// Play the buffer to completion
    ///
    /// # Errors
    ///
    /// Returns error if the output device is unavailable or playback fails
    fn play(&self, buffer: &SampleBuffer) -> Result<()>;
}

/// Plays audio on the default output device
///
/// The device and stream are acquired per call and dropped once playback
/// completes, so no audio handle outlives the utterance that needed it.
#[derive(Debug, Default, Clone, Copy)]
pub struct AudioPlayback;

impl AudioPlayback {
    /// Create a new playback instance
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl AudioSink for AudioPlayback {
    fn play(&self, buffer: &SampleBuffer) -> Result<()> {
        play_blocking(buffer)
    }
}

/// Pick an output config at the playback rate, mono preferred
fn output_config(device: &Device) -> Result<StreamConfig> {
    let supported = device
        .supported_output_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
        })
        .or_else(|| {
            // Fallback: try stereo
            device.supported_output_configs().ok()?.find(|c| {
                c.channels() == 2
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
        })
        .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

    Ok(supported.with_sample_rate(SampleRate(SAMPLE_RATE)).config())
}

/// Render the buffer on the default device, returning when playback ends
fn play_blocking(buffer: &SampleBuffer) -> Result<()> {
    if buffer.is_empty() {
        return Ok(());
    }

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

    let config = output_config(&device)?;
    let channels = config.channels as usize;

    tracing::debug!(
        device = device.name().unwrap_or_default(),
        sample_rate = SAMPLE_RATE,
        channels = config.channels,
        samples = buffer.len(),
        "starting playback"
    );

    let samples: Arc<[f32]> = Arc::from(buffer.samples());
    let position = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicBool::new(false));

    let cb_samples = Arc::clone(&samples);
    let cb_position = Arc::clone(&position);
    let cb_finished = Arc::clone(&finished);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut pos = cb_position.load(Ordering::Relaxed);

                for frame in data.chunks_mut(channels) {
                    let sample = if pos < cb_samples.len() {
                        let s = cb_samples[pos];
                        pos += 1;
                        s
                    } else {
                        cb_finished.store(true, Ordering::Relaxed);
                        0.0
                    };

                    for out in frame.iter_mut() {
                        *out = sample;
                    }
                }

                cb_position.store(pos, Ordering::Relaxed);
            },
            |err| {
                tracing::error!(error = %err, "audio playback error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    // Poll for completion with a timeout derived from the buffer duration
    let timeout = std::time::Duration::from_millis(buffer.duration_ms() + 500);
    let start = std::time::Instant::now();

    while !finished.load(Ordering::Relaxed) {
        if start.elapsed() > timeout {
            tracing::warn!("playback did not signal completion before timeout");
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(50));
    }

    // Let the device flush its last buffer
    std::thread::sleep(std::time::Duration::from_millis(100));

    drop(stream);
    tracing::debug!(samples = buffer.len(), "playback complete");

    Ok(())
}

/// Write a decoded buffer to a 16-bit mono WAV file
///
/// # Errors
///
/// Returns error if WAV encoding or the file write fails
pub fn write_wav(buffer: &SampleBuffer, path: &Path) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer =
        hound::WavWriter::create(path, spec).map_err(|e| Error::Audio(e.to_string()))?;

    for &sample in buffer.samples() {
        // Convert f32 [-1.0, 1.0] back to i16
        #[allow(clippy::cast_possible_truncation)]
        let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
        writer
            .write_sample(sample_i16)
            .map_err(|e| Error::Audio(e.to_string()))?;
    }

    writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    Ok(())
}

//! Configuration for the Stride voice pipeline

use crate::{Error, Result};

/// Voice pipeline configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Generative AI API key
    pub api_key: String,

    /// Voice configuration
    pub voice: VoiceConfig,
}

/// Model and voice selection
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Chat model for streamed replies
    pub chat_model: String,

    /// TTS model producing raw PCM audio
    pub tts_model: String,

    /// Prebuilt TTS voice name
    pub tts_voice: String,
}

impl Config {
    /// Load configuration from the environment
    ///
    /// # Errors
    ///
    /// Returns error if `GEMINI_API_KEY` is not set
    pub fn load() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| Error::Config("GEMINI_API_KEY environment variable not set".to_string()))?;

        let voice = VoiceConfig {
            chat_model: std::env::var("STRIDE_CHAT_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
            tts_model: std::env::var("STRIDE_TTS_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash-preview-tts".to_string()),
            tts_voice: std::env::var("STRIDE_TTS_VOICE").unwrap_or_else(|_| "Kore".to_string()),
        };

        tracing::debug!(
            chat_model = %voice.chat_model,
            tts_model = %voice.tts_model,
            tts_voice = %voice.tts_voice,
            "loaded configuration"
        );

        Ok(Self { api_key, voice })
    }
}

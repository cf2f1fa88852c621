//! Error types for the Stride voice pipeline

use thiserror::Error;

/// Result type alias for voice pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voice pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed synthesized-audio payload
    #[error("audio decode error: {0}")]
    Decode(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech synthesis error
    #[error("speech synthesis error: {0}")]
    Synthesis(String),

    /// Chat stream error
    #[error("chat stream error: {0}")]
    Stream(String),

    /// Speech capture error (permission denied, device unavailable)
    #[error("capture error: {0}")]
    Capture(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

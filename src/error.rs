//! Error types for the Pepper gateway

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Pepper gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Source audio encoding is not recognized
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Audio processing error (device, decode, encode)
    #[error("audio error: {0}")]
    Audio(String),

    /// Network failure between client and server
    #[error("transport error: {0}")]
    Transport(String),

    /// Speech-to-text capability failure
    #[error("transcription error: {0}")]
    Transcription(String),

    /// Text generation capability failure
    #[error("generation error: {0}")]
    Generation(String),

    /// Malformed request or input
    #[error("validation error: {0}")]
    Validation(String),

    /// Robot hardware or connection error
    #[error("robot error: {0}")]
    Robot(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// WAV encoding/decoding error
    #[error("wav error: {0}")]
    Wav(#[from] hound::Error),
}

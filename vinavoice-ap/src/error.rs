//! Error types for vinavoice-ap
//!
//! Decode failures get their own enum so callers can tell a bad payload
//! apart from an audio-device problem without string matching.

use thiserror::Error;

/// Audio payload decode failures
///
/// Fatal to one decode attempt only. No partial buffer is ever produced.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Synthesis returned no audio data
    #[error("No audio data received")]
    EmptyPayload,

    /// Payload is not valid base64
    #[error("Invalid base64 audio payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// Decoded byte count is not a whole number of 16-bit samples
    #[error("Truncated PCM payload: {byte_len} bytes is not a multiple of 2")]
    TruncatedSample { byte_len: usize },
}

/// Main error type for vinavoice-ap
#[derive(Error, Debug)]
pub enum Error {
    /// Audio payload could not be decoded
    #[error("Audio decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Output context or audio graph node could not be created or resumed
    #[error("Playback resource error: {0}")]
    PlaybackResource(String),

    /// Invalid player configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Shared-crate errors (config resolution, TOML parsing)
    #[error(transparent)]
    Common(#[from] vinavoice_common::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using vinavoice-ap Error
pub type Result<T, E = Error> = std::result::Result<T, E>;

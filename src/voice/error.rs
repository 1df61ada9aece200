//! Error types for the voice pipeline.

use thiserror::Error;

/// Result type alias for voice pipeline operations.
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Errors that can occur while producing a spoken response.
///
/// Absent configuration and missing sessions are deliberately not represented
/// here: an unconfigured speech backend is a recognized text-only mode and a
/// missing session degrades to a no-op, so both are modeled with `Option`.
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("text generation failed: {0}")]
    Generation(String),

    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("audio storage failed: {0}")]
    Storage(String),
}

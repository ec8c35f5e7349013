//! Audio loading error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while turning an audio upload into samples
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to read audio file: {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("No decodable audio track found")]
    NoAudioTrack,

    #[error("Unknown sample rate")]
    UnknownSampleRate,

    #[error("Audio contains no samples")]
    Empty,

    #[error("Decoding failed: {0}")]
    Decode(String),

    #[error("Resampling failed: {0}")]
    Resample(String),
}

impl From<rubato::ResamplerConstructionError> for AudioError {
    fn from(e: rubato::ResamplerConstructionError) -> Self {
        AudioError::Resample(e.to_string())
    }
}

impl From<rubato::ResampleError> for AudioError {
    fn from(e: rubato::ResampleError) -> Self {
        AudioError::Resample(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AudioError>;

//! Classifier error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading a model file
///
/// These are fatal at startup: without a model nothing can be analyzed.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read model file: {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse model file {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid model: {0}")]
    Invalid(String),

    #[error("Unsupported model format: {0}")]
    UnsupportedFormat(String),

    #[error("Model backend initialization failed: {0}")]
    Backend(String),
}

/// Errors that can occur while classifying one feature matrix
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Feature shape mismatch: model expects {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Empty feature matrix")]
    EmptyInput,

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid model output: {0}")]
    InvalidOutput(String),
}

//! Genre Core - audio feature extraction and genre classification
//!
//! The analysis pipeline is a straight line:
//!
//! ```text
//! audio bytes ──► audio_file (decode, first 30 s, mono, resample)
//!             ──► features   (40 MFCCs, mean over time)
//!             ──► classifier (predict + predict_proba on a 1 x 40 matrix)
//!             ──► GenrePrediction
//! ```
//!
//! The classifier is loaded once by [`classifier::load_classifier`] and shared
//! read-only through [`pipeline::GenreAnalyzer`].

pub mod audio_file;
pub mod classifier;
pub mod features;
pub mod pipeline;
pub mod predict;
pub mod types;

pub use classifier::{load_classifier, ClassifierError, GenreClassifier, ModelError, ModelOptions};
pub use pipeline::{AnalysisError, GenreAnalyzer};
pub use predict::{predict_genre, GenrePrediction};
pub use types::*;

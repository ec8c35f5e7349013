//! Genre AI - identify the musical genre of an audio clip
//!
//! Thin application layer over `genre-core`: configuration, the analysis
//! session and terminal rendering. The binary in `main.rs` wires these to the
//! command line.

pub mod app;
pub mod config;
pub mod report;

pub use app::{AnalysisOutcome, App};
pub use config::{default_config_path, load_config, save_config, Config, DisplayConfig, OutputFormat};

//! Configuration for genre-ai
//!
//! Configuration is stored as YAML in the user's config directory.
//! Default location: ~/.config/genre-ai/config.yaml

use anyhow::{Context, Result};
use genre_core::features::FeatureConfig;
use genre_core::ModelOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Shortest and longest bar chart the text report draws
pub const MIN_CHART_WIDTH: usize = 10;
pub const MAX_CHART_WIDTH: usize = 120;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which model to load and how
    pub model: ModelConfig,
    /// Decoding and MFCC settings (must match how the model was trained)
    pub features: FeatureConfig,
    /// Output settings
    pub display: DisplayConfig,
}

impl Config {
    /// Repair out-of-range values in place
    pub fn validate(&mut self) {
        self.model.validate();
        self.display.validate();
    }
}

/// Model section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model file (.onnx, .json or .yaml)
    pub path: PathBuf,
    /// Label file for ONNX models; defaults to `<model>.labels.txt`
    pub labels_path: Option<PathBuf>,
    /// ONNX Runtime intra-op threads
    pub intra_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("music_genre_model.onnx"),
            labels_path: None,
            intra_threads: 1,
        }
    }
}

impl ModelConfig {
    pub fn validate(&mut self) {
        if self.intra_threads == 0 {
            log::warn!("ModelConfig: intra_threads must be at least 1, using 1");
            self.intra_threads = 1;
        }
    }

    /// Loader options for this section
    pub fn model_options(&self) -> ModelOptions {
        ModelOptions {
            labels_path: self.labels_path.clone(),
            intra_threads: self.intra_threads,
            ..Default::default()
        }
    }
}

/// How results are written to stdout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Headline, metric and bar chart
    #[default]
    Text,
    /// One JSON document per analysis
    Json,
}

/// Display section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Length of a 100% bar in characters
    pub chart_width: usize,
    pub output: OutputFormat,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            chart_width: 40,
            output: OutputFormat::Text,
        }
    }
}

impl DisplayConfig {
    pub fn validate(&mut self) {
        let clamped = self.chart_width.clamp(MIN_CHART_WIDTH, MAX_CHART_WIDTH);
        if clamped != self.chart_width {
            log::warn!(
                "DisplayConfig: chart_width {} out of range, using {}",
                self.chart_width,
                clamped
            );
            self.chart_width = clamped;
        }
    }
}

/// Get the default config file path
///
/// Returns: ~/.config/genre-ai/config.yaml
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("genre-ai")
        .join("config.yaml")
}

/// Load configuration from a YAML file
///
/// If the file doesn't exist, returns default config.
/// If the file exists but is invalid, logs a warning and returns default config.
pub fn load_config(path: &Path) -> Config {
    log::info!("load_config: Loading from {:?}", path);

    if !path.exists() {
        log::info!("load_config: Config file doesn't exist, using defaults");
        return Config::default();
    }

    let mut config = match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Config>(&contents) {
            Ok(config) => {
                log::info!(
                    "load_config: Loaded config - model: {:?}, sample rate: {:?}, output: {:?}",
                    config.model.path,
                    config.features.target_sample_rate,
                    config.display.output
                );
                config
            }
            Err(e) => {
                log::warn!("load_config: Failed to parse config: {}, using defaults", e);
                Config::default()
            }
        },
        Err(e) => {
            log::warn!("load_config: Failed to read config file: {}, using defaults", e);
            Config::default()
        }
    };

    config.validate();
    config
}

/// Save configuration to a YAML file
///
/// Creates parent directories if they don't exist.
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    log::info!("save_config: Saving to {:?}", path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;

    std::fs::write(path, yaml).with_context(|| format!("Failed to write config file: {:?}", path))?;

    log::info!("save_config: Config saved successfully");
    Ok(())
}

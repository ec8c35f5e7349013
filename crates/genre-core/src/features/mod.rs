//! Fixed-length acoustic features for genre classification
//!
//! A clip is summarized as the mean of its per-frame MFCC vectors: 40 numbers
//! describing the average spectral timbre. Temporal order is discarded by the
//! mean pooling, so the vector length never depends on clip length.

mod mfcc;

pub use mfcc::{hz_to_mel, mel_filterbank, mel_to_hz, MfccExtractor};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio_file::{DecodedAudio, LoadOptions};
use crate::types::{
    DEFAULT_HOP_LENGTH, DEFAULT_N_FFT, DEFAULT_N_MELS, DEFAULT_SAMPLE_RATE, DEFAULT_TOP_DB, MAX_DURATION_SECS,
    N_MFCC,
};

/// Errors that can occur during feature extraction
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid feature configuration: {0}")]
    InvalidConfig(String),
    #[error("FFT error: {0}")]
    Fft(String),
}

/// Feature extraction settings
///
/// Defaults reproduce the configuration the genre models are trained with:
/// 40 MFCCs from 128 mel bands, 2048-sample frames with a 512 hop, computed on
/// the first 30 s of audio at 22 050 Hz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Number of cepstral coefficients (feature vector length)
    pub n_mfcc: usize,
    /// Seconds decoded from the start of the clip (null = whole clip)
    pub max_duration_secs: Option<f64>,
    /// Analysis sample rate (null = decoder's native rate)
    pub target_sample_rate: Option<u32>,
    /// STFT window length
    pub n_fft: usize,
    /// STFT hop length
    pub hop_length: usize,
    /// Number of mel bands
    pub n_mels: usize,
    /// Lowest mel band edge (Hz)
    pub fmin: f32,
    /// Highest mel band edge (Hz, null = Nyquist)
    pub fmax: Option<f32>,
    /// Dynamic range kept below the loudest bin (dB, null = unlimited)
    pub top_db: Option<f32>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            n_mfcc: N_MFCC,
            max_duration_secs: Some(MAX_DURATION_SECS),
            target_sample_rate: Some(DEFAULT_SAMPLE_RATE),
            n_fft: DEFAULT_N_FFT,
            hop_length: DEFAULT_HOP_LENGTH,
            n_mels: DEFAULT_N_MELS,
            fmin: 0.0,
            fmax: None,
            top_db: Some(DEFAULT_TOP_DB),
        }
    }
}

impl FeatureConfig {
    /// Check that the settings describe a computable MFCC
    pub fn validate(&self) -> Result<(), FeatureError> {
        if self.n_fft < 2 {
            return Err(FeatureError::InvalidConfig(format!("n_fft must be at least 2, got {}", self.n_fft)));
        }
        if self.hop_length == 0 {
            return Err(FeatureError::InvalidConfig("hop_length must be positive".to_string()));
        }
        if self.n_mels == 0 || self.n_mfcc == 0 {
            return Err(FeatureError::InvalidConfig("n_mels and n_mfcc must be positive".to_string()));
        }
        if self.n_mfcc > self.n_mels {
            return Err(FeatureError::InvalidConfig(format!(
                "n_mfcc ({}) cannot exceed n_mels ({})",
                self.n_mfcc, self.n_mels
            )));
        }
        if self.fmin < 0.0 {
            return Err(FeatureError::InvalidConfig(format!("fmin must be non-negative, got {}", self.fmin)));
        }
        if matches!(self.max_duration_secs, Some(secs) if secs <= 0.0) {
            return Err(FeatureError::InvalidConfig("max_duration_secs must be positive".to_string()));
        }
        if self.target_sample_rate == Some(0) {
            return Err(FeatureError::InvalidConfig("target_sample_rate must be positive".to_string()));
        }
        Ok(())
    }

    /// Decoder settings implied by this configuration
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            max_duration_secs: self.max_duration_secs,
            target_sample_rate: self.target_sample_rate,
        }
    }
}

/// Compute the mean MFCC vector of a decoded clip
///
/// Always returns exactly `config.n_mfcc` values for non-empty audio.
pub fn extract_features(audio: &DecodedAudio, config: &FeatureConfig) -> Result<Vec<f32>, FeatureError> {
    let extractor = MfccExtractor::new(config, audio.sample_rate)?;
    let features = extractor.mean_mfcc(&audio.samples)?;
    log::debug!(
        "extract_features: {} coefficients from {} samples at {} Hz",
        features.len(),
        audio.samples.len(),
        audio.sample_rate
    );
    Ok(features)
}

//! Shared constants for the analysis pipeline

/// Number of MFCC coefficients the bundled models are trained on
pub const N_MFCC: usize = 40;

/// Only this much of a clip is decoded (seconds)
pub const MAX_DURATION_SECS: f64 = 30.0;

/// Analysis sample rate used when resampling is enabled (Hz)
pub const DEFAULT_SAMPLE_RATE: u32 = 22050;

/// STFT window length in samples
pub const DEFAULT_N_FFT: usize = 2048;

/// STFT hop length in samples
pub const DEFAULT_HOP_LENGTH: usize = 512;

/// Number of mel bands the MFCCs are computed from
pub const DEFAULT_N_MELS: usize = 128;

/// Dynamic range kept by the power-to-dB conversion
pub const DEFAULT_TOP_DB: f32 = 80.0;

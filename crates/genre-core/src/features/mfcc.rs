//! MFCC computation
//!
//! Pipeline per frame:
//! - centered STFT (zero padding of n_fft/2 on both sides, periodic Hann window)
//! - power spectrum |X|^2
//! - Slaney mel filterbank (area-normalized triangles)
//! - power to dB: 10·log10(max(1e-10, S)), floored at (max - top_db)
//! - orthonormal DCT-II, first n_mfcc coefficients
//!
//! Centered framing means any non-empty signal yields at least one frame.

use std::sync::Arc;

use realfft::{RealFftPlanner, RealToComplex};

use super::{FeatureConfig, FeatureError};

/// Floor applied before taking the logarithm
const AMIN: f64 = 1e-10;

/// Sparse triangular mel filter: weights for bins `start..start + weights.len()`
struct MelBand {
    start: usize,
    weights: Vec<f32>,
}

/// Reusable MFCC extractor for one sample rate
pub struct MfccExtractor {
    n_fft: usize,
    hop_length: usize,
    top_db: Option<f32>,
    window: Vec<f32>,
    mel_bands: Vec<MelBand>,
    /// n_mfcc rows x n_mels columns
    dct: Vec<Vec<f32>>,
    fft: Arc<dyn RealToComplex<f32>>,
}

impl MfccExtractor {
    /// Prepare window, filterbank, DCT basis and FFT plan
    pub fn new(config: &FeatureConfig, sample_rate: u32) -> Result<Self, FeatureError> {
        config.validate()?;
        if sample_rate == 0 {
            return Err(FeatureError::InvalidInput("sample rate must be positive".to_string()));
        }

        let nyquist = sample_rate as f32 / 2.0;
        let fmax = config.fmax.unwrap_or(nyquist).min(nyquist);
        if fmax <= config.fmin {
            return Err(FeatureError::InvalidConfig(format!(
                "fmax ({}) must be above fmin ({})",
                fmax, config.fmin
            )));
        }

        let filterbank = mel_filterbank(sample_rate, config.n_fft, config.n_mels, config.fmin, fmax);
        let mel_bands = filterbank.into_iter().map(compact_band).collect();

        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(config.n_fft);

        Ok(Self {
            n_fft: config.n_fft,
            hop_length: config.hop_length,
            top_db: config.top_db,
            window: periodic_hann(config.n_fft),
            mel_bands,
            dct: dct_ii_ortho(config.n_mfcc, config.n_mels),
            fft,
        })
    }

    /// Number of frames produced for a signal of `len` samples
    pub fn frame_count(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        let pad = self.n_fft / 2;
        let padded_len = len + 2 * pad;
        1 + (padded_len - self.n_fft) / self.hop_length
    }

    /// Per-frame MFCC vectors (frames x n_mfcc)
    pub fn mfcc(&self, samples: &[f32]) -> Result<Vec<Vec<f32>>, FeatureError> {
        let log_mel = self.log_mel_spectrogram(samples)?;

        Ok(log_mel
            .iter()
            .map(|frame| {
                self.dct
                    .iter()
                    .map(|basis| basis.iter().zip(frame.iter()).map(|(&b, &m)| b * m).sum())
                    .collect()
            })
            .collect())
    }

    /// Mean of the per-frame MFCC vectors
    pub fn mean_mfcc(&self, samples: &[f32]) -> Result<Vec<f32>, FeatureError> {
        let frames = self.mfcc(samples)?;
        let n_coeffs = self.dct.len();

        let mut sums = vec![0.0f64; n_coeffs];
        for frame in &frames {
            for (sum, &v) in sums.iter_mut().zip(frame.iter()) {
                *sum += v as f64;
            }
        }

        let n = frames.len() as f64;
        Ok(sums.into_iter().map(|s| (s / n) as f32).collect())
    }

    /// Log-power mel spectrogram in dB (frames x n_mels)
    fn log_mel_spectrogram(&self, samples: &[f32]) -> Result<Vec<Vec<f32>>, FeatureError> {
        if samples.is_empty() {
            return Err(FeatureError::InvalidInput("Empty input samples".to_string()));
        }

        let pad = self.n_fft / 2;
        let mut padded = vec![0.0f32; samples.len() + 2 * pad];
        padded[pad..pad + samples.len()].copy_from_slice(samples);

        let n_frames = self.frame_count(samples.len());
        let mut frame_buf = self.fft.make_input_vec();
        let mut spectrum = self.fft.make_output_vec();
        let mut scratch = self.fft.make_scratch_vec();
        let mut power = vec![0.0f32; spectrum.len()];

        let mut frames = Vec::with_capacity(n_frames);
        let mut max_db = f32::NEG_INFINITY;

        for frame_idx in 0..n_frames {
            let start = frame_idx * self.hop_length;
            for (i, out) in frame_buf.iter_mut().enumerate() {
                *out = padded[start + i] * self.window[i];
            }

            self.fft
                .process_with_scratch(&mut frame_buf, &mut spectrum, &mut scratch)
                .map_err(|e| FeatureError::Fft(format!("{:?}", e)))?;

            for (p, c) in power.iter_mut().zip(spectrum.iter()) {
                *p = c.re * c.re + c.im * c.im;
            }

            let mel_db: Vec<f32> = self
                .mel_bands
                .iter()
                .map(|band| {
                    let energy: f64 = band
                        .weights
                        .iter()
                        .zip(&power[band.start..])
                        .map(|(&w, &p)| w as f64 * p as f64)
                        .sum();
                    (10.0 * energy.max(AMIN).log10()) as f32
                })
                .collect();

            for &db in &mel_db {
                max_db = max_db.max(db);
            }
            frames.push(mel_db);
        }

        if let Some(top_db) = self.top_db {
            let floor = max_db - top_db;
            for frame in &mut frames {
                for v in frame.iter_mut() {
                    *v = v.max(floor);
                }
            }
        }

        Ok(frames)
    }
}

/// Hann window for spectral analysis (periodic form, length n)
fn periodic_hann(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
            (0.5 - 0.5 * phase.cos()) as f32
        })
        .collect()
}

/// Hz to mel on the Slaney scale (linear below 1 kHz, logarithmic above)
pub fn hz_to_mel(hz: f64) -> f64 {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f64.ln() / 27.0;

    if hz >= MIN_LOG_HZ {
        min_log_mel + (hz / MIN_LOG_HZ).ln() / logstep
    } else {
        hz / F_SP
    }
}

/// Inverse of [`hz_to_mel`]
pub fn mel_to_hz(mel: f64) -> f64 {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f64.ln() / 27.0;

    if mel >= min_log_mel {
        MIN_LOG_HZ * (logstep * (mel - min_log_mel)).exp()
    } else {
        mel * F_SP
    }
}

/// Dense mel filterbank: n_mels rows x (n_fft / 2 + 1) columns
///
/// Triangles are spaced evenly on the mel scale between `fmin` and `fmax` and
/// scaled to unit area (Slaney normalization).
pub fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize, fmin: f32, fmax: f32) -> Vec<Vec<f32>> {
    let n_bins = n_fft / 2 + 1;
    let sr = sample_rate as f64;

    let fft_freqs: Vec<f64> = (0..n_bins).map(|k| k as f64 * sr / n_fft as f64).collect();

    let mel_min = hz_to_mel(fmin as f64);
    let mel_max = hz_to_mel(fmax as f64);
    let n_points = n_mels + 2;
    let mel_f: Vec<f64> = (0..n_points)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n_points - 1) as f64))
        .collect();

    let mut filterbank = Vec::with_capacity(n_mels);
    for band in 0..n_mels {
        let left = mel_f[band];
        let center = mel_f[band + 1];
        let right = mel_f[band + 2];
        let enorm = 2.0 / (right - left);

        let filter = fft_freqs
            .iter()
            .map(|&f| {
                let lower = (f - left) / (center - left);
                let upper = (right - f) / (right - center);
                (lower.min(upper).max(0.0) * enorm) as f32
            })
            .collect();
        filterbank.push(filter);
    }

    filterbank
}

/// Trim a dense filter to its non-zero support
fn compact_band(filter: Vec<f32>) -> MelBand {
    let start = filter.iter().position(|&w| w > 0.0).unwrap_or(0);
    let end = filter.iter().rposition(|&w| w > 0.0).map_or(start, |i| i + 1);
    MelBand {
        start,
        weights: filter[start..end].to_vec(),
    }
}

/// Orthonormal DCT-II basis: n_out rows x n_in columns
fn dct_ii_ortho(n_out: usize, n_in: usize) -> Vec<Vec<f32>> {
    let n = n_in as f64;
    (0..n_out)
        .map(|k| {
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            (0..n_in)
                .map(|i| {
                    let angle = std::f64::consts::PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n);
                    (scale * angle.cos()) as f32
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sr: u32, secs: f32) -> Vec<f32> {
        (0..(sr as f32 * secs) as usize)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_mel_hz_roundtrip() {
        for hz in [0.0, 200.0, 999.0, 1000.0, 4000.0, 11025.0] {
            let back = mel_to_hz(hz_to_mel(hz));
            assert!((back - hz).abs() < 1e-6, "Roundtrip: {} -> {}", hz, back);
        }
    }

    #[test]
    fn test_slaney_scale_breakpoint() {
        assert!((hz_to_mel(1000.0) - 15.0).abs() < 1e-9);
        assert!((hz_to_mel(500.0) - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_filterbank_shape_and_coverage() {
        let fb = mel_filterbank(22050, 2048, 128, 0.0, 11025.0);
        assert_eq!(fb.len(), 128);
        for (i, filter) in fb.iter().enumerate() {
            assert_eq!(filter.len(), 1025);
            assert!(filter.iter().all(|&w| w >= 0.0));
            assert!(filter.iter().any(|&w| w > 0.0), "Band {} is empty", i);
        }
    }

    #[test]
    fn test_dct_rows_orthonormal() {
        let dct = dct_ii_ortho(8, 8);
        for a in 0..8 {
            for b in 0..8 {
                let dot: f32 = dct[a].iter().zip(&dct[b]).map(|(x, y)| x * y).sum();
                let expected = if a == b { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-5, "rows {} {}: {}", a, b, dot);
            }
        }
    }

    #[test]
    fn test_periodic_hann() {
        let w = periodic_hann(4);
        assert_eq!(w.len(), 4);
        assert!(w[0].abs() < 1e-7);
        assert!((w[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_frame_count_centered() {
        let extractor = MfccExtractor::new(&FeatureConfig::default(), 22050).unwrap();
        assert_eq!(extractor.frame_count(0), 0);
        assert_eq!(extractor.frame_count(1), 1);
        assert_eq!(extractor.frame_count(512), 2);
        assert_eq!(extractor.frame_count(22050), 1 + 22050 / 512);
    }

    #[test]
    fn test_mfcc_frame_shape() {
        let extractor = MfccExtractor::new(&FeatureConfig::default(), 22050).unwrap();
        let samples = sine(440.0, 22050, 1.0);
        let frames = extractor.mfcc(&samples).unwrap();
        assert_eq!(frames.len(), extractor.frame_count(samples.len()));
        assert!(frames.iter().all(|f| f.len() == 40));
    }

    #[test]
    fn test_single_sample_yields_full_vector() {
        let extractor = MfccExtractor::new(&FeatureConfig::default(), 22050).unwrap();
        let mean = extractor.mean_mfcc(&[0.3]).unwrap();
        assert_eq!(mean.len(), 40);
        assert!(mean.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_silence_is_finite() {
        let extractor = MfccExtractor::new(&FeatureConfig::default(), 22050).unwrap();
        let mean = extractor.mean_mfcc(&vec![0.0; 4096]).unwrap();
        assert!(mean.iter().all(|v| v.is_finite()));
        // Flat -100 dB spectrum: all energy in the DC coefficient
        assert!(mean[1..].iter().all(|v| v.abs() < 1e-2));
    }

    #[test]
    fn test_different_tones_differ() {
        let extractor = MfccExtractor::new(&FeatureConfig::default(), 22050).unwrap();
        let low = extractor.mean_mfcc(&sine(110.0, 22050, 1.0)).unwrap();
        let high = extractor.mean_mfcc(&sine(3520.0, 22050, 1.0)).unwrap();
        let distance: f32 = low.iter().zip(&high).map(|(a, b)| (a - b).abs()).sum();
        assert!(distance > 1.0, "Tones should produce distinct features: {}", distance);
    }

    #[test]
    fn test_louder_signal_raises_first_coefficient() {
        let extractor = MfccExtractor::new(&FeatureConfig::default(), 22050).unwrap();
        let quiet: Vec<f32> = sine(440.0, 22050, 1.0).iter().map(|s| s * 0.1).collect();
        let loud = sine(440.0, 22050, 1.0);
        let q = extractor.mean_mfcc(&quiet).unwrap();
        let l = extractor.mean_mfcc(&loud).unwrap();
        assert!(l[0] > q[0]);
    }

    #[test]
    fn test_fmax_below_fmin_rejected() {
        let config = FeatureConfig {
            fmin: 5000.0,
            fmax: Some(1000.0),
            ..Default::default()
        };
        assert!(matches!(MfccExtractor::new(&config, 22050), Err(FeatureError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        assert!(MfccExtractor::new(&FeatureConfig::default(), 0).is_err());
    }
}

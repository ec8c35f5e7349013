//! Analysis pipeline: audio in, genre prediction out
//!
//! `GenreAnalyzer` is built once from a loaded classifier and reused for
//! every analysis. Each call is independent: nothing is cached between calls,
//! so a failed analysis cannot leave state behind that affects the next one.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::audio_file::{self, AudioError, DecodedAudio};
use crate::classifier::{ClassifierError, GenreClassifier};
use crate::features::{extract_features, FeatureConfig, FeatureError};
use crate::predict::{predict_genre, GenrePrediction};

/// Any failure during a single analysis
///
/// All variants are recoverable: the analyzer stays usable afterwards.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Features(#[from] FeatureError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

/// Feature extraction + classification over a shared, read-only model
#[derive(Clone)]
pub struct GenreAnalyzer {
    classifier: Arc<dyn GenreClassifier>,
    config: FeatureConfig,
}

impl GenreAnalyzer {
    /// Create an analyzer for a loaded classifier
    pub fn new(classifier: Arc<dyn GenreClassifier>, config: FeatureConfig) -> Result<Self, FeatureError> {
        config.validate()?;

        if let Some(n) = classifier.n_features() {
            if n != config.n_mfcc {
                log::warn!(
                    "GenreAnalyzer: model expects {} features but extraction produces {}; analyses will fail",
                    n,
                    config.n_mfcc
                );
            }
        }

        Ok(Self { classifier, config })
    }

    pub fn classifier(&self) -> &dyn GenreClassifier {
        self.classifier.as_ref()
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Analyze an in-memory upload (`extension` is a format hint like "mp3")
    pub fn analyze_bytes(&self, bytes: Vec<u8>, extension: Option<&str>) -> Result<GenrePrediction, AnalysisError> {
        let audio = audio_file::load_bytes(bytes, extension, &self.config.load_options())?;
        self.analyze_audio(&audio)
    }

    /// Analyze an audio file on disk
    pub fn analyze_file(&self, path: &Path) -> Result<GenrePrediction, AnalysisError> {
        log::info!("analyze_file: {:?}", path);
        let audio = audio_file::load_file(path, &self.config.load_options())?;
        self.analyze_audio(&audio)
    }

    /// Analyze already decoded audio
    pub fn analyze_audio(&self, audio: &DecodedAudio) -> Result<GenrePrediction, AnalysisError> {
        let features = extract_features(audio, &self.config)?;
        let prediction = predict_genre(self.classifier.as_ref(), &features)?;
        log::info!(
            "analyze_audio: {} ({}) from {:.1}s of audio",
            prediction.display_label(),
            prediction.confidence_text(),
            audio.duration_secs()
        );
        Ok(prediction)
    }

    /// Extract the feature vector only (for inspection and model debugging)
    pub fn features_for_bytes(&self, bytes: Vec<u8>, extension: Option<&str>) -> Result<Vec<f32>, AnalysisError> {
        let audio = audio_file::load_bytes(bytes, extension, &self.config.load_options())?;
        Ok(extract_features(&audio, &self.config)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_file::test_audio::{sine, wav_bytes};
    use crate::classifier::{load_classifier, LinearClassifier, LinearModel, ModelError, ModelOptions};
    use crate::types::N_MFCC;

    const GENRES: [&str; 4] = ["blues", "classical", "metal", "pop"];

    /// Deterministic 4-class model over 40 MFCC means, standardized so the
    /// logits stay in a sensible range
    fn mfcc_model() -> LinearModel {
        let coef = (0..GENRES.len())
            .map(|c| {
                (0..N_MFCC)
                    .map(|i| (((c * 7 + i * 3) % 11) as f32 - 5.0) / 10.0)
                    .collect()
            })
            .collect();
        LinearModel {
            classes: GENRES.iter().map(|s| s.to_string()).collect(),
            coef,
            intercept: vec![0.0, 0.2, -0.2, 0.1],
            scaler: Some(crate::classifier::StandardScaler {
                mean: vec![-20.0; N_MFCC],
                scale: vec![50.0; N_MFCC],
            }),
        }
    }

    fn analyzer(target_sample_rate: Option<u32>) -> GenreAnalyzer {
        let classifier = Arc::new(LinearClassifier::new(mfcc_model()).unwrap());
        let config = FeatureConfig {
            target_sample_rate,
            ..Default::default()
        };
        GenreAnalyzer::new(classifier, config).unwrap()
    }

    fn noise(len: usize, seed: u32) -> Vec<f32> {
        let mut state = seed.wrapping_mul(2654435761).max(1);
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state as f32 / u32::MAX as f32) - 0.5
            })
            .collect()
    }

    #[test]
    fn test_analyze_wav_upload() {
        let analyzer = analyzer(Some(22050));
        let bytes = wav_bytes(&sine(440.0, 44100, 2.0), 44100, 1);
        let prediction = analyzer.analyze_bytes(bytes, Some("wav")).unwrap();

        assert_eq!(prediction.scores.len(), GENRES.len());
        let total: f32 = prediction.scores.iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-5, "Probabilities sum to {}", total);
        assert!((0.0..=100.0).contains(&prediction.confidence_pct));
        assert!(GENRES.contains(&prediction.label.as_str()));
    }

    #[test]
    fn test_label_matches_highest_score() {
        let analyzer = analyzer(None);
        for freq in [110.0, 880.0, 3000.0] {
            let bytes = wav_bytes(&sine(freq, 16000, 1.0), 16000, 1);
            let prediction = analyzer.analyze_bytes(bytes, Some("wav")).unwrap();
            let (best, best_p) = prediction
                .scores
                .iter()
                .cloned()
                .fold((String::new(), -1.0f32), |acc, (l, p)| if p > acc.1 { (l, p) } else { acc });
            assert_eq!(prediction.label, best);
            assert!((prediction.confidence_pct - best_p * 100.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_sub_second_clip_yields_full_vector() {
        let analyzer = analyzer(None);
        let bytes = wav_bytes(&sine(440.0, 8000, 0.05), 8000, 1);
        let features = analyzer.features_for_bytes(bytes, Some("wav")).unwrap();
        assert_eq!(features.len(), N_MFCC);
    }

    #[test]
    fn test_audio_after_thirty_seconds_is_ignored() {
        let analyzer = analyzer(None);
        let sr = 8000;
        let head = sine(330.0, sr, 30.0);

        let mut with_noise_tail = head.clone();
        with_noise_tail.extend(noise(5 * sr as usize, 7));
        let mut with_tone_tail = head.clone();
        with_tone_tail.extend(sine(2000.0, sr, 8.0));

        let a = analyzer
            .features_for_bytes(wav_bytes(&with_noise_tail, sr, 1), Some("wav"))
            .unwrap();
        let b = analyzer
            .features_for_bytes(wav_bytes(&with_tone_tail, sr, 1), Some("wav"))
            .unwrap();
        let exact = analyzer.features_for_bytes(wav_bytes(&head, sr, 1), Some("wav")).unwrap();

        assert_eq!(a, b, "Tail content must not influence features");
        assert_eq!(a, exact);
    }

    #[test]
    fn test_failure_does_not_affect_next_analysis() {
        let analyzer = analyzer(Some(22050));
        let good = wav_bytes(&sine(440.0, 22050, 1.0), 22050, 1);

        let before = analyzer.analyze_bytes(good.clone(), Some("wav")).unwrap();

        let err = analyzer
            .analyze_bytes(b"this is not audio at all".to_vec(), Some("wav"))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Audio(_)), "Unexpected error: {:?}", err);
        assert!(!err.to_string().is_empty());

        let after = analyzer.analyze_bytes(good, Some("wav")).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_feature_count_mismatch_is_recoverable() {
        let classifier = Arc::new(LinearClassifier::new(mfcc_model()).unwrap());
        let config = FeatureConfig {
            n_mfcc: 20,
            target_sample_rate: None,
            ..Default::default()
        };
        let analyzer = GenreAnalyzer::new(classifier, config).unwrap();
        let bytes = wav_bytes(&sine(440.0, 8000, 1.0), 8000, 1);

        let err = analyzer.analyze_bytes(bytes, Some("wav")).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Classifier(ClassifierError::ShapeMismatch { expected: 40, actual: 20 })
        ));
    }

    #[test]
    fn test_analyze_file() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("genre_model.json");
        std::fs::write(&model_path, serde_json::to_string(&mfcc_model()).unwrap()).unwrap();
        let clip_path = dir.path().join("clip.wav");
        std::fs::write(&clip_path, wav_bytes(&sine(220.0, 22050, 1.5), 22050, 1)).unwrap();

        let classifier = load_classifier(&model_path, &ModelOptions::default()).unwrap();
        let analyzer = GenreAnalyzer::new(classifier, FeatureConfig::default()).unwrap();
        let prediction = analyzer.analyze_file(&clip_path).unwrap();
        assert_eq!(prediction.scores.len(), 4);

        let missing = analyzer.analyze_file(&dir.path().join("missing.mp3")).unwrap_err();
        assert!(matches!(missing, AnalysisError::Audio(AudioError::Read { .. })));
    }

    #[test]
    fn test_missing_model_never_yields_analyzer() {
        let result = load_classifier(Path::new("/no/such/genre_model.json"), &ModelOptions::default())
            .map(|c| GenreAnalyzer::new(c, FeatureConfig::default()));
        assert!(matches!(result, Err(ModelError::NotFound(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let classifier = Arc::new(LinearClassifier::new(mfcc_model()).unwrap());
        let config = FeatureConfig {
            n_mfcc: 200,
            ..Default::default()
        };
        assert!(GenreAnalyzer::new(classifier, config).is_err());
    }
}

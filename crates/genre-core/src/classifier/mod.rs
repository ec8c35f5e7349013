//! Pre-trained genre classifiers
//!
//! Any model the pipeline can use exposes the same capability set:
//! `classes()`, `predict()` and `predict_proba()`, all over a batch matrix
//! (one row per clip). Models are loaded once with [`load_classifier`] and
//! shared read-only as `Arc<dyn GenreClassifier>`.
//!
//! Supported model files:
//! - `.json` / `.yaml` / `.yml`: serialized linear (logistic regression) model
//! - `.onnx`: ONNX model run through ONNX Runtime, labels from a sidecar file
//!   (requires the `onnx` feature)

mod error;
mod linear;
#[cfg(feature = "onnx")]
mod onnx;

pub use error::{ClassifierError, ModelError};
pub use linear::{LinearClassifier, LinearModel, StandardScaler};
#[cfg(feature = "onnx")]
pub use onnx::{default_labels_path, read_labels, OnnxClassifier};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::{Array2, ArrayView1, ArrayView2};

/// Input tensor name used by scikit-learn ONNX exports
pub const DEFAULT_ONNX_INPUT: &str = "float_input";

/// Capability set every genre model provides
pub trait GenreClassifier: Send + Sync {
    /// Known labels, in the model's fixed output order
    fn classes(&self) -> &[String];

    /// Probability rows (one per input row) in `classes()` order
    fn predict_proba(&self, features: ArrayView2<'_, f32>) -> Result<Array2<f32>, ClassifierError>;

    /// Most likely label per input row
    ///
    /// Derived from `predict_proba`, so the label is always the arg-max of
    /// the probability row.
    fn predict(&self, features: ArrayView2<'_, f32>) -> Result<Vec<String>, ClassifierError> {
        let proba = self.predict_proba(features)?;
        let classes = self.classes();

        proba
            .rows()
            .into_iter()
            .map(|row| {
                argmax(row)
                    .and_then(|i| classes.get(i).cloned())
                    .ok_or_else(|| ClassifierError::InvalidOutput("no class for probability row".to_string()))
            })
            .collect()
    }

    /// Feature count the model was fitted on, if known
    fn n_features(&self) -> Option<usize> {
        None
    }

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Index of the largest value (first one on ties, NaN never wins)
pub fn argmax(values: ArrayView1<'_, f32>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Options for loading a model file
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOptions {
    /// Label file for ONNX models (default: `<model>.labels.txt`)
    pub labels_path: Option<PathBuf>,
    /// ONNX input tensor name
    pub input_name: String,
    /// ONNX Runtime intra-op threads
    pub intra_threads: usize,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            labels_path: None,
            input_name: DEFAULT_ONNX_INPUT.to_string(),
            intra_threads: 1,
        }
    }
}

/// Load a classifier from disk, choosing the backend by file extension
pub fn load_classifier(path: &Path, options: &ModelOptions) -> Result<Arc<dyn GenreClassifier>, ModelError> {
    if !path.exists() {
        return Err(ModelError::NotFound(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let classifier: Arc<dyn GenreClassifier> = match extension.as_str() {
        "json" => Arc::new(LinearClassifier::from_json_file(path)?),
        "yaml" | "yml" => Arc::new(LinearClassifier::from_yaml_file(path)?),
        "onnx" => load_onnx(path, options)?,
        other => {
            return Err(ModelError::UnsupportedFormat(format!(
                "'{}' (expected .json, .yaml or .onnx)",
                other
            )))
        }
    };

    log::info!(
        "load_classifier: {} model from {:?} with {} classes",
        classifier.name(),
        path,
        classifier.classes().len()
    );

    Ok(classifier)
}

#[cfg(feature = "onnx")]
fn load_onnx(path: &Path, options: &ModelOptions) -> Result<Arc<dyn GenreClassifier>, ModelError> {
    Ok(Arc::new(OnnxClassifier::load(path, options)?))
}

#[cfg(not(feature = "onnx"))]
fn load_onnx(_path: &Path, _options: &ModelOptions) -> Result<Arc<dyn GenreClassifier>, ModelError> {
    Err(ModelError::UnsupportedFormat(
        "ONNX models require the `onnx` feature".to_string(),
    ))
}

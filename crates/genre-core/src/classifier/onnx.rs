//! ONNX Runtime classifier
//!
//! Runs a classifier exported to ONNX (for example a scikit-learn pipeline
//! converted with probabilities as a plain tensor). The probability output is
//! the float tensor whose size matches `batch x classes`; any label output the
//! model carries is ignored and the label is taken as the arg-max instead.
//!
//! ONNX files do not carry readable class names, so labels come from a
//! sidecar text file with one label per line in model output order.
//! `Session::run` needs `&mut`, so the session sits behind a `Mutex`.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use ndarray::{Array2, ArrayView2};
use ort::environment::Environment;
use ort::session::Session;
use ort::value::Tensor;

use super::{ClassifierError, GenreClassifier, ModelError, ModelOptions};

/// Process-wide ONNX Runtime environment
///
/// ONNX Runtime allows one environment per process, so every session shares it.
fn environment() -> Result<&'static Environment, ModelError> {
    static ENVIRONMENT: OnceLock<Result<Environment, String>> = OnceLock::new();
    ENVIRONMENT
        .get_or_init(|| ort::init().with_name("genre-ai").build().map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| ModelError::Backend(format!("Failed to initialize ONNX Runtime: {}", e)))
}

/// Classifier backed by an ONNX Runtime session
pub struct OnnxClassifier {
    session: Mutex<Session>,
    classes: Vec<String>,
    input_name: String,
}

impl OnnxClassifier {
    /// Load the model and its label file
    pub fn load(path: &Path, options: &ModelOptions) -> Result<Self, ModelError> {
        let labels_path = options
            .labels_path
            .clone()
            .unwrap_or_else(|| default_labels_path(path));
        let classes = read_labels(&labels_path)?;

        let load_error = |e: String| ModelError::Backend(format!("Failed to load ONNX model {:?}: {}", path, e));
        let session = Session::builder(environment()?)
            .map_err(|e| load_error(e.to_string()))?
            .with_intra_threads(options.intra_threads.max(1))
            .map_err(|e| load_error(e.to_string()))?
            .commit_from_file(path)
            .map_err(|e| load_error(e.to_string()))?;

        log::debug!(
            "OnnxClassifier: loaded {:?} with {} labels from {:?}",
            path,
            classes.len(),
            labels_path
        );

        Ok(Self {
            session: Mutex::new(session),
            classes,
            input_name: options.input_name.clone(),
        })
    }
}

impl GenreClassifier for OnnxClassifier {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn predict_proba(&self, features: ArrayView2<'_, f32>) -> Result<Array2<f32>, ClassifierError> {
        let n_rows = features.nrows();
        let n_classes = self.classes.len();
        if n_rows == 0 {
            return Err(ClassifierError::EmptyInput);
        }

        let input_tensor = Tensor::from_array(features.to_owned())
            .map_err(|e| ClassifierError::Inference(format!("tensor creation error: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ClassifierError::Inference("ONNX session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        // Label outputs are int64/string tensors and fail f32 extraction
        for (name, value) in outputs.iter() {
            let Ok((_shape, data)) = value.try_extract_tensor::<f32>() else {
                continue;
            };
            if data.len() != n_rows * n_classes {
                log::debug!(
                    "OnnxClassifier: skipping output '{}' with {} values",
                    name,
                    data.len()
                );
                continue;
            }
            return Array2::from_shape_vec((n_rows, n_classes), data.to_vec())
                .map_err(|e| ClassifierError::InvalidOutput(format!("probability shape error: {}", e)));
        }

        Err(ClassifierError::InvalidOutput(format!(
            "no float output with {} x {} probabilities",
            n_rows, n_classes
        )))
    }

    fn name(&self) -> &'static str {
        "onnx"
    }
}

/// Sidecar label file for a model: `genre_model.onnx` -> `genre_model.labels.txt`
pub fn default_labels_path(model_path: &Path) -> PathBuf {
    model_path.with_extension("labels.txt")
}

/// Read one label per line, skipping blank lines and `#` comments
pub fn read_labels(path: &Path) -> Result<Vec<String>, ModelError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ModelError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    let labels: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();

    if labels.len() < 2 {
        return Err(ModelError::Invalid(format!(
            "label file {:?} lists {} classes, expected at least 2",
            path,
            labels.len()
        )));
    }

    Ok(labels)
}

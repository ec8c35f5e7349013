//! Linear (logistic regression) classifier loaded from JSON or YAML
//!
//! The file mirrors the fitted attributes of a multinomial logistic
//! regression, optionally preceded by standardization:
//!
//! ```json
//! {
//!   "classes": ["blues", "classical", "rock"],
//!   "coef": [[...], [...], [...]],
//!   "intercept": [0.1, -0.3, 0.2],
//!   "scaler": { "mean": [...], "scale": [...] }
//! }
//! ```
//!
//! Binary models may carry a single coefficient row; the row scores the
//! second class and the first class gets the complement.

use std::path::Path;

use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::{ClassifierError, GenreClassifier, ModelError};

/// Standardization applied before the linear map: (x - mean) / scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f32>,
    pub scale: Vec<f32>,
}

/// Serialized form of a fitted linear model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub classes: Vec<String>,
    /// One row per class (or a single row for binary models)
    pub coef: Vec<Vec<f32>>,
    pub intercept: Vec<f32>,
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
}

/// Validated linear classifier ready for inference
#[derive(Debug, Clone)]
pub struct LinearClassifier {
    classes: Vec<String>,
    /// n_rows x n_features
    weights: Array2<f32>,
    intercept: Array1<f32>,
    scaler: Option<(Array1<f32>, Array1<f32>)>,
    binary: bool,
}

impl LinearClassifier {
    /// Validate a deserialized model
    pub fn new(model: LinearModel) -> Result<Self, ModelError> {
        let n_classes = model.classes.len();
        if n_classes < 2 {
            return Err(ModelError::Invalid(format!("expected at least 2 classes, got {}", n_classes)));
        }
        for (i, label) in model.classes.iter().enumerate() {
            if model.classes[..i].contains(label) {
                return Err(ModelError::Invalid(format!("duplicate class label '{}'", label)));
            }
        }

        let n_rows = model.coef.len();
        let binary = n_classes == 2 && n_rows == 1;
        if !binary && n_rows != n_classes {
            return Err(ModelError::Invalid(format!(
                "coef has {} rows for {} classes",
                n_rows, n_classes
            )));
        }

        let n_features = model.coef.first().map_or(0, |row| row.len());
        if n_features == 0 {
            return Err(ModelError::Invalid("coef rows are empty".to_string()));
        }
        if model.coef.iter().any(|row| row.len() != n_features) {
            return Err(ModelError::Invalid("coef rows have different lengths".to_string()));
        }
        if model.intercept.len() != n_rows {
            return Err(ModelError::Invalid(format!(
                "intercept has {} values for {} coef rows",
                model.intercept.len(),
                n_rows
            )));
        }

        let scaler = match model.scaler {
            Some(scaler) => {
                if scaler.mean.len() != n_features || scaler.scale.len() != n_features {
                    return Err(ModelError::Invalid(format!(
                        "scaler has {}/{} values for {} features",
                        scaler.mean.len(),
                        scaler.scale.len(),
                        n_features
                    )));
                }
                if scaler.scale.iter().any(|s| *s == 0.0 || !s.is_finite()) {
                    return Err(ModelError::Invalid("scaler scale must be finite and non-zero".to_string()));
                }
                Some((Array1::from(scaler.mean), Array1::from(scaler.scale)))
            }
            None => None,
        };

        let flat: Vec<f32> = model.coef.into_iter().flatten().collect();
        let weights = Array2::from_shape_vec((n_rows, n_features), flat)
            .map_err(|e| ModelError::Invalid(format!("coef shape error: {}", e)))?;

        Ok(Self {
            classes: model.classes,
            weights,
            intercept: Array1::from(model.intercept),
            scaler,
            binary,
        })
    }

    /// Load from a JSON model file
    pub fn from_json_file(path: &Path) -> Result<Self, ModelError> {
        let contents = read_model_file(path)?;
        let model: LinearModel = serde_json::from_str(&contents).map_err(|e| ModelError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::new(model)
    }

    /// Load from a YAML model file
    pub fn from_yaml_file(path: &Path) -> Result<Self, ModelError> {
        let contents = read_model_file(path)?;
        let model: LinearModel = serde_yaml::from_str(&contents).map_err(|e| ModelError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::new(model)
    }
}

fn read_model_file(path: &Path) -> Result<String, ModelError> {
    std::fs::read_to_string(path).map_err(|e| ModelError::Read {
        path: path.to_path_buf(),
        source: e,
    })
}

impl GenreClassifier for LinearClassifier {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn predict_proba(&self, features: ArrayView2<'_, f32>) -> Result<Array2<f32>, ClassifierError> {
        let n_features = self.weights.ncols();
        if features.nrows() == 0 {
            return Err(ClassifierError::EmptyInput);
        }
        if features.ncols() != n_features {
            return Err(ClassifierError::ShapeMismatch {
                expected: n_features,
                actual: features.ncols(),
            });
        }

        let mut x = features.to_owned();
        if let Some((mean, scale)) = &self.scaler {
            x -= mean;
            x /= scale;
        }

        let logits = x.dot(&self.weights.t()) + &self.intercept;

        let proba = if self.binary {
            let positive = logits.column(0).mapv(sigmoid);
            let mut proba = Array2::<f32>::zeros((x.nrows(), 2));
            proba.column_mut(0).assign(&positive.mapv(|p| 1.0 - p));
            proba.column_mut(1).assign(&positive);
            proba
        } else {
            let mut proba = logits;
            for mut row in proba.axis_iter_mut(Axis(0)) {
                let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
                row.mapv_inplace(|v| (v - max).exp());
                let sum = row.sum();
                row.mapv_inplace(|v| v / sum);
            }
            proba
        };

        if proba.iter().any(|p| !p.is_finite()) {
            return Err(ClassifierError::InvalidOutput("non-finite probability".to_string()));
        }

        Ok(proba)
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.weights.ncols())
    }

    fn name(&self) -> &'static str {
        "linear"
    }
}

fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

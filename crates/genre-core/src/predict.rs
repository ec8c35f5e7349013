//! Prediction: feature vector in, labelled probability distribution out

use ndarray::Array2;

use crate::classifier::{ClassifierError, GenreClassifier};

/// Result of classifying one clip
#[derive(Debug, Clone, PartialEq)]
pub struct GenrePrediction {
    /// Predicted label as the model names it (e.g. "rock")
    pub label: String,
    /// Probability per known label, in the classifier's class order
    pub scores: Vec<(String, f32)>,
    /// 100 x the highest probability
    pub confidence_pct: f32,
}

impl GenrePrediction {
    /// Label as shown to the user
    pub fn display_label(&self) -> String {
        self.label.to_uppercase()
    }

    /// Confidence with two decimals, e.g. "87.25%"
    pub fn confidence_text(&self) -> String {
        format!("{:.2}%", self.confidence_pct)
    }

    /// Probability assigned to `label`, if the model knows it
    pub fn probability_of(&self, label: &str) -> Option<f32> {
        self.scores.iter().find(|(l, _)| l == label).map(|(_, p)| *p)
    }
}

/// Classify one feature vector
///
/// The vector is reshaped to a 1 x n matrix and the same matrix is given to
/// `predict` and `predict_proba`, so label and distribution agree.
pub fn predict_genre(classifier: &dyn GenreClassifier, features: &[f32]) -> Result<GenrePrediction, ClassifierError> {
    if features.is_empty() {
        return Err(ClassifierError::EmptyInput);
    }

    let matrix = Array2::from_shape_vec((1, features.len()), features.to_vec())
        .map_err(|e| ClassifierError::Inference(format!("feature shape error: {}", e)))?;

    let label = classifier
        .predict(matrix.view())?
        .into_iter()
        .next()
        .ok_or_else(|| ClassifierError::InvalidOutput("classifier returned no label".to_string()))?;

    let proba = classifier.predict_proba(matrix.view())?;
    let classes = classifier.classes();
    if proba.nrows() != 1 || proba.ncols() != classes.len() {
        return Err(ClassifierError::InvalidOutput(format!(
            "expected 1 x {} probabilities, got {} x {}",
            classes.len(),
            proba.nrows(),
            proba.ncols()
        )));
    }

    let row = proba.row(0);
    let max = row.iter().copied().fold(0.0f32, f32::max);
    let confidence_pct = (max * 100.0).clamp(0.0, 100.0);

    let scores: Vec<(String, f32)> = classes.iter().cloned().zip(row.iter().copied()).collect();

    log::debug!("predict_genre: {} ({:.2}%)", label, confidence_pct);

    Ok(GenrePrediction {
        label,
        scores,
        confidence_pct,
    })
}

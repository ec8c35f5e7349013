//! Rendering of analysis results for the terminal

use genre_core::GenrePrediction;
use serde::Serialize;

use crate::config::{DisplayConfig, OutputFormat};

const BAR_FILL: char = '█';

/// One row of the probability chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreEntry {
    pub label: String,
    pub probability: f32,
}

/// JSON form of a successful analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionReport {
    pub label: String,
    pub display_label: String,
    pub confidence_pct: f32,
    pub scores: Vec<ScoreEntry>,
}

impl From<&GenrePrediction> for PredictionReport {
    fn from(prediction: &GenrePrediction) -> Self {
        Self {
            label: prediction.label.clone(),
            display_label: prediction.display_label(),
            confidence_pct: prediction.confidence_pct,
            scores: prediction
                .scores
                .iter()
                .map(|(label, probability)| ScoreEntry {
                    label: label.clone(),
                    probability: *probability,
                })
                .collect(),
        }
    }
}

/// Render a prediction in the configured format
pub fn render_prediction(prediction: &GenrePrediction, display: &DisplayConfig) -> String {
    match display.output {
        OutputFormat::Text => render_text(prediction, display.chart_width),
        OutputFormat::Json => render_json(prediction),
    }
}

/// Headline, metric and one bar per class in class order
pub fn render_text(prediction: &GenrePrediction, chart_width: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("This sounds like: {}\n\n", prediction.display_label()));
    out.push_str(&format!(
        "Identified genre: {} ({} confidence)\n\n",
        prediction.display_label(),
        prediction.confidence_text()
    ));
    out.push_str("Probability by genre:\n");

    let label_width = prediction
        .scores
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0);

    for (label, probability) in &prediction.scores {
        let bar = bar(*probability, chart_width);
        out.push_str(&format!(
            "  {:<label_width$}  {:<chart_width$}  {:>6.2}%\n",
            label,
            bar,
            probability * 100.0,
            label_width = label_width,
            chart_width = chart_width
        ));
    }

    out
}

/// Pretty-printed JSON document
pub fn render_json(prediction: &GenrePrediction) -> String {
    let report = PredictionReport::from(prediction);
    match serde_json::to_string_pretty(&report) {
        Ok(json) => json,
        Err(e) => {
            log::warn!("render_json: Failed to serialize prediction: {}", e);
            render_error_json(&e.to_string())
        }
    }
}

/// Failure message in the configured format
pub fn render_failure(message: &str, display: &DisplayConfig) -> String {
    match display.output {
        OutputFormat::Text => render_error(message),
        OutputFormat::Json => render_error_json(message),
    }
}

pub fn render_error(message: &str) -> String {
    format!("Analysis failed: {}", message)
}

fn render_error_json(message: &str) -> String {
    serde_json::json!({ "error": render_error(message) }).to_string()
}

/// Bar of `round(probability * width)` cells, clamped to the chart
fn bar(probability: f32, width: usize) -> String {
    let cells = (probability.clamp(0.0, 1.0) * width as f32).round() as usize;
    std::iter::repeat(BAR_FILL).take(cells.min(width)).collect()
}

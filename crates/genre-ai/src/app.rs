//! Application session: model loaded once, then one analysis per request
//!
//! A session only exists if the model loaded. Each analysis ends in an
//! [`AnalysisOutcome`]; failures are reported and the session stays ready for
//! the next file.

use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};
use genre_core::{load_classifier, GenreAnalyzer, GenrePrediction};

use crate::config::{Config, DisplayConfig};
use crate::report;

/// Result of one analysis action
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Success(GenrePrediction),
    /// Error text shown to the user
    Failure(String),
}

impl AnalysisOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisOutcome::Success(_))
    }
}

/// Ready-to-analyze session
pub struct App {
    analyzer: GenreAnalyzer,
    display: DisplayConfig,
}

impl App {
    /// Load the model and build the analyzer
    ///
    /// Fails if the model cannot be loaded; callers treat this as fatal.
    pub fn start(config: &Config) -> Result<Self> {
        let classifier = load_classifier(&config.model.path, &config.model.model_options())?;
        let analyzer = GenreAnalyzer::new(classifier, config.features.clone())
            .context("Invalid feature configuration")?;

        log::info!(
            "App::start: ready with {} genres: {}",
            analyzer.classifier().classes().len(),
            analyzer.classifier().classes().join(", ")
        );

        Ok(Self {
            analyzer,
            display: config.display.clone(),
        })
    }

    /// Analyze one file on disk
    pub fn analyze_path(&self, path: &Path) -> AnalysisOutcome {
        match self.analyzer.analyze_file(path) {
            Ok(prediction) => AnalysisOutcome::Success(prediction),
            Err(e) => {
                log::warn!("analyze_path: {:?} failed: {}", path, e);
                AnalysisOutcome::Failure(e.to_string())
            }
        }
    }

    /// Analyze an in-memory upload
    pub fn analyze_bytes(&self, bytes: Vec<u8>, extension: Option<&str>) -> AnalysisOutcome {
        match self.analyzer.analyze_bytes(bytes, extension) {
            Ok(prediction) => AnalysisOutcome::Success(prediction),
            Err(e) => {
                log::warn!("analyze_bytes: analysis failed: {}", e);
                AnalysisOutcome::Failure(e.to_string())
            }
        }
    }

    /// Render an outcome in the configured output format
    pub fn render(&self, outcome: &AnalysisOutcome) -> String {
        match outcome {
            AnalysisOutcome::Success(prediction) => report::render_prediction(prediction, &self.display),
            AnalysisOutcome::Failure(message) => report::render_failure(message, &self.display),
        }
    }

    /// Analyze each path in order, writing one report per path
    ///
    /// Returns the number of successful analyses.
    pub fn run_files<W: Write>(&self, paths: &[impl AsRef<Path>], output: &mut W) -> Result<usize> {
        let mut succeeded = 0;
        for path in paths {
            let path = path.as_ref();
            let outcome = self.analyze_path(path);
            if outcome.is_success() {
                succeeded += 1;
            }
            if paths.len() > 1 {
                writeln!(output, "== {}", path.display())?;
            }
            writeln!(output, "{}", self.render(&outcome))?;
        }
        Ok(succeeded)
    }

    /// Read one path per line until `quit`, `exit` or end of input
    ///
    /// Blank lines are ignored and surrounding quotes are stripped, so paths
    /// dropped into a terminal work as-is. Returns the number of successful
    /// analyses, like [`App::run_files`].
    pub fn run_interactive<R: BufRead, W: Write>(&self, input: R, output: &mut W) -> Result<usize> {
        let mut succeeded = 0;
        let mut lines = input.lines();

        loop {
            write!(output, "Audio file (mp3, wav, flac, ogg)> ")?;
            output.flush()?;

            let Some(line) = lines.next() else {
                writeln!(output)?;
                break;
            };
            let line = line.context("Failed to read from stdin")?;
            let request = line.trim().trim_matches(|c: char| c == '"' || c == '\'');

            if request.is_empty() {
                continue;
            }
            if request.eq_ignore_ascii_case("quit") || request.eq_ignore_ascii_case("exit") {
                break;
            }

            let outcome = self.analyze_path(Path::new(request));
            if outcome.is_success() {
                succeeded += 1;
            }
            writeln!(output, "{}", self.render(&outcome))?;
        }

        Ok(succeeded)
    }
}

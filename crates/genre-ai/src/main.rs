//! Genre AI - command line genre recognition
//!
//! ```bash
//! genre-ai song.mp3 other.flac      # analyze files
//! genre-ai                          # interactive: one path per line
//! genre-ai --json --model gtzan.onnx clip.wav
//! ```

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use genre_ai::{default_config_path, load_config, save_config, App, Config, OutputFormat};
use genre_core::ModelError;

/// Identify the musical genre of audio clips
#[derive(Parser, Debug)]
#[command(name = "genre-ai", version)]
#[command(about = "Identify the musical genre of audio clips from their first 30 seconds")]
struct Args {
    /// Audio files to analyze (interactive mode when omitted)
    #[arg(value_name = "FILES")]
    files: Vec<PathBuf>,

    /// Model file (.onnx, .json or .yaml)
    #[arg(long, value_name = "PATH")]
    model: Option<PathBuf>,

    /// Label file for ONNX models (default: <model>.labels.txt)
    #[arg(long, value_name = "PATH")]
    labels: Option<PathBuf>,

    /// Configuration file (default: ~/.config/genre-ai/config.yaml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print one JSON document per analysis
    #[arg(long)]
    json: bool,

    /// Extract features at the decoder's native sample rate
    #[arg(long)]
    native_rate: bool,

    /// Write the effective configuration to the config path and exit
    #[arg(long)]
    write_config: bool,
}

impl Args {
    /// Command line flags take precedence over the config file
    fn apply(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.model.path = model.clone();
        }
        if let Some(labels) = &self.labels {
            config.model.labels_path = Some(labels.clone());
        }
        if self.json {
            config.display.output = OutputFormat::Json;
        }
        if self.native_rate {
            config.features.target_sample_rate = None;
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let mut config = load_config(&config_path);
    args.apply(&mut config);
    config.validate();

    if args.write_config {
        return match save_config(&config, &config_path) {
            Ok(()) => {
                println!("Configuration written to {}", config_path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {:#}", e);
                ExitCode::from(1)
            }
        };
    }

    let app = match App::start(&config) {
        Ok(app) => app,
        Err(e) => {
            log::error!("main: model load failed: {:#}", e);
            eprintln!("Error loading model: {:#}", e);
            if e.downcast_ref::<ModelError>().is_some() {
                eprintln!("Make sure you've run training first.");
            }
            return ExitCode::from(1);
        }
    };

    let result = if args.files.is_empty() {
        println!("Upload an audio file to identify its genre. Type 'quit' to exit.");
        let stdin = io::stdin();
        app.run_interactive(stdin.lock(), &mut io::stdout())
    } else {
        app.run_files(&args.files, &mut io::stdout())
    };

    match result {
        Ok(succeeded) => {
            log::info!("main: {} successful analyses", succeeded);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

//! Panel Reader CLI
//!
//! Reads one or more panel photos and prints one JSON line per image.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use panel_reader::config::{self, AppConfig, LayoutStrategy};
use panel_reader::storage::{self, TrainingWriter};
use panel_reader::vision::diagnostics::load_font;
use panel_reader::vision::{
    CommandRecognizer, Diagnostics, DirectoryDiagnostics, LayoutSource, NoDiagnostics, PanelLayout,
    ThresholdLayout,
};
use panel_reader::{Detection, PanelFrame, PanelReader, Services};

/// Panel Reader - roaster control panel display reader
#[derive(Parser, Debug)]
#[command(name = "panel-reader")]
#[command(about = "Reads the seven-segment displays of a roaster control panel")]
struct Args {
    /// Panel images to read
    #[arg(required_unless_present = "write_default_config")]
    images: Vec<PathBuf>,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Candidate region strategy
    #[arg(short, long, value_enum)]
    strategy: Option<LayoutStrategy>,

    /// OCR command for display crops, `{image}` is replaced by the crop path
    #[arg(long)]
    ocr_command: Option<String>,

    /// Write intermediate step images to this directory
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    /// Export recognized crops as training data under this directory
    #[arg(long)]
    training_dir: Option<PathBuf>,

    /// Write the default configuration to the config path and exit
    #[arg(long)]
    write_default_config: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => storage::get_config_dir()?.join("config.toml"),
    };

    if args.write_default_config {
        config::save_config(&AppConfig::default(), &config_path)?;
        info!("Wrote default configuration to {:?}", config_path);
        return Ok(());
    }

    let config = load_or_default_config(&config_path, args.config.is_some())?;
    let config = apply_overrides(config, &args);

    run(&config, &args.images)
}

/// Load configuration from file, falling back to defaults when the
/// default location has none
fn load_or_default_config(path: &Path, explicit: bool) -> Result<AppConfig> {
    if explicit || path.exists() {
        let config = config::load_config(path)?;
        info!("Loaded configuration from {:?}", path);
        return Ok(config);
    }
    info!("Using default configuration");
    Ok(AppConfig::default())
}

fn apply_overrides(mut config: AppConfig, args: &Args) -> AppConfig {
    if let Some(strategy) = args.strategy {
        config.recognition.strategy = strategy;
    }
    if let Some(command) = &args.ocr_command {
        config.recognition.command = command.split_whitespace().map(str::to_string).collect();
    }
    if let Some(dir) = &args.debug_dir {
        config.diagnostics.enabled = true;
        config.diagnostics.output_dir = Some(dir.clone());
    }
    if let Some(dir) = &args.training_dir {
        config.training.enabled = true;
        config.training.output_dir = Some(dir.clone());
    }
    config
}

fn run(config: &AppConfig, images: &[PathBuf]) -> Result<()> {
    let reader = PanelReader::new(config);
    let recognizer = CommandRecognizer::new(&config.recognition);

    let mut diagnostics: Box<dyn Diagnostics> = match (&config.diagnostics.output_dir, config.diagnostics.enabled) {
        (Some(dir), true) => {
            let font = load_font(config.diagnostics.font_path.as_deref())?;
            Box::new(
                DirectoryDiagnostics::new(dir)
                    .with_context(|| format!("Failed to create debug directory {:?}", dir))?
                    .with_font(font, config.diagnostics.font_scale),
            )
        }
        _ => Box::new(NoDiagnostics),
    };

    let mut training = match (&config.training.output_dir, config.training.enabled) {
        (Some(dir), true) => Some(TrainingWriter::open(dir)?),
        (None, true) => Some(TrainingWriter::open(&storage::get_data_dir()?)?),
        _ => None,
    };

    let source: Box<dyn LayoutSource + '_> = match config.recognition.strategy {
        LayoutStrategy::Threshold => Box::new(ThresholdLayout::new(config.preprocess.clone())),
        LayoutStrategy::Panel => Box::new(PanelLayout::new(&recognizer)),
    };

    info!("Reading {} images ({:?} strategy)", images.len(), config.recognition.strategy);

    let mut failures = 0;
    for path in images {
        let frame = match PanelFrame::open(path) {
            Ok(frame) => frame,
            Err(e) => {
                error!("{:#}", e);
                failures += 1;
                continue;
            }
        };

        let mut services = Services {
            recognizer: &recognizer,
            diagnostics: diagnostics.as_mut(),
            training: training.as_mut(),
        };

        match reader.detect(&frame, source.as_ref(), &mut services) {
            Ok(detection) => println!("{}", render(&frame.name, &detection)?),
            Err(e) => {
                error!("{}: {}", frame.name, e);
                failures += 1;
            }
        }
    }

    if let Some(writer) = training.as_mut() {
        writer.close()?;
    }

    if failures > 0 {
        anyhow::bail!("{} of {} images could not be read", failures, images.len());
    }
    Ok(())
}

fn render(name: &str, detection: &Detection) -> Result<String> {
    let value = match detection {
        Detection::Found(reading) => serde_json::to_value(reading)?,
        Detection::NotFound(reason) => serde_json::json!({
            "name": name,
            "not_found": reason.to_string(),
        }),
    };
    Ok(serde_json::to_string(&value)?)
}

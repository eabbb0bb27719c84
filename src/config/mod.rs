//! Application Configuration
//!
//! Reader settings stored in TOML format. Every value that tunes the
//! layout inference (threshold levels, calibration table, match distance,
//! margins) lives here rather than in code.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::vision::layout::{default_sections, Section};

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Binarization and region extraction
    pub preprocess: PreprocessSettings,
    /// Radial layout calibration
    pub layout: LayoutSettings,
    /// Display normalization
    pub normalize: NormalizeSettings,
    /// Recognition engine settings
    pub recognition: RecognitionSettings,
    /// Step-by-step diagnostic images
    pub diagnostics: DiagnosticsSettings,
    /// Training-data export
    pub training: TrainingSettings,
}

/// Binarization and region extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessSettings {
    /// Gray level above which a pixel counts as lit
    pub threshold: u8,
    /// Side of the square dilation kernel in pixels
    pub dilation_kernel: u8,
    /// Regions with an area at or below this are discarded
    pub min_area: i64,
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        Self {
            threshold: 200,
            dilation_kernel: 10,
            min_area: 100,
        }
    }
}

/// Layout calibration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Section used as the radial origin
    pub anchor: String,
    /// Height factor of the projection-space transform
    pub projection_height_scale: f32,
    /// Farthest a region center may be from a projected point, in anchor units
    pub max_match_distance: f32,
    /// Hand-measured polar offsets of every display
    pub sections: Vec<Section>,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            anchor: "POWER".to_string(),
            projection_height_scale: 1.0,
            max_match_distance: 1.5,
            sections: default_sections(),
        }
    }
}

/// Display normalization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeSettings {
    /// Pixels added on every side after sizing
    pub margin: i32,
    /// Displays whose glyphs define the common digit box
    pub reference_displays: Vec<String>,
}

impl Default for NormalizeSettings {
    fn default() -> Self {
        Self {
            margin: 10,
            reference_displays: vec![
                "TEMPERATURE".to_string(),
                "POWER".to_string(),
                "FAN".to_string(),
            ],
        }
    }
}

/// How candidate regions are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LayoutStrategy {
    /// Threshold + contour extraction, one engine call per display
    #[default]
    Threshold,
    /// One engine detection pass over the whole panel
    Panel,
}

/// Recognition engine settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionSettings {
    /// Candidate region strategy
    pub strategy: LayoutStrategy,
    /// External OCR command for single crops; `{image}` is replaced with the crop path
    pub command: Vec<String>,
    /// External OCR command for whole-panel detection
    pub panel_command: Vec<String>,
}

/// Diagnostic image settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsSettings {
    pub enabled: bool,
    /// Directory receiving step images
    pub output_dir: Option<PathBuf>,
    /// TrueType font for result labels; a system font is tried when unset
    pub font_path: Option<PathBuf>,
    pub font_scale: f32,
}

impl Default for DiagnosticsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            output_dir: None,
            font_path: None,
            font_scale: 16.0,
        }
    }
}

/// Training-data export settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSettings {
    pub enabled: bool,
    /// Root under which `train_data/` is created
    pub output_dir: Option<PathBuf>,
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {:?}", path))?;
    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config {:?}", path))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

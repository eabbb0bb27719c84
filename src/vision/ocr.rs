//! OCR (Optical Character Recognition) module
//!
//! The recognition engine is external. It is reached through the
//! [`Recognizer`] trait, which exposes its two capability modes:
//! targeted recognition of one small crop, and a single detection +
//! recognition pass over a whole panel.

use image::{DynamicImage, ImageFormat};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::process::Command;
use tracing::{debug, warn};

use super::geometry::Rect;
use crate::config::RecognitionSettings;
use crate::error::PanelError;

/// Placeholder replaced with the crop path in command arguments
pub const IMAGE_PLACEHOLDER: &str = "{image}";

/// Single detection from the engine's panel mode
#[derive(Debug, Clone, PartialEq)]
pub struct OcrResult {
    /// Detected box
    pub rect: Rect,
    /// Recognized text
    pub text: String,
    /// Recognition confidence
    pub confidence: f32,
}

/// A text recognition engine
///
/// Implementations hold no per-call state, so one instance is reused for
/// every display of every frame.
pub trait Recognizer {
    /// Best-guess text for a single cropped display
    fn recognize_crop(&self, image: &DynamicImage) -> Result<String, PanelError>;

    /// Every text box found in a whole panel image
    fn recognize_panel(&self, image: &DynamicImage) -> Result<Vec<OcrResult>, PanelError>;
}

/// Engine adapter that shells out to an external OCR command
///
/// The image is written to a temporary PNG whose path replaces
/// [`IMAGE_PLACEHOLDER`] in the arguments (or is appended when absent).
/// Crop mode reads the trimmed stdout as the text; panel mode expects one
/// `x y w h text` line per detection.
pub struct CommandRecognizer {
    command: Vec<String>,
    panel_command: Vec<String>,
}

impl CommandRecognizer {
    /// Create a recognizer from the configured commands
    pub fn new(settings: &RecognitionSettings) -> Self {
        Self {
            command: settings.command.clone(),
            panel_command: settings.panel_command.clone(),
        }
    }

    fn run(&self, command: &[String], image: &DynamicImage) -> Result<String, PanelError> {
        let (program, args) = command
            .split_first()
            .ok_or(PanelError::EngineNotConfigured("crop"))?;

        let file = tempfile::Builder::new()
            .prefix("panel-reader-")
            .suffix(".png")
            .tempfile()?;
        image.save_with_format(file.path(), ImageFormat::Png)?;
        let image_path = file.path().to_string_lossy().into_owned();

        let mut args: Vec<String> = args
            .iter()
            .map(|arg| arg.replace(IMAGE_PLACEHOLDER, &image_path))
            .collect();
        if !command.iter().any(|arg| arg.contains(IMAGE_PLACEHOLDER)) {
            args.push(image_path);
        }

        let output = Command::new(program).args(&args).output()?;
        if !output.status.success() {
            return Err(PanelError::EngineFailed {
                command: program.clone(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Recognizer for CommandRecognizer {
    fn recognize_crop(&self, image: &DynamicImage) -> Result<String, PanelError> {
        let text = self.run(&self.command, image)?;
        debug!("OCR crop {}x{}: {:?}", image.width(), image.height(), text);
        Ok(text)
    }

    fn recognize_panel(&self, image: &DynamicImage) -> Result<Vec<OcrResult>, PanelError> {
        if self.panel_command.is_empty() {
            return Err(PanelError::EngineNotConfigured("panel"));
        }
        let stdout = self.run(&self.panel_command, image)?;
        Ok(parse_panel_output(&stdout))
    }
}

/// Parse `x y w h text` lines; malformed lines are skipped
pub fn parse_panel_output(stdout: &str) -> Vec<OcrResult> {
    let mut results = Vec::new();

    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let mut parts = line.splitn(5, char::is_whitespace);
        let nums: Vec<Option<i32>> = (0..4)
            .map(|_| parts.next().and_then(|p| p.parse().ok()))
            .collect();
        let text = parts.next().map(str::trim).unwrap_or_default();

        match nums.as_slice() {
            [Some(x), Some(y), Some(w), Some(h)] if *w >= 0 && *h >= 0 && !text.is_empty() => {
                results.push(OcrResult {
                    rect: Rect::new(*x, *y, *w, *h),
                    text: text.to_string(),
                    confidence: 1.0,
                });
            }
            _ => warn!("Skipping malformed panel OCR line: {:?}", line),
        }
    }

    results
}

/// Recognizer replaying canned answers
///
/// Crop answers are handed out in call order; an exhausted queue yields
/// empty strings.
#[derive(Default)]
pub struct ScriptedRecognizer {
    crops: Mutex<VecDeque<String>>,
    panel: Vec<OcrResult>,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue crop answers
    pub fn with_crops<I, S>(self, answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.crops.lock().extend(answers.into_iter().map(Into::into));
        self
    }

    /// Set the panel-mode detections
    pub fn with_panel(mut self, panel: Vec<OcrResult>) -> Self {
        self.panel = panel;
        self
    }

    /// Crop answers not yet consumed
    pub fn remaining(&self) -> usize {
        self.crops.lock().len()
    }
}

impl Recognizer for ScriptedRecognizer {
    fn recognize_crop(&self, _image: &DynamicImage) -> Result<String, PanelError> {
        Ok(self.crops.lock().pop_front().unwrap_or_default())
    }

    fn recognize_panel(&self, _image: &DynamicImage) -> Result<Vec<OcrResult>, PanelError> {
        Ok(self.panel.clone())
    }
}

//! Displays and their normalization
//!
//! A [`Display`] is one identified seven-segment indicator: its name, its
//! rectangle on the frame, the glyphs found inside it and the crop handed
//! to the recognition engine.

use image::DynamicImage;
use tracing::debug;

use super::geometry::Rect;
use super::layout::{Assignment, Candidate, MODE_PREFIX};
use super::ocr::Recognizer;
use crate::capture::PanelFrame;
use crate::config::NormalizeSettings;
use crate::error::PanelError;

/// One glyph inside a display
#[derive(Debug, Clone, PartialEq)]
pub struct Digit {
    /// Owning display name
    pub name: String,
    /// Position inside the display, left to right
    pub index: usize,
    pub rect: Rect,
    /// Reserved for per-digit width tracking
    pub sliding: bool,
    /// Reserved for per-digit width tracking
    pub max_width: Option<i32>,
}

impl Digit {
    pub fn new(name: &str, index: usize, rect: Rect) -> Self {
        Self {
            name: name.to_string(),
            index,
            rect,
            sliding: false,
            max_width: None,
        }
    }
}

/// An identified display
///
/// The crop is derived from `rect`; the two only change together through
/// [`Display::set_rect`].
#[derive(Debug, Clone)]
pub struct Display {
    pub name: String,
    pub digits: Vec<Digit>,
    /// Presence alone is the reading
    pub skip_detect: bool,
    /// Text recognized while the region was detected
    pub text: Option<String>,
    rect: Rect,
    image: DynamicImage,
}

impl Display {
    pub fn new(name: &str, rect: Rect, digits: Vec<Digit>, frame: &PanelFrame) -> Self {
        Self {
            name: name.to_string(),
            digits,
            skip_detect: false,
            text: None,
            rect,
            image: rect.extract_image(&frame.image),
        }
    }

    /// Build the display for a calibrated assignment
    pub fn from_assignment(assignment: &Assignment, candidate: &Candidate, frame: &PanelFrame) -> Self {
        let digits = candidate
            .items
            .iter()
            .enumerate()
            .map(|(i, rect)| Digit::new(&assignment.name, i, *rect))
            .collect();

        let mut display = Self::new(&assignment.name, candidate.rect, digits, frame);
        display.skip_detect = assignment.skip_detect;
        display.text = candidate.text.clone();
        display
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Crop of `rect` from the frame
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Move the display and rebuild its crop
    pub fn set_rect(&mut self, rect: Rect, frame: &PanelFrame) {
        self.rect = rect;
        self.image = rect.extract_image(&frame.image);
    }

    /// Largest glyph width and height
    pub fn max_digit_size(&self) -> (i32, i32) {
        self.digits.iter().fold((0, 0), |(w, h), d| {
            (w.max(d.rect.w), h.max(d.rect.h))
        })
    }

    /// Raw reading of this display
    ///
    /// Mode indicators read as their own name without the mode prefix;
    /// pre-recognized text is reused; everything else goes to the engine.
    pub fn detect(&self, recognizer: &dyn Recognizer) -> Result<String, PanelError> {
        if self.skip_detect {
            return Ok(self
                .name
                .strip_prefix(MODE_PREFIX)
                .unwrap_or(&self.name)
                .to_string());
        }

        if let Some(text) = &self.text {
            return Ok(text.clone());
        }

        recognizer.recognize_crop(&self.image)
    }
}

/// Resizes displays to a common digit box plus a safety margin
#[derive(Debug, Clone)]
pub struct DisplayNormalizer {
    margin: i32,
    reference_displays: Vec<String>,
}

impl DisplayNormalizer {
    pub fn new(settings: &NormalizeSettings) -> Self {
        Self {
            margin: settings.margin,
            reference_displays: settings.reference_displays.clone(),
        }
    }

    /// Largest glyph size over the reference displays
    pub fn target_size(&self, displays: &[Display]) -> (i32, i32) {
        displays
            .iter()
            .filter(|d| self.reference_displays.contains(&d.name))
            .map(Display::max_digit_size)
            .fold((0, 0), |(w, h), (dw, dh)| (w.max(dw), h.max(dh)))
    }

    /// Grow `rect` to the target digit box
    pub fn normalize_size(rect: Rect, target: (i32, i32)) -> Rect {
        rect.grow_to(target.0, target.1)
    }

    /// Size and pad every display that will be sent to the engine
    pub fn normalize(&self, displays: &mut [Display], frame: &PanelFrame) {
        let target = self.target_size(displays);
        debug!("Normalizing displays to digit box {}x{}", target.0, target.1);

        for display in displays.iter_mut().filter(|d| d.text.is_none()) {
            let sized = Self::normalize_size(display.rect(), target);
            let padded = sized.expand(self.margin, frame.width(), frame.height());
            display.set_rect(padded, frame);
        }
    }
}

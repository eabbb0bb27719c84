//! Vision Layer
//!
//! Reads a roaster control panel from one photographed frame:
//! candidate regions -> radial layout calibration -> display
//! normalization -> recognition -> per-field validation.
//!
//! Candidate regions come from a [`LayoutSource`]:
//! - [`ThresholdLayout`]: thresholding + contour extraction, one engine call per display
//! - [`PanelLayout`]: one engine detection pass over the whole panel

pub mod detection;
pub mod diagnostics;
pub mod display;
pub mod geometry;
pub mod layout;
pub mod ocr;
pub mod preprocess;

pub use detection::{find_areas_of_interest, AreaOfInterest};
pub use diagnostics::{Diagnostics, DirectoryDiagnostics, NoDiagnostics};
pub use display::{Digit, Display, DisplayNormalizer};
pub use geometry::{Point, Rect};
pub use layout::{Candidate, LayoutCalibrator, LayoutSource, NotFound, PanelLayout, Section, ThresholdLayout};
pub use ocr::{CommandRecognizer, OcrResult, Recognizer, ScriptedRecognizer};

use std::time::Instant;
use tracing::{debug, info, warn};

use crate::analysis::Reading;
use crate::capture::PanelFrame;
use crate::config::AppConfig;
use crate::error::PanelError;
use crate::storage::{RecognitionSample, TrainingWriter};

/// Outcome of reading one frame
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    Found(Reading),
    NotFound(NotFound),
}

impl Detection {
    pub fn reading(&self) -> Option<&Reading> {
        match self {
            Detection::Found(reading) => Some(reading),
            Detection::NotFound(_) => None,
        }
    }
}

/// Collaborators injected into every pipeline run
pub struct Services<'a> {
    /// Recognition engine, shared across frames
    pub recognizer: &'a dyn Recognizer,
    /// Step image sink
    pub diagnostics: &'a mut dyn Diagnostics,
    /// Optional training-data sink
    pub training: Option<&'a mut TrainingWriter>,
}

/// Panel reading pipeline
///
/// Holds only configuration; every call to [`PanelReader::detect`] is
/// independent of the others.
pub struct PanelReader {
    calibrator: LayoutCalibrator,
    normalizer: DisplayNormalizer,
}

impl PanelReader {
    /// Create a pipeline from the application configuration
    pub fn new(config: &AppConfig) -> Self {
        Self {
            calibrator: LayoutCalibrator::new(&config.layout),
            normalizer: DisplayNormalizer::new(&config.normalize),
        }
    }

    /// Read one frame
    ///
    /// Missing regions or an unusable anchor yield [`Detection::NotFound`];
    /// only failures of the layout source itself are returned as errors.
    pub fn detect(
        &self,
        frame: &PanelFrame,
        source: &dyn LayoutSource,
        services: &mut Services<'_>,
    ) -> Result<Detection, PanelError> {
        let start = Instant::now();

        if services.diagnostics.enabled() {
            services.diagnostics.write_step(&frame.name, "frame", &frame.image);
        }

        let candidates = source.candidate_regions(frame, services.diagnostics)?;

        let assignments = match self.calibrator.assign(&candidates) {
            Ok(assignments) => assignments,
            Err(reason) => {
                info!("{}: {}", frame.name, reason);
                return Ok(Detection::NotFound(reason));
            }
        };

        if services.diagnostics.enabled() {
            let anchor = candidates[assignments[0].index].rect;
            let rects: Vec<Rect> = candidates.iter().map(|c| c.rect).collect();
            let targets: Vec<Point> = self
                .calibrator
                .projection_targets(&anchor)
                .into_iter()
                .map(|(_, p)| p)
                .collect();
            services.diagnostics.write_step(
                &frame.name,
                "projection",
                &diagnostics::render_projection(&frame.image, &anchor, &rects, &targets),
            );
        }

        let mut displays: Vec<Display> = assignments
            .iter()
            .map(|a| Display::from_assignment(a, &candidates[a.index], frame))
            .collect();

        self.normalizer.normalize(&mut displays, frame);

        let reading = self.read_displays(frame, &displays, services);

        if services.diagnostics.enabled() {
            let labeled: Vec<(Rect, String)> = displays
                .iter()
                .map(|d| {
                    let value = reading.raw.get(&d.name).map(String::as_str).unwrap_or_default();
                    (d.rect(), format!("{}: {}", d.name, value))
                })
                .collect();
            services
                .diagnostics
                .write_labeled(&frame.name, "result", &frame.image, &labeled);
        }

        debug!(
            "{}: read {} displays in {:?} (frame age {:?})",
            frame.name,
            displays.len(),
            start.elapsed(),
            frame.timestamp.elapsed()
        );

        Ok(Detection::Found(reading))
    }

    fn read_displays(&self, frame: &PanelFrame, displays: &[Display], services: &mut Services<'_>) -> Reading {
        let mut reading = Reading::new(&frame.name);

        for display in displays {
            let display_name = display.name.as_str();
            if services.diagnostics.enabled() {
                services.diagnostics.write_step(&frame.name, display_name, display.image());
            }

            let value = match display.detect(services.recognizer) {
                Ok(value) => value,
                Err(e) => {
                    warn!("{} - {} recognition failed: {}", frame.name, display_name, e);
                    String::new()
                }
            };

            // Field errors stay local to the field; apply has logged them
            let line = match reading.apply(display_name, &value) {
                Ok(()) => format!("{}: {}", display_name, value),
                Err(e) => format!("{}: {} ({})", display_name, value, e),
            };
            services.diagnostics.trace(&frame.name, &line);

            if let Some(training) = services.training.as_deref_mut() {
                if !display.skip_detect && !value.is_empty() {
                    let sample = RecognitionSample {
                        name: format!("{}-{}", frame.name, display_name),
                        value: value.clone(),
                        rect: display.rect(),
                    };
                    if let Err(e) = training.write_result(&frame.image, &sample) {
                        warn!("Failed to write training sample {}: {}", sample.name, e);
                    }
                }
            }
        }

        reading
    }
}

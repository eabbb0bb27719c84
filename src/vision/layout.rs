//! Layout calibration
//!
//! Assigns a display identity to each candidate region. One region, the
//! anchor, is picked as the one nearest the centroid of all regions; every
//! other display is then searched for at a hand-measured polar offset from
//! it. Offsets are expressed in units of the anchor's own projected height,
//! which makes the assignment independent of zoom and resolution.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::detection::{find_areas_of_interest, AreaOfInterest};
use super::diagnostics::{render_mask, Diagnostics};
use super::geometry::{calculate_projection, find_central_box_index, find_projection_rect_index, Point, Rect};
use super::ocr::{OcrResult, Recognizer};
use super::preprocess::binarize;
use crate::capture::PanelFrame;
use crate::config::{LayoutSettings, PreprocessSettings};
use crate::error::PanelError;

/// Prefix shared by the mutually exclusive mode indicators
pub const MODE_PREFIX: &str = "MODE_";

/// Why no reading could be produced for a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFound {
    /// No candidate region at all
    NoRegions,
    /// The anchor region cannot serve as a calibration origin
    NoAnchor,
}

impl std::fmt::Display for NotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotFound::NoRegions => write!(f, "display not found"),
            NotFound::NoAnchor => write!(f, "anchor display not found"),
        }
    }
}

/// Calibrated polar offset of one display from the anchor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    /// Direction from the anchor in degrees (0 = right, 90 = down)
    pub angle: f32,
    /// Distance from the anchor in anchor units
    pub length: f32,
    /// Presence alone is the reading; no OCR
    #[serde(default)]
    pub skip_detect: bool,
}

impl Section {
    pub fn new(name: &str, angle: f32, length: f32, skip_detect: bool) -> Self {
        Self {
            name: name.to_string(),
            angle,
            length,
            skip_detect,
        }
    }
}

/// Measured layout of the roaster panel
pub fn default_sections() -> Vec<Section> {
    vec![
        Section::new("TEMPERATURE", -149.85, 4.91, false),
        Section::new("PROFILE", -51.16, 2.92, false),
        Section::new("POWER", 0.0, 0.0, false),
        Section::new("FAN", 0.0, 4.67, false),
        Section::new("TIME", 165.21, 4.48, false),
        Section::new("MODE_PREHEAT", 113.12, 4.24, true),
        Section::new("MODE_ROAST", 84.61, 4.08, true),
        Section::new("MODE_COOL", 54.85, 4.77, true),
    ]
}

/// A region that may be one physical display
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub rect: Rect,
    /// Glyph rectangles inside `rect`
    pub items: Vec<Rect>,
    /// Text already recognized while detecting the region
    pub text: Option<String>,
}

impl From<AreaOfInterest> for Candidate {
    fn from(aoi: AreaOfInterest) -> Self {
        Self {
            rect: aoi.rect,
            items: aoi.items,
            text: None,
        }
    }
}

impl From<OcrResult> for Candidate {
    fn from(result: OcrResult) -> Self {
        Self {
            rect: result.rect,
            items: Vec::new(),
            text: Some(result.text),
        }
    }
}

/// Producer of candidate regions for one frame
pub trait LayoutSource {
    fn candidate_regions(
        &self,
        frame: &PanelFrame,
        diagnostics: &mut dyn Diagnostics,
    ) -> Result<Vec<Candidate>, PanelError>;
}

/// Candidates from thresholding and contour extraction
pub struct ThresholdLayout {
    settings: PreprocessSettings,
}

impl ThresholdLayout {
    pub fn new(settings: PreprocessSettings) -> Self {
        Self { settings }
    }
}

impl LayoutSource for ThresholdLayout {
    fn candidate_regions(
        &self,
        frame: &PanelFrame,
        diagnostics: &mut dyn Diagnostics,
    ) -> Result<Vec<Candidate>, PanelError> {
        let binarized = binarize(&frame.image, &self.settings);
        if diagnostics.enabled() {
            diagnostics.write_step(&frame.name, "threshold", &render_mask(&binarized.regions));
        }

        Ok(find_areas_of_interest(&binarized, self.settings.min_area)
            .into_iter()
            .map(Candidate::from)
            .collect())
    }
}

/// Candidates from the engine's own panel detection pass
pub struct PanelLayout<'a> {
    recognizer: &'a dyn Recognizer,
}

impl<'a> PanelLayout<'a> {
    pub fn new(recognizer: &'a dyn Recognizer) -> Self {
        Self { recognizer }
    }
}

impl LayoutSource for PanelLayout<'_> {
    fn candidate_regions(
        &self,
        frame: &PanelFrame,
        diagnostics: &mut dyn Diagnostics,
    ) -> Result<Vec<Candidate>, PanelError> {
        let results = self.recognizer.recognize_panel(&frame.image)?;
        for result in &results {
            diagnostics.trace(&frame.name, &format!("{:?}: {}", result.rect.to_list(), result.text));
        }
        Ok(results.into_iter().map(Candidate::from).collect())
    }
}

/// A section matched to a candidate
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    pub skip_detect: bool,
    /// Index into the candidate list
    pub index: usize,
}

/// Radial matcher over a fixed section table
#[derive(Debug, Clone)]
pub struct LayoutCalibrator {
    anchor: String,
    sections: Vec<Section>,
    projection_height_scale: f32,
    max_match_distance: f32,
}

impl LayoutCalibrator {
    pub fn new(settings: &LayoutSettings) -> Self {
        Self {
            anchor: settings.anchor.clone(),
            sections: settings.sections.clone(),
            projection_height_scale: settings.projection_height_scale,
            max_match_distance: settings.max_match_distance,
        }
    }

    /// Length of one calibration unit for the given anchor, in pixels
    pub fn unit(&self, anchor: &Rect) -> f32 {
        anchor.projected(self.projection_height_scale).h as f32
    }

    /// Expected center of every non-anchor section
    pub fn projection_targets(&self, anchor: &Rect) -> Vec<(&Section, Point)> {
        let origin = anchor.projected(self.projection_height_scale).center();
        let unit = self.unit(anchor);

        self.sections
            .iter()
            .filter(|s| s.name != self.anchor)
            .map(|s| (s, calculate_projection(origin, s.length * unit, s.angle)))
            .collect()
    }

    /// Assign section names to candidates
    ///
    /// The anchor comes first, followed by every matched section in table
    /// order; unmatched sections are left out. An anchor without height
    /// gives no calibration unit and fails the frame.
    pub fn assign(&self, candidates: &[Candidate]) -> Result<Vec<Assignment>, NotFound> {
        let rects: Vec<Rect> = candidates.iter().map(|c| c.rect).collect();
        let anchor_idx = find_central_box_index(&rects).ok_or(NotFound::NoRegions)?;
        let anchor = rects[anchor_idx];

        if self.unit(&anchor) <= 0.0 {
            return Err(NotFound::NoAnchor);
        }

        let anchor_skip = self
            .sections
            .iter()
            .find(|s| s.name == self.anchor)
            .map(|s| s.skip_detect)
            .unwrap_or(false);

        let mut assignments = vec![Assignment {
            name: self.anchor.clone(),
            skip_detect: anchor_skip,
            index: anchor_idx,
        }];

        let max_distance = self.max_match_distance * self.unit(&anchor);

        for (section, target) in self.projection_targets(&anchor) {
            match find_projection_rect_index(&target, &rects, max_distance) {
                Some(index) => assignments.push(Assignment {
                    name: section.name.clone(),
                    skip_detect: section.skip_detect,
                    index,
                }),
                None => debug!(
                    "Section {} absent (target {:.0},{:.0})",
                    section.name, target.x, target.y
                ),
            }
        }

        info!(
            "Assigned {} of {} sections from {} candidates",
            assignments.len(),
            self.sections.len(),
            candidates.len()
        );

        Ok(assignments)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Candidates laid out exactly where the default table expects them
    pub(crate) fn synthetic_panel(
        origin: (f32, f32),
        unit: f32,
        names: &[&str],
    ) -> Vec<Candidate> {
        let anchor = Rect::new(
            (origin.0 - unit) as i32,
            (origin.1 - unit / 2.0) as i32,
            (unit * 2.0) as i32,
            unit as i32,
        );
        let center = anchor.center();
        let mut candidates = vec![Candidate {
            rect: anchor,
            items: Vec::new(),
            text: None,
        }];

        for section in default_sections() {
            if !names.contains(&section.name.as_str()) || section.name == "POWER" {
                continue;
            }
            let target = calculate_projection(center, section.length * unit, section.angle);
            let w = unit * 1.5;
            let h = unit;
            candidates.push(Candidate {
                rect: Rect::new(
                    (target.x - w / 2.0).round() as i32,
                    (target.y - h / 2.0).round() as i32,
                    w as i32,
                    h as i32,
                ),
                items: Vec::new(),
                text: None,
            });
        }

        candidates
    }

    fn names(assignments: &[Assignment], candidates: &[Candidate]) -> Vec<(String, Rect)> {
        assignments
            .iter()
            .map(|a| (a.name.clone(), candidates[a.index].rect))
            .collect()
    }

    const ALL: &[&str] = &["TEMPERATURE", "PROFILE", "FAN", "TIME", "MODE_ROAST"];

    #[test]
    fn test_default_sections() {
        let sections = default_sections();
        assert_eq!(sections.len(), 8);
        assert_eq!(sections.iter().filter(|s| s.skip_detect).count(), 3);
        assert!(sections
            .iter()
            .filter(|s| s.skip_detect)
            .all(|s| s.name.starts_with(MODE_PREFIX)));
    }

    #[test]
    fn test_no_candidates() {
        let calibrator = LayoutCalibrator::new(&LayoutSettings::default());
        assert_eq!(calibrator.assign(&[]), Err(NotFound::NoRegions));
    }

    #[test]
    fn test_flat_anchor_rejected() {
        let calibrator = LayoutCalibrator::new(&LayoutSettings::default());
        let candidates = vec![Candidate {
            rect: Rect::new(10, 10, 50, 0),
            items: Vec::new(),
            text: None,
        }];
        assert_eq!(calibrator.assign(&candidates), Err(NotFound::NoAnchor));
    }

    #[test]
    fn test_single_candidate_is_anchor() {
        let calibrator = LayoutCalibrator::new(&LayoutSettings::default());
        let candidates = synthetic_panel((500.0, 500.0), 40.0, &[]);
        let assignments = calibrator.assign(&candidates).unwrap();

        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].name, "POWER");
        assert_eq!(assignments[0].index, 0);
    }

    #[test]
    fn test_assigns_every_present_section() {
        let calibrator = LayoutCalibrator::new(&LayoutSettings::default());
        let candidates = synthetic_panel((500.0, 500.0), 40.0, ALL);
        let assignments = calibrator.assign(&candidates).unwrap();

        let got: Vec<&str> = assignments.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(got, vec!["POWER", "TEMPERATURE", "PROFILE", "FAN", "TIME", "MODE_ROAST"]);

        // Each section landed on its own candidate
        let mut indices: Vec<usize> = assignments.iter().map(|a| a.index).collect();
        indices.sort();
        indices.dedup();
        assert_eq!(indices.len(), 6);

        let roast = assignments.iter().find(|a| a.name == "MODE_ROAST").unwrap();
        assert!(roast.skip_detect);
    }

    #[test]
    fn test_anchor_is_independent_of_input_order() {
        let calibrator = LayoutCalibrator::new(&LayoutSettings::default());
        let mut candidates = synthetic_panel((500.0, 500.0), 40.0, ALL);
        let anchor_rect = candidates[0].rect;
        candidates.rotate_left(3);

        let assignments = calibrator.assign(&candidates).unwrap();
        assert_eq!(candidates[assignments[0].index].rect, anchor_rect);
    }

    #[test]
    fn test_scale_invariance() {
        let calibrator = LayoutCalibrator::new(&LayoutSettings::default());

        let small = synthetic_panel((400.0, 300.0), 40.0, ALL);
        let k = 2.5;
        let large: Vec<Candidate> = small
            .iter()
            .map(|c| Candidate {
                rect: Rect::new(
                    (c.rect.x as f32 * k) as i32 + 37,
                    (c.rect.y as f32 * k) as i32 - 11,
                    (c.rect.w as f32 * k) as i32,
                    (c.rect.h as f32 * k) as i32,
                ),
                items: Vec::new(),
                text: None,
            })
            .collect();

        let a = calibrator.assign(&small).unwrap();
        let b = calibrator.assign(&large).unwrap();

        let a_names: Vec<(String, usize)> = a.iter().map(|x| (x.name.clone(), x.index)).collect();
        let b_names: Vec<(String, usize)> = b.iter().map(|x| (x.name.clone(), x.index)).collect();
        assert_eq!(a_names, b_names);
    }

    #[test]
    fn test_only_present_mode_is_assigned() {
        let calibrator = LayoutCalibrator::new(&LayoutSettings::default());
        for mode in ["MODE_PREHEAT", "MODE_ROAST", "MODE_COOL"] {
            let candidates = synthetic_panel((500.0, 500.0), 40.0, &["TEMPERATURE", "FAN", mode]);
            let assignments = calibrator.assign(&candidates).unwrap();
            let modes: Vec<&str> = assignments
                .iter()
                .filter(|a| a.name.starts_with(MODE_PREFIX))
                .map(|a| a.name.as_str())
                .collect();
            assert_eq!(modes, vec![mode]);
        }
    }

    #[test]
    fn test_far_region_not_matched() {
        let mut settings = LayoutSettings::default();
        settings.max_match_distance = 0.1;
        let calibrator = LayoutCalibrator::new(&settings);

        let mut candidates = synthetic_panel((500.0, 500.0), 40.0, &[]);
        // Off by one full unit from the FAN target, outside containment
        let fan = candidates[0].rect.center().x + 4.67 * 40.0;
        candidates.push(Candidate {
            rect: Rect::new(fan as i32 - 10, 500 + 40, 20, 20),
            items: Vec::new(),
            text: None,
        });
        // Counterweight on the left keeps the anchor central
        candidates.push(Candidate {
            rect: Rect::new(300, 440, 20, 20),
            items: Vec::new(),
            text: None,
        });

        let assignments = calibrator.assign(&candidates).unwrap();
        assert!(names(&assignments, &candidates).iter().all(|(n, _)| n != "FAN"));
    }

    #[test]
    fn test_projection_height_scale_changes_unit() {
        let mut settings = LayoutSettings::default();
        settings.projection_height_scale = 2.0;
        let calibrator = LayoutCalibrator::new(&settings);
        assert!((calibrator.unit(&Rect::new(0, 0, 80, 40)) - 80.0).abs() < 0.01);
        assert_eq!(calibrator.projection_targets(&Rect::new(0, 0, 80, 40)).len(), 7);
    }
}

//! Diagnostic sinks
//!
//! Step images and trace lines keyed by frame and step name. Sinks only
//! observe the pipeline; a failing write is logged and otherwise ignored.

use ab_glyph::FontVec;
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_cross_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::geometry::{Point, Rect};
use crate::error::PanelError;

const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const ANCHOR_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const TARGET_COLOR: Rgb<u8> = Rgb([255, 255, 0]);

/// Receiver of step-by-step pipeline artifacts
pub trait Diagnostics {
    /// Whether artifacts are wanted at all; callers skip rendering otherwise
    fn enabled(&self) -> bool;

    /// Store an image produced at `step` of `frame`
    fn write_step(&mut self, frame: &str, step: &str, image: &DynamicImage);

    /// Record a textual trace line
    fn trace(&mut self, frame: &str, line: &str);

    /// Store a frame copy with every box outlined and labelled
    ///
    /// Sinks without a font draw the boxes only.
    fn write_labeled(&mut self, frame: &str, step: &str, image: &DynamicImage, labeled: &[(Rect, String)]) {
        self.write_step(frame, step, &render_labeled(image, labeled, None, 0.0));
    }
}

/// Sink that discards everything
#[derive(Debug, Default)]
pub struct NoDiagnostics;

impl Diagnostics for NoDiagnostics {
    fn enabled(&self) -> bool {
        false
    }

    fn write_step(&mut self, _frame: &str, _step: &str, _image: &DynamicImage) {}

    fn trace(&mut self, _frame: &str, _line: &str) {}
}

/// Sink writing `<dir>/<frame>-<step>.png` files and logging trace lines
pub struct DirectoryDiagnostics {
    output_dir: PathBuf,
    written: Vec<PathBuf>,
    font: Option<FontVec>,
    font_scale: f32,
}

impl DirectoryDiagnostics {
    /// Create the sink, creating the output directory if needed
    pub fn new(output_dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(output_dir)?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            written: Vec::new(),
            font: None,
            font_scale: 16.0,
        })
    }

    /// Font used for box labels; without one labels are skipped
    pub fn with_font(mut self, font: Option<FontVec>, scale: f32) -> Self {
        self.font = font;
        self.font_scale = scale;
        self
    }

    /// Files written so far
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl Diagnostics for DirectoryDiagnostics {
    fn enabled(&self) -> bool {
        true
    }

    fn write_step(&mut self, frame: &str, step: &str, image: &DynamicImage) {
        if image.width() == 0 || image.height() == 0 {
            return;
        }
        let path = self.output_dir.join(format!("{}-{}.png", frame, step));
        match image.save(&path) {
            Ok(()) => {
                debug!("Wrote diagnostic step {:?}", path);
                self.written.push(path);
            }
            Err(e) => warn!("Failed to write diagnostic step {:?}: {}", path, e),
        }
    }

    fn trace(&mut self, frame: &str, line: &str) {
        debug!("{}: {}", frame, line);
    }

    fn write_labeled(&mut self, frame: &str, step: &str, image: &DynamicImage, labeled: &[(Rect, String)]) {
        let rendered = render_labeled(image, labeled, self.font.as_ref(), self.font_scale);
        self.write_step(frame, step, &rendered);
    }
}

/// Load the label font from `path`, or from a common system location
///
/// A missing system font is not an error: labels are then skipped.
pub fn load_font(path: Option<&Path>) -> Result<Option<FontVec>, PanelError> {
    if let Some(path) = path {
        let data = std::fs::read(path)?;
        let font = FontVec::try_from_vec(data).map_err(|_| PanelError::InvalidFont(path.to_path_buf()))?;
        info!("Loaded label font {:?}", path);
        return Ok(Some(font));
    }

    for candidate in SYSTEM_FONTS {
        if let Ok(data) = std::fs::read(candidate) {
            if let Ok(font) = FontVec::try_from_vec(data) {
                info!("Loaded system font: {}", candidate);
                return Ok(Some(font));
            }
        }
    }

    debug!("No system font found, diagnostic labels will be skipped");
    Ok(None)
}

/// Frame copy with every box outlined and, given a font, tagged with its label
pub fn render_labeled(image: &DynamicImage, labeled: &[(Rect, String)], font: Option<&FontVec>, scale: f32) -> DynamicImage {
    let mut canvas = image.to_rgb8();
    for (rect, label) in labeled {
        outline(&mut canvas, rect, BOX_COLOR);

        let Some(font) = font else { continue };
        // Above the box when it fits, below otherwise
        let above = rect.y - scale.ceil() as i32;
        let y = if above >= 0 { above } else { rect.bottom() };
        if rect.x >= 0 && y < canvas.height() as i32 {
            draw_text_mut(&mut canvas, BOX_COLOR, rect.x, y, scale, font, label);
        }
    }
    DynamicImage::ImageRgb8(canvas)
}

/// Frame copy showing the anchor, every candidate and the projected targets
pub fn render_projection(
    image: &DynamicImage,
    anchor: &Rect,
    candidates: &[Rect],
    targets: &[Point],
) -> DynamicImage {
    let mut canvas = image.to_rgb8();
    for rect in candidates {
        outline(&mut canvas, rect, BOX_COLOR);
    }
    outline(&mut canvas, anchor, ANCHOR_COLOR);

    let origin = anchor.center();
    for target in targets {
        draw_line_segment_mut(&mut canvas, (origin.x, origin.y), (target.x, target.y), TARGET_COLOR);
        draw_cross_mut(&mut canvas, TARGET_COLOR, target.x as i32, target.y as i32);
    }
    DynamicImage::ImageRgb8(canvas)
}

/// Binary mask as a diagnostic image
pub fn render_mask(mask: &GrayImage) -> DynamicImage {
    DynamicImage::ImageLuma8(mask.clone())
}

fn outline(canvas: &mut RgbImage, rect: &Rect, color: Rgb<u8>) {
    if rect.w == 0 || rect.h == 0 {
        return;
    }
    draw_hollow_rect_mut(canvas, (*rect).into(), color);
}

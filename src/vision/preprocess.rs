//! Frame binarization
//!
//! Grayscale conversion, fixed-level thresholding and a square dilation
//! that fuses the segments of one display into a single blob. All
//! parameters come from [`PreprocessSettings`].

use image::{DynamicImage, GrayImage};
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::morphology;
use tracing::debug;

use crate::config::PreprocessSettings;

/// Binary masks derived from one frame
pub struct BinarizedFrame {
    /// Thresholded mask, one blob per lit segment group (glyph)
    pub glyphs: GrayImage,
    /// Dilated mask, one blob per display
    pub regions: GrayImage,
}

/// Binarize a frame for region extraction
pub fn binarize(image: &DynamicImage, settings: &PreprocessSettings) -> BinarizedFrame {
    let gray = image.to_luma8();
    let glyphs = threshold(&gray, settings.threshold, ThresholdType::Binary);

    // LInf ball of radius k is a (2k+1) square
    let radius = settings.dilation_kernel / 2;
    let regions = if radius > 0 {
        morphology::dilate(&glyphs, Norm::LInf, radius)
    } else {
        glyphs.clone()
    };

    debug!(
        "Binarized {}x{} frame (threshold={}, kernel={})",
        gray.width(),
        gray.height(),
        settings.threshold,
        settings.dilation_kernel
    );

    BinarizedFrame { glyphs, regions }
}

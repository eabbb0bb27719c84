//! Region extraction
//!
//! Turns binarized masks into areas of interest: one bounding rectangle per
//! lit display plus the glyph rectangles found inside it.

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use tracing::debug;

use super::geometry::Rect;
use super::preprocess::BinarizedFrame;

/// A candidate display region and the glyphs segmented inside it
#[derive(Debug, Clone, PartialEq)]
pub struct AreaOfInterest {
    /// Overall bounding box
    pub rect: Rect,
    /// Glyph candidates, left to right
    pub items: Vec<Rect>,
}

/// Bounding rectangles of the outer contours of a mask
fn outer_boxes(mask: &GrayImage) -> Vec<Rect> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|c| Rect::bounding(c.points.iter().map(|p| (p.x, p.y))))
        .collect()
}

/// Extract areas of interest whose area exceeds `min_area`
///
/// Returns an empty vector when nothing qualifies.
pub fn find_areas_of_interest(binarized: &BinarizedFrame, min_area: i64) -> Vec<AreaOfInterest> {
    let regions: Vec<Rect> = outer_boxes(&binarized.regions)
        .into_iter()
        .filter(|r| r.area() > min_area)
        .collect();

    if regions.is_empty() {
        debug!("No region above {} px", min_area);
        return Vec::new();
    }

    let glyphs = outer_boxes(&binarized.glyphs);

    let areas: Vec<AreaOfInterest> = regions
        .into_iter()
        .map(|rect| {
            let mut items: Vec<Rect> = glyphs
                .iter()
                .filter(|g| rect.contains_point(&g.center()))
                .copied()
                .collect();
            items.sort_by_key(|g| (g.x, g.y));
            AreaOfInterest { rect, items }
        })
        .collect();

    debug!("Found {} areas of interest", areas.len());
    areas
}

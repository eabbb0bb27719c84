//! Geometry primitives for panel layout
//!
//! Axis-aligned rectangles plus the polar projection helpers used by the
//! layout calibrator.

use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// A point in image coordinates (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Axis-aligned integer rectangle
///
/// Width and height are never negative; constructors clamp them to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    /// Create a new rectangle
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self {
            x,
            y,
            w: w.max(0),
            h: h.max(0),
        }
    }

    /// Smallest rectangle containing all of the given points (inclusive pixels)
    pub fn bounding(points: impl IntoIterator<Item = (i32, i32)>) -> Option<Self> {
        let mut iter = points.into_iter();
        let (x0, y0) = iter.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (x0, y0, x0, y0);
        for (x, y) in iter {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.w)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.h)
    }

    /// Center point
    pub fn center(&self) -> Point {
        Point::new(
            self.x as f32 + self.w as f32 / 2.0,
            self.y as f32 + self.h as f32 / 2.0,
        )
    }

    pub fn area(&self) -> i64 {
        self.w as i64 * self.h as i64
    }

    /// Rectangle as `[x, y, w, h]`
    pub fn to_list(&self) -> [i32; 4] {
        [self.x, self.y, self.w, self.h]
    }

    /// Whether a point lies inside the rectangle (right/bottom edges excluded)
    pub fn contains_point(&self, point: &Point) -> bool {
        point.x >= self.x as f32
            && point.x < self.right() as f32
            && point.y >= self.y as f32
            && point.y < self.bottom() as f32
    }

    /// Intersection with the `width` x `height` image area
    pub fn clipped(&self, width: u32, height: u32) -> Rect {
        let x0 = self.x.clamp(0, width as i32);
        let y0 = self.y.clamp(0, height as i32);
        let x1 = self.right().clamp(0, width as i32);
        let y1 = self.bottom().clamp(0, height as i32);
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Crop the rectangle out of `source`, clipped to its bounds
    pub fn extract_image(&self, source: &DynamicImage) -> DynamicImage {
        let clip = self.clipped(source.width(), source.height());
        source.crop_imm(clip.x as u32, clip.y as u32, clip.w as u32, clip.h as u32)
    }

    /// Rectangle in projection space
    ///
    /// The center is kept and the height is multiplied by `height_scale`.
    /// Only radial distance/angle calculations use this space.
    pub fn projected(&self, height_scale: f32) -> Rect {
        let center = self.center();
        let h = (self.h as f32 * height_scale).round() as i32;
        Rect::new(
            self.x,
            (center.y - h as f32 / 2.0).round() as i32,
            self.w,
            h,
        )
    }

    /// Grow to at least `min_w` x `min_h`
    ///
    /// Width grows leftward (right edge anchored, left edge clamped at 0),
    /// height grows symmetrically around the vertical center.
    pub fn grow_to(&self, min_w: i32, min_h: i32) -> Rect {
        let mut rect = *self;

        if rect.w < min_w {
            let right = rect.right();
            rect.x = (right - min_w).max(0);
            rect.w = right - rect.x;
        }

        if rect.h < min_h {
            let extra = min_h - rect.h;
            let top = extra / 2;
            rect.y = rect.y.saturating_sub(top);
            rect.h = min_h;
        }

        rect
    }

    /// Expand by `margin` on every side, clipped to the image area
    pub fn expand(&self, margin: i32, width: u32, height: u32) -> Rect {
        Rect::new(
            self.x.saturating_sub(margin),
            self.y.saturating_sub(margin),
            self.w.saturating_add(margin.saturating_mul(2)),
            self.h.saturating_add(margin.saturating_mul(2)),
        )
        .clipped(width, height)
    }
}

impl From<Rect> for imageproc::rect::Rect {
    fn from(rect: Rect) -> Self {
        imageproc::rect::Rect::at(rect.x, rect.y).of_size(rect.w.max(1) as u32, rect.h.max(1) as u32)
    }
}

/// Point at `length` units from `origin` along `angle_deg`
///
/// Angles follow image coordinates: 0 points right, positive angles turn
/// clockwise (downward on screen).
pub fn calculate_projection(origin: Point, length: f32, angle_deg: f32) -> Point {
    let radians = angle_deg.to_radians();
    Point::new(
        origin.x + length * radians.cos(),
        origin.y + length * radians.sin(),
    )
}

/// Index of the rectangle whose center is nearest the centroid of all centers
///
/// Ties keep the first rectangle in input order.
pub fn find_central_box_index(rects: &[Rect]) -> Option<usize> {
    if rects.is_empty() {
        return None;
    }

    let count = rects.len() as f32;
    let (sum_x, sum_y) = rects.iter().fold((0.0f32, 0.0f32), |(sx, sy), r| {
        let c = r.center();
        (sx + c.x, sy + c.y)
    });
    let centroid = Point::new(sum_x / count, sum_y / count);

    let mut best: Option<(usize, f32)> = None;
    for (idx, rect) in rects.iter().enumerate() {
        let dist = rect.center().distance(&centroid);
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((idx, dist)),
        }
    }

    best.map(|(idx, _)| idx)
}

/// Index of the rectangle matching a projected point
///
/// Containment wins; otherwise the nearest center within `max_distance`.
/// Ties keep the first rectangle in input order.
pub fn find_projection_rect_index(point: &Point, rects: &[Rect], max_distance: f32) -> Option<usize> {
    if let Some(idx) = rects.iter().position(|r| r.contains_point(point)) {
        return Some(idx);
    }

    let mut best: Option<(usize, f32)> = None;
    for (idx, rect) in rects.iter().enumerate() {
        let dist = rect.center().distance(point);
        if dist > max_distance {
            continue;
        }
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((idx, dist)),
        }
    }

    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_center_and_area() {
        let rect = Rect::new(10, 20, 30, 40);
        assert_eq!(rect.center(), Point::new(25.0, 40.0));
        assert_eq!(rect.area(), 1200);
        assert_eq!(rect.to_list(), [10, 20, 30, 40]);
    }

    #[test]
    fn test_negative_size_clamped() {
        let rect = Rect::new(5, 5, -3, -1);
        assert_eq!(rect.w, 0);
        assert_eq!(rect.h, 0);
        assert_eq!(rect.area(), 0);
    }

    #[test]
    fn test_extreme_rect_saturates() {
        let rect = Rect::new(i32::MAX - 5, i32::MAX - 5, 100, 100);
        assert_eq!(rect.right(), i32::MAX);
        assert_eq!(rect.bottom(), i32::MAX);

        let img = DynamicImage::ImageRgb8(RgbImage::new(20, 10));
        let crop = rect.expand(10, 20, 10);
        assert_eq!(crop.area(), 0);
        let out = rect.extract_image(&img);
        assert_eq!((out.width(), out.height()), (0, 0));
    }

    #[test]
    fn test_bounding_inclusive() {
        let rect = Rect::bounding(vec![(2, 3), (5, 3), (5, 9)]).unwrap();
        assert_eq!(rect, Rect::new(2, 3, 4, 7));
        assert!(Rect::bounding(Vec::new()).is_none());
    }

    #[test]
    fn test_extract_image_clips_to_source() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 10, Rgb([1, 2, 3])));
        let crop = Rect::new(15, -5, 10, 10).extract_image(&img);
        assert_eq!(crop.width(), 5);
        assert_eq!(crop.height(), 5);
    }

    #[test]
    fn test_projected_keeps_center() {
        let rect = Rect::new(0, 0, 40, 20);
        let projected = rect.projected(2.0);
        assert_eq!(projected.h, 40);
        assert_eq!(projected.center(), rect.center());
        assert_eq!(rect.projected(1.0), rect);
    }

    #[test]
    fn test_grow_to_anchors_right_edge() {
        let rect = Rect::new(50, 50, 10, 10);
        let grown = rect.grow_to(30, 20);
        assert_eq!(grown.right(), rect.right());
        assert_eq!(grown.w, 30);
        assert_eq!(grown.h, 20);
        assert_eq!(grown.center().y, rect.center().y);
    }

    #[test]
    fn test_grow_to_never_shrinks() {
        let rect = Rect::new(5, 5, 50, 40);
        assert_eq!(rect.grow_to(10, 10), rect);
    }

    #[test]
    fn test_grow_to_clamps_left_edge() {
        let rect = Rect::new(4, 0, 10, 10);
        let grown = rect.grow_to(30, 10);
        assert_eq!(grown.x, 0);
        assert_eq!(grown.right(), 14);
    }

    #[test]
    fn test_expand_clipped() {
        let rect = Rect::new(5, 5, 10, 10);
        assert_eq!(rect.expand(10, 100, 100), Rect::new(0, 0, 25, 25));
        assert_eq!(rect.expand(10, 20, 18), Rect::new(0, 0, 20, 18));
    }

    #[test]
    fn test_calculate_projection() {
        let origin = Point::new(100.0, 100.0);
        let right = calculate_projection(origin, 10.0, 0.0);
        assert!((right.x - 110.0).abs() < 1e-4);
        assert!((right.y - 100.0).abs() < 1e-4);

        let down = calculate_projection(origin, 10.0, 90.0);
        assert!((down.x - 100.0).abs() < 1e-3);
        assert!((down.y - 110.0).abs() < 1e-3);
    }

    #[test]
    fn test_central_box_index() {
        let rects = vec![
            Rect::new(0, 0, 10, 10),
            Rect::new(100, 100, 10, 10),
            Rect::new(45, 45, 10, 10),
            Rect::new(200, 0, 10, 10),
        ];
        assert_eq!(find_central_box_index(&rects), Some(2));
        assert_eq!(find_central_box_index(&[]), None);
    }

    #[test]
    fn test_central_box_tie_keeps_first() {
        let rects = vec![Rect::new(0, 0, 10, 10), Rect::new(20, 0, 10, 10)];
        assert_eq!(find_central_box_index(&rects), Some(0));
    }

    #[test]
    fn test_projection_rect_prefers_containment() {
        let rects = vec![Rect::new(0, 0, 100, 100), Rect::new(40, 40, 10, 10)];
        let point = Point::new(80.0, 80.0);
        assert_eq!(find_projection_rect_index(&point, &rects, 5.0), Some(0));
    }

    #[test]
    fn test_projection_rect_nearest_within_distance() {
        let rects = vec![Rect::new(0, 0, 10, 10), Rect::new(30, 0, 10, 10)];
        assert_eq!(find_projection_rect_index(&Point::new(28.0, 5.0), &rects, 10.0), Some(1));
        // Equidistant: first rectangle wins
        assert_eq!(find_projection_rect_index(&Point::new(20.0, 5.0), &rects, 20.0), Some(0));
        assert_eq!(find_projection_rect_index(&Point::new(20.0, 50.0), &rects, 10.0), None);
    }
}

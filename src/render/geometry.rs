//! Shared geometry for rendering and hit-testing
//!
//! Constants and math used by both the scene store (hit-tests) and the
//! compositing pipeline (stroke widths, magnifier cross, display fitting).

use crate::domain::{BoundingBox, Point};

/// Measurement line constants
pub mod line {
    /// Stroke width on the main display in pixels
    pub const WIDTH: f32 = 2.0;
    /// Stroke width inside the magnifier composite in pixels
    pub const MAGNIFIER_WIDTH: f32 = 1.0;
    /// Distance from the stroke center still counted as a hit
    pub const HIT_RADIUS: f64 = 4.0;
}

/// Selection handle constants
pub mod handle {
    /// Drawn radius of an endpoint handle in pixels
    pub const RADIUS: f64 = 3.0;
    /// Distance from the handle center still counted as a hit
    pub const HIT_RADIUS: f64 = 4.0;
    /// Fraction of the handle bounding box removed inside the magnifier
    pub const MAGNIFIER_SHRINK: f64 = 0.75;
}

/// Magnifier viewport constants
pub mod magnifier {
    /// Fixed output viewport edge in pixels
    pub const VIEWPORT: u32 = 200;
    /// Smallest selectable sampling square edge
    pub const MIN_SIZE: u32 = 10;
    /// Largest selectable sampling square edge
    pub const MAX_SIZE: u32 = 100;
}

/// Display envelope the panorama is fitted into
pub mod display {
    /// Maximum display width in pixels
    pub const MAX_WIDTH: u32 = 1280;
    /// Maximum display height in pixels
    pub const MAX_HEIGHT: u32 = 480;

    /// Fit a panorama into the display envelope preserving aspect ratio
    ///
    /// Width is pinned to the maximum first; if the resulting height
    /// exceeds the height budget, height is pinned instead and width
    /// recomputed.
    pub fn fit(pano_width: u32, pano_height: u32) -> (u32, u32) {
        assert!(pano_width > 0 && pano_height > 0, "empty panorama");

        let width = MAX_WIDTH;
        let height = (width as f64 * pano_height as f64 / pano_width as f64).round() as u32;
        if height > MAX_HEIGHT {
            let height = MAX_HEIGHT;
            let width = (height as f64 * pano_width as f64 / pano_height as f64).round() as u32;
            (width.max(1), height)
        } else {
            (width, height.max(1))
        }
    }
}

/// Distance from a point to the segment `a`-`b`
pub fn segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let len_sq = (b.x - a.x).powi(2) + (b.y - a.y).powi(2);
    if len_sq == 0.0 {
        return p.distance_to(a);
    }

    let t = ((p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y)) / len_sq;
    let t = t.clamp(0.0, 1.0);
    let closest = Point::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y));
    p.distance_to(closest)
}

/// Shrink a box symmetrically by `fraction` of each dimension
///
/// `fraction` 0.75 leaves a quarter-size box around the same center, which
/// is how selection handles are downscaled inside the magnifier.
pub fn shrink_box(bbox: BoundingBox, fraction: f64) -> BoundingBox {
    let inset_x = bbox.width() * fraction / 2.0;
    let inset_y = bbox.height() * fraction / 2.0;
    BoundingBox::new(
        Point::new(bbox.min.x + inset_x, bbox.min.y + inset_y),
        Point::new(bbox.max.x - inset_x, bbox.max.y - inset_y),
    )
}

/// Cross marker drawn in the middle of the magnifier viewport
pub mod cross {
    use crate::domain::Point;

    /// Half of the cross stroke width
    pub const HALF_WIDTH: f64 = 1.0;
    /// Half of the cross extent (arm length plus stroke)
    pub const HALF_HEIGHT: f64 = 11.0;

    /// The twelve corners of a plus-shaped polygon centered on `middle`
    pub fn points(middle: Point) -> [Point; 12] {
        let (mx, my) = (middle.x, middle.y);
        let (hh, hw) = (HALF_HEIGHT, HALF_WIDTH);

        [
            Point::new(mx - hw, my + hh),
            Point::new(mx + hw, my + hh),
            Point::new(mx + hw, my + hw),
            Point::new(mx + hh, my + hw),
            Point::new(mx + hh, my - hw),
            Point::new(mx + hw, my - hw),
            Point::new(mx + hw, my - hh),
            Point::new(mx - hw, my - hh),
            Point::new(mx - hw, my - hw),
            Point::new(mx - hh, my - hw),
            Point::new(mx - hh, my + hw),
            Point::new(mx - hw, my + hw),
        ]
    }
}

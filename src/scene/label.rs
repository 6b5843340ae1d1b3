//! Distance label placement
//!
//! Labels are derived data: recomputed whenever a line moves, calibration
//! changes, or visibility is toggled, never patched incrementally. The core
//! computes text, anchor, and background rectangle; glyph rendering is the
//! UI layer's job and the compositor fills the rectangle.

use crate::domain::{BoundingBox, MeasureLine, Point};

/// Offset of the label anchor from the line midpoint in pixels
pub const OFFSET: f64 = 15.0;
/// Assumed glyph advance for the background rectangle
const GLYPH_WIDTH: f64 = 9.0;
/// Background rectangle height
const HEIGHT: f64 = 22.0;
/// Horizontal padding inside the background rectangle
const PADDING: f64 = 3.0;

/// A formatted distance readout for one line
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceLabel {
    pub text: String,
    /// Center of the label
    pub anchor: Point,
    /// Background rectangle behind the text
    pub rect: BoundingBox,
}

/// Place a label along the outward perpendicular bisector of `line`
///
/// The perpendicular with a non-negative vertical component is chosen; for
/// a vertical line the perpendicular slope is undefined and defaults to 1.
pub fn place(line: &MeasureLine, text: String) -> DistanceLabel {
    let mid = line.a.midpoint(line.b);

    let dx = line.b.x - line.a.x;
    let dy = line.b.y - line.a.y;
    let slope = if dy != 0.0 { -dx / dy } else { 1.0 };

    let norm = (1.0 + slope * slope).sqrt();
    let mut perp = Point::new(1.0 / norm, slope / norm);
    if perp.y < 0.0 {
        perp = Point::new(-perp.x, -perp.y);
    }

    let anchor = Point::new(mid.x - OFFSET * perp.x, mid.y - OFFSET * perp.y);

    let half_w = (text.chars().count() as f64 * GLYPH_WIDTH) / 2.0 + PADDING;
    let rect = BoundingBox::new(
        Point::new(anchor.x - half_w, anchor.y - HEIGHT / 2.0),
        Point::new(anchor.x + half_w, anchor.y + HEIGHT / 2.0),
    );

    DistanceLabel { text, anchor, rect }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Rgb;

    #[test]
    fn test_horizontal_line_label_above_midpoint() {
        // Perpendicular of a horizontal line is vertical; the non-negative-y
        // direction is chosen and the anchor sits OFFSET away from it.
        let line = MeasureLine::new(Point::new(0.0, 50.0), Point::new(100.0, 50.0), Rgb::WHITE);
        let label = place(&line, "5.00 m".into());
        assert!((label.anchor.x - 50.0).abs() < 1e-9);
        assert!((label.anchor.y - (50.0 - OFFSET)).abs() < 1e-9);
    }

    #[test]
    fn test_vertical_line_uses_slope_one_tie_break() {
        let line = MeasureLine::new(Point::new(10.0, 0.0), Point::new(10.0, 100.0), Rgb::WHITE);
        let label = place(&line, "x".into());
        let expected = OFFSET / 2.0_f64.sqrt();
        assert!((label.anchor.x - (10.0 - expected)).abs() < 1e-9);
        assert!((label.anchor.y - (50.0 - expected)).abs() < 1e-9);
    }

    #[test]
    fn test_rect_centered_on_anchor() {
        let line = MeasureLine::new(Point::new(0.0, 0.0), Point::new(40.0, 30.0), Rgb::WHITE);
        let label = place(&line, "2.00 m".into());
        assert_eq!(label.rect.center(), label.anchor);
        assert!(label.rect.width() > 0.0);
    }

    #[test]
    fn test_label_moves_with_line() {
        let mut line = MeasureLine::new(Point::new(0.0, 10.0), Point::new(20.0, 10.0), Rgb::WHITE);
        let before = place(&line, "d".into());
        line.set_endpoints(Point::new(5.0, 10.0), Point::new(25.0, 10.0));
        let after = place(&line, "d".into());
        assert!((after.anchor.x - before.anchor.x - 5.0).abs() < 1e-9);
    }
}

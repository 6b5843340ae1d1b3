//! Core value types shared across the crate
//!
//! Everything here lives in display space (the fitted panorama view) unless
//! a function says otherwise. Panorama-space values only appear at the
//! tracker boundary.

use serde::{Deserialize, Serialize};

/// A 2D point in display coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn translated(self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }
}

/// Axis-aligned bounding box, `min` is the top-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn from_xywh(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            min: Point::new(x, y),
            max: Point::new(x + w, y + h),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Geometric center (the COM of a tracked box)
    pub fn center(&self) -> Point {
        self.min.midpoint(self.max)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        Self {
            min: Point::new(self.min.x * sx, self.min.y * sy),
            max: Point::new(self.max.x * sx, self.max.y * sy),
        }
    }
}

/// Opaque handle of a measurement line in the scene store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineId(pub(crate) u64);

/// A measurement line between two display-space endpoints
///
/// `pixel_len` is recomputed on every endpoint mutation and is never stale.
#[derive(Debug, Clone)]
pub struct MeasureLine {
    pub a: Point,
    pub b: Point,
    pub pixel_len: f64,
    pub color: Rgb,
}

impl MeasureLine {
    pub fn new(a: Point, b: Point, color: Rgb) -> Self {
        Self {
            a,
            b,
            pixel_len: a.distance_to(b),
            color,
        }
    }

    pub fn set_endpoints(&mut self, a: Point, b: Point) {
        self.a = a;
        self.b = b;
        self.pixel_len = a.distance_to(b);
    }
}

/// A draggable marker at a line endpoint enabling resize/move
#[derive(Debug, Clone, Copy)]
pub struct SelectionHandle {
    pub line: LineId,
    pub pos: Point,
}

/// Active annotation tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolMode {
    #[default]
    Idle,
    Draw,
    Select,
    Erase,
    ClearAll,
    Calibrate,
}

/// Distance unit system; `Pixels` is the uncalibrated initial state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnitSystem {
    #[default]
    Pixels,
    Metric,
    Imperial,
}

/// Display unit for velocity readouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VelocityUnit {
    MetersPerSecond,
    #[default]
    KilometersPerHour,
    FeetPerSecond,
    MilesPerHour,
}

impl VelocityUnit {
    pub fn suffix(self) -> &'static str {
        match self {
            VelocityUnit::MetersPerSecond => "m/s",
            VelocityUnit::KilometersPerHour => "km/h",
            VelocityUnit::FeetPerSecond => "ft/s",
            VelocityUnit::MilesPerHour => "mph",
        }
    }
}

/// Cursor shape the UI layer should show, derived from hover state and tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorShape {
    #[default]
    Default,
    Crosshair,
    Move,
    Resize,
    Delete,
    Clear,
}

/// Serializable color for lines and paths
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Default for Rgb {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Rgb {
    pub const WHITE: Rgb = Rgb {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Convert to image crate RGBA format (0-255)
    pub fn to_rgba_u8(self) -> [u8; 4] {
        [
            (self.r * 255.0).round() as u8,
            (self.g * 255.0).round() as u8,
            (self.b * 255.0).round() as u8,
            255,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_len_tracks_endpoint_mutation() {
        let mut line = MeasureLine::new(Point::new(0.0, 0.0), Point::new(3.0, 4.0), Rgb::WHITE);
        assert_eq!(line.pixel_len, 5.0);

        line.set_endpoints(Point::new(1.0, 1.0), Point::new(1.0, 11.0));
        assert_eq!(line.pixel_len, 10.0);
    }

    #[test]
    fn test_bounding_box_center() {
        let bbox = BoundingBox::from_xywh(10.0, 20.0, 4.0, 6.0);
        assert_eq!(bbox.center(), Point::new(12.0, 23.0));
    }

    #[test]
    fn test_rgb_to_rgba_u8() {
        assert_eq!(Rgb::new(0.0, 0.5, 1.0).to_rgba_u8(), [0, 128, 255, 255]);
    }
}

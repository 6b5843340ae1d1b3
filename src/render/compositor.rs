//! Frame compositing onto the fitted panorama
//!
//! The scaled panorama is drawn once and cached; the active frame's pixels
//! land on top at their located position. All vector work (lines, handles,
//! labels, path, boxes) is stroked into the RGBA buffer with tiny-skia.

use image::{RgbaImage, imageops};
use tiny_skia::{
    FillRule, LineCap, Paint, PathBuilder, Pixmap, Stroke, Transform,
};

use crate::domain::{BoundingBox, MeasureLine, Point, Rgb, SelectionHandle};
use crate::render::geometry::{self, display, handle as handle_geom};
use crate::scene::label::DistanceLabel;
use crate::video::VideoSource;

/// Selection handle fill, matching the drawn handle accent
const HANDLE_FILL: [u8; 4] = [45, 101, 164, 255];
/// Bounding box stroke
const BOX_COLOR: [u8; 4] = [220, 40, 40, 255];
/// Label and velocity tag background
const TAG_BACKGROUND: [u8; 4] = [0, 0, 0, 255];

/// Caches the fitted panorama and the panorama-to-display scale
pub struct Compositor {
    width: u32,
    height: u32,
    scale: (f64, f64),
    panorama: RgbaImage,
}

impl Compositor {
    pub fn new(source: &VideoSource) -> Self {
        let (pw, ph) = (source.panorama.width(), source.panorama.height());
        let (width, height) = display::fit(pw, ph);
        let panorama = imageops::resize(
            &source.panorama,
            width,
            height,
            imageops::FilterType::Nearest,
        );
        log::debug!("display fitted to {width}x{height} from {pw}x{ph}");

        Self {
            width,
            height,
            scale: (width as f64 / pw as f64, height as f64 / ph as f64),
            panorama,
        }
    }

    pub fn display_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Panorama-to-display scale factors
    pub fn scale(&self) -> (f64, f64) {
        self.scale
    }

    /// Map a display-space box back into panorama space
    pub fn to_panorama(&self, bbox: BoundingBox) -> BoundingBox {
        bbox.scaled(1.0 / self.scale.0, 1.0 / self.scale.1)
    }

    /// Cached panorama plus the active frame composited at its location
    pub fn compose_base(&self, source: &VideoSource, frame: usize) -> RgbaImage {
        let mut img = self.panorama.clone();

        if let Some(located) = source.frames.get(frame) {
            let w = (located.image.width() as f64 * self.scale.0).round().max(1.0) as u32;
            let h = (located.image.height() as f64 * self.scale.1).round().max(1.0) as u32;
            let scaled = imageops::resize(&located.image, w, h, imageops::FilterType::Nearest);

            let x = (located.origin.0 as f64 * self.scale.0).round() as i64;
            let y = (located.origin.1 as f64 * self.scale.1).round() as i64;
            imageops::overlay(&mut img, &scaled, x, y);
        }

        img
    }
}

/// Convert the image to a Pixmap, apply a drawing closure, and copy back
fn with_pixmap(img: &mut RgbaImage, f: impl FnOnce(&mut Pixmap)) {
    let (w, h) = (img.width(), img.height());
    let Some(mut pixmap) = Pixmap::from_vec(
        img.as_raw().clone(),
        tiny_skia::IntSize::from_wh(w, h).unwrap(),
    ) else {
        return;
    };

    f(&mut pixmap);

    img.copy_from_slice(pixmap.data());
}

fn solid_paint(rgba: [u8; 4]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]);
    paint.anti_alias = true;
    paint
}

/// Stroke measurement lines with round caps
pub fn draw_lines<'a>(
    img: &mut RgbaImage,
    lines: impl Iterator<Item = &'a MeasureLine>,
    width: f32,
) {
    let lines: Vec<&MeasureLine> = lines.collect();
    if lines.is_empty() {
        return;
    }

    with_pixmap(img, |pixmap| {
        let stroke = Stroke {
            width,
            line_cap: LineCap::Round,
            ..Default::default()
        };

        for line in lines {
            let mut pb = PathBuilder::new();
            pb.move_to(line.a.x as f32, line.a.y as f32);
            pb.line_to(line.b.x as f32, line.b.y as f32);
            let Some(path) = pb.finish() else {
                continue;
            };

            let paint = solid_paint(line.color.to_rgba_u8());
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
    });
}

/// Draw the selection handle pair as filled, white-rimmed circles
///
/// `shrink` removes that fraction of each handle's bounding box, which the
/// magnifier uses to keep handles readable after resampling.
pub fn draw_handles(img: &mut RgbaImage, handles: &[SelectionHandle; 2], shrink: Option<f64>) {
    with_pixmap(img, |pixmap| {
        for h in handles {
            let mut radius = handle_geom::RADIUS;
            if let Some(fraction) = shrink {
                let bbox = BoundingBox::new(
                    Point::new(h.pos.x - radius, h.pos.y - radius),
                    Point::new(h.pos.x + radius, h.pos.y + radius),
                );
                radius = (geometry::shrink_box(bbox, fraction).width() / 2.0).max(0.5);
            }

            let Some(circle) =
                PathBuilder::from_circle(h.pos.x as f32, h.pos.y as f32, radius as f32)
            else {
                continue;
            };

            pixmap.fill_path(
                &circle,
                &solid_paint(HANDLE_FILL),
                FillRule::Winding,
                Transform::identity(),
                None,
            );

            let rim = Stroke {
                width: 1.0,
                ..Default::default()
            };
            pixmap.stroke_path(
                &circle,
                &solid_paint([255, 255, 255, 255]),
                &rim,
                Transform::identity(),
                None,
            );
        }
    });
}

/// Fill the background rectangles of visible distance labels
///
/// Glyphs are the UI layer's concern; the core renders the plates so the
/// label geometry stays authoritative here.
pub fn draw_label_plates<'a>(img: &mut RgbaImage, labels: impl Iterator<Item = &'a DistanceLabel>) {
    let rects: Vec<BoundingBox> = labels.map(|l| l.rect).collect();
    if rects.is_empty() {
        return;
    }

    with_pixmap(img, |pixmap| {
        let paint = solid_paint(TAG_BACKGROUND);
        for r in rects {
            if let Some(rect) = tiny_skia::Rect::from_xywh(
                r.min.x as f32,
                r.min.y as f32,
                r.width() as f32,
                r.height() as f32,
            ) {
                pixmap.fill_rect(rect, &paint, Transform::identity(), None);
            }
        }
    });
}

/// Polyline through the accumulated COM path
pub fn draw_path(img: &mut RgbaImage, points: &[Point], color: Rgb) {
    if points.len() < 2 {
        return;
    }

    with_pixmap(img, |pixmap| {
        let mut pb = PathBuilder::new();
        pb.move_to(points[0].x as f32, points[0].y as f32);
        for p in &points[1..] {
            pb.line_to(p.x as f32, p.y as f32);
        }
        let Some(path) = pb.finish() else {
            return;
        };

        let stroke = Stroke {
            width: geometry::line::WIDTH,
            line_cap: LineCap::Round,
            ..Default::default()
        };
        pixmap.stroke_path(
            &path,
            &solid_paint(color.to_rgba_u8()),
            &stroke,
            Transform::identity(),
            None,
        );
    });
}

/// Stroke the tracked bounding box for the current frame
pub fn draw_bounding_box(img: &mut RgbaImage, bbox: BoundingBox) {
    with_pixmap(img, |pixmap| {
        let Some(rect) = tiny_skia::Rect::from_xywh(
            bbox.min.x as f32,
            bbox.min.y as f32,
            bbox.width() as f32,
            bbox.height() as f32,
        ) else {
            return;
        };
        let path = PathBuilder::from_rect(rect);

        let stroke = Stroke {
            width: geometry::line::WIDTH,
            ..Default::default()
        };
        pixmap.stroke_path(
            &path,
            &solid_paint(BOX_COLOR),
            &stroke,
            Transform::identity(),
            None,
        );
    });
}

/// Background plate for the velocity readout, anchored above the box
pub fn draw_velocity_plate(img: &mut RgbaImage, bbox: BoundingBox, text: &str) {
    let width = text.chars().count() as f64 * 10.0 + 6.0;
    let height = 24.0;
    let rect = BoundingBox::from_xywh(bbox.min.x, bbox.min.y - height - 4.0, width, height);

    with_pixmap(img, |pixmap| {
        if let Some(r) = tiny_skia::Rect::from_xywh(
            rect.min.x as f32,
            rect.min.y as f32,
            rect.width() as f32,
            rect.height() as f32,
        ) {
            pixmap.fill_rect(r, &solid_paint(TAG_BACKGROUND), Transform::identity(), None);
        }
    });
}

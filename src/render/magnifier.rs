//! Magnified cursor-following preview
//!
//! Composites the panorama and current frame, draws every line and the
//! shrunken selection handles for continuity, crops a square around the
//! cursor, and resamples it nearest-neighbor into the fixed viewport so
//! pixel boundaries stay crisp for measurement work. A cross marker sits
//! centered above everything.

use image::{RgbaImage, imageops};
use tiny_skia::{FillRule, Paint, PathBuilder, Transform};

use crate::domain::Point;
use crate::render::compositor::{draw_handles, draw_lines};
use crate::render::geometry::{cross, handle, line, magnifier};
use crate::scene::SceneStore;

/// Render the magnifier viewport for a cursor position
///
/// `base` is the already-composited panorama-plus-frame at display
/// resolution; `sample_size` is the edge of the square sampled around the
/// cursor, clamped to its control range and to the image.
pub fn view(base: &RgbaImage, scene: &SceneStore, cursor: Point, sample_size: u32) -> RgbaImage {
    let mut img = base.clone();

    draw_lines(&mut img, scene.lines().map(|(_, l)| l), line::MAGNIFIER_WIDTH);
    if let Some(handles) = scene.selection() {
        draw_handles(&mut img, handles, Some(handle::MAGNIFIER_SHRINK));
    }

    let size = sample_size
        .clamp(magnifier::MIN_SIZE, magnifier::MAX_SIZE)
        .min(img.width())
        .min(img.height());

    let x = (cursor.x as i64 - size as i64 / 2).clamp(0, (img.width() - size) as i64) as u32;
    let y = (cursor.y as i64 - size as i64 / 2).clamp(0, (img.height() - size) as i64) as u32;

    let cropped = imageops::crop_imm(&img, x, y, size, size).to_image();
    let mut out = imageops::resize(
        &cropped,
        magnifier::VIEWPORT,
        magnifier::VIEWPORT,
        imageops::FilterType::Nearest,
    );

    draw_cross(&mut out);
    out
}

/// Fixed yellow cross in the middle of the viewport, above all content
fn draw_cross(img: &mut RgbaImage) {
    let center = Point::new(img.width() as f64 / 2.0, img.height() as f64 / 2.0);
    let points = cross::points(center);

    let (w, h) = (img.width(), img.height());
    let Some(mut pixmap) = tiny_skia::Pixmap::from_vec(
        img.as_raw().clone(),
        tiny_skia::IntSize::from_wh(w, h).unwrap(),
    ) else {
        return;
    };

    let mut pb = PathBuilder::new();
    pb.move_to(points[0].x as f32, points[0].y as f32);
    for p in &points[1..] {
        pb.line_to(p.x as f32, p.y as f32);
    }
    pb.close();
    let Some(path) = pb.finish() else {
        return;
    };

    let mut paint = Paint::default();
    paint.set_color_rgba8(255, 220, 0, 255);
    pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);

    img.copy_from_slice(pixmap.data());
}

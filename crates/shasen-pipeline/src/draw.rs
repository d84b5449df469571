//! Segment rendering onto a blank overlay.
//!
//! Strokes detected segments onto a new all-black canvas with
//! `tiny-skia`, producing the overlay image that the compositor later
//! blends over the photograph. Rendering never touches a caller-owned
//! buffer; the overlay is always freshly allocated.

use tiny_skia::{LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::types::{Dimensions, DrawStyle, LineSegment, RgbImage};

/// Stroke every segment onto a new black canvas.
///
/// Segments are drawn as anti-aliased round-capped strokes in the
/// style's color and thickness. Segments that fall outside the canvas
/// are clipped, not an error. With no segments the canvas comes back
/// entirely black.
#[must_use = "returns the rendered overlay"]
#[allow(clippy::cast_precision_loss)]
pub fn render_segments(
    segments: &[LineSegment],
    dimensions: Dimensions,
    style: DrawStyle,
) -> RgbImage {
    let mut canvas = RgbImage::new(dimensions.width, dimensions.height);
    if segments.is_empty() {
        return canvas;
    }
    let Some(mut pixmap) = Pixmap::new(dimensions.width, dimensions.height) else {
        return canvas;
    };

    let mut builder = PathBuilder::new();
    for segment in segments {
        builder.move_to(segment.x1 as f32, segment.y1 as f32);
        builder.line_to(segment.x2 as f32, segment.y2 as f32);
    }
    let Some(path) = builder.finish() else {
        return canvas;
    };

    let mut paint = Paint::default();
    paint.set_color_rgba8(style.color[0], style.color[1], style.color[2], 255);
    paint.anti_alias = true;

    let stroke = Stroke {
        width: style.thickness as f32,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };
    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);

    // The pixmap is premultiplied RGBA over a transparent background,
    // which is exactly the straight RGB composite over black.
    for (pixel, rgba) in canvas.pixels_mut().zip(pixmap.data().chunks_exact(4)) {
        pixel.0 = [rgba[0], rgba[1], rgba[2]];
    }
    canvas
}

//! Integration test: run a synthetic road scene through the full
//! pipeline and check the recovered lane geometry.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use shasen_pipeline::{
    Dimensions, DrawStyle, LineSegment, PipelineConfig, RgbImage, Vertex, draw, process,
    process_staged,
};

fn encode_png(img: &RgbImage) -> Vec<u8> {
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(
        encoder,
        img.as_raw(),
        img.width(),
        img.height(),
        image::ExtendedColorType::Rgb8,
    )
    .unwrap();
    buf
}

/// A 960x540 night scene with two painted lane markings.
///
/// The left marking runs from (200, 500) up to (440, 332) at slope
/// -0.7, the right from (520, 332) down to (760, 500) at slope 0.7.
/// Both sit inside the default forward-road trapezoid.
fn lane_scene_png() -> Vec<u8> {
    let markings = [
        LineSegment::new(200, 500, 440, 332),
        LineSegment::new(520, 332, 760, 500),
    ];
    let scene = draw::render_segments(
        &markings,
        Dimensions {
            width: 960,
            height: 540,
        },
        DrawStyle {
            color: [255, 255, 255],
            thickness: 4,
        },
    );
    encode_png(&scene)
}

#[test]
fn synthetic_lane_markings_are_recovered() {
    let png = lane_scene_png();
    let result = process(&png, &PipelineConfig::default()).expect("pipeline should succeed");

    eprintln!("Recovered {} segments", result.segments.len());
    assert_eq!(
        result.dimensions,
        Dimensions {
            width: 960,
            height: 540
        },
    );
    assert!(!result.segments.is_empty());

    // Each painted marking must be recovered with its slope intact.
    let leaning_left = result.segments.iter().any(|s| {
        s.slope()
            .is_some_and(|slope| (-0.9..=-0.5).contains(&slope) && s.length() >= 100.0)
    });
    let leaning_right = result.segments.iter().any(|s| {
        s.slope()
            .is_some_and(|slope| (0.5..=0.9).contains(&slope) && s.length() >= 100.0)
    });
    assert!(leaning_left, "no left lane found in {:?}", result.segments);
    assert!(leaning_right, "no right lane found in {:?}", result.segments);

    // The overlay strokes survive compositing as red-dominant pixels.
    let reddish = result
        .composite
        .pixels()
        .filter(|p| p.0[0] > 200 && p.0[1] < 100)
        .count();
    assert!(reddish > 100, "only {reddish} red pixels in composite");
}

#[test]
fn featureless_road_yields_no_segments() {
    let black = RgbImage::new(960, 540);
    let png = encode_png(&black);
    let result = process(&png, &PipelineConfig::default()).expect("pipeline should succeed");
    assert!(result.segments.is_empty());
    // Black input, black overlay: the composite stays black.
    assert!(result.composite.pixels().all(|p| p.0 == [0, 0, 0]));
}

#[test]
fn repeated_runs_are_identical() {
    let png = lane_scene_png();
    let config = PipelineConfig::default();
    let first = process(&png, &config).unwrap();
    let second = process(&png, &config).unwrap();
    assert_eq!(first.segments, second.segments);
    assert_eq!(first.composite, second.composite);
}

#[test]
fn staged_run_exposes_consistent_intermediates() {
    let png = lane_scene_png();
    let config = PipelineConfig::default();
    let staged = process_staged(&png, &config).expect("pipeline should succeed");

    for (name, dims) in [
        ("grayscale", staged.grayscale.dimensions()),
        ("blurred", staged.blurred.dimensions()),
        ("edges", staged.edges.dimensions()),
        ("masked", staged.masked.dimensions()),
        ("overlay", staged.overlay.dimensions()),
        ("composite", staged.composite.dimensions()),
    ] {
        assert_eq!(dims, (960, 540), "{name} dimensions");
    }

    // Default fractions on 960x540 give this exact trapezoid.
    assert_eq!(
        staged.trapezoid.vertices(),
        &[
            Vertex::new(48, 539),
            Vertex::new(432, 324),
            Vertex::new(528, 324),
            Vertex::new(912, 539),
        ],
    );

    // Masking only removes edge pixels, never adds them.
    for (masked, edge) in staged.masked.pixels().zip(staged.edges.pixels()) {
        if masked.0[0] != 0 {
            assert_eq!(masked.0[0], edge.0[0]);
        }
    }

    let flat = process(&png, &config).unwrap();
    assert_eq!(flat.segments, staged.segments);
}

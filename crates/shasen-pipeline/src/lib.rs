//! shasen-pipeline: Pure lane detection pipeline (sans-IO).
//!
//! Converts road photographs into lane-boundary line segments through:
//! grayscale -> blur -> Canny edge detection -> trapezoid region mask ->
//! probabilistic Hough transform -> overlay rendering -> compositing.
//!
//! Everything here works on in-memory byte slices and pixel buffers;
//! nothing reads or writes the filesystem. Directory walking, file
//! naming, and montage output all belong to the `shasen` CLI crate.

pub mod blend;
pub mod blur;
pub mod diagnostics;
pub mod draw;
pub mod edge;
pub mod grayscale;
pub mod hough;
pub mod pipeline;
pub mod region;
pub mod types;

pub use diagnostics::{PipelineDiagnostics, PipelineSummary, StageMetrics, TimedStage};
pub use pipeline::Pipeline;
pub use types::{
    BlendWeights, Dimensions, DrawStyle, GrayImage, HoughParams, LineSegment, MaskFractions,
    PipelineConfig, PipelineError, Polygon, ProcessResult, RgbImage, StagedResult, Vertex,
};

/// Run the full lane detection pipeline.
///
/// Feeds raw image bytes (PNG, JPEG, BMP, WebP) through every stage
/// under the given configuration and produces a [`ProcessResult`]:
/// the extracted lane segments, the annotated composite image, and
/// the source dimensions.
///
/// # Pipeline steps
///
/// 1. Decode image
/// 2. Grayscale conversion
/// 3. Gaussian blur (noise reduction)
/// 4. Canny edge detection
/// 5. Trapezoid region mask
/// 6. Probabilistic Hough segment extraction
/// 7. Overlay rendering
/// 8. Weighted compositing
///
/// An image with no detectable lane lines yields an empty segment
/// vector and a composite without an overlay; that is a valid result,
/// not an error.
///
/// # Errors
///
/// Returns a configuration error ([`PipelineError::InvalidKernelSize`],
/// [`PipelineError::InvalidThresholds`], or
/// [`PipelineError::InvalidConfig`]) before any processing happens.
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty and
/// [`PipelineError::ImageDecode`] if the image format is unrecognized.
pub fn process(
    image_bytes: &[u8],
    config: &PipelineConfig,
) -> Result<ProcessResult, PipelineError> {
    config.validate()?;

    // 1. Decode and record dimensions.
    let decoded = grayscale::decode(image_bytes)?;
    let original = grayscale::to_rgb(&decoded);
    let dimensions = Dimensions {
        width: original.width(),
        height: original.height(),
    };

    // 2. Grayscale conversion.
    let gray = grayscale::to_luma(&decoded);

    // 3. Gaussian blur.
    let blurred = blur::gaussian_blur(&gray, config.blur_kernel)?;

    // 4. Canny edge detection.
    let edges = edge::canny(&blurred, config.canny_low, config.canny_high)?;

    // 5. Trapezoid region mask.
    let trapezoid = region::road_trapezoid(dimensions, config.mask);
    let masked = region::mask_region(&edges, &trapezoid)?;

    // 6. Probabilistic Hough segment extraction.
    let segments = hough::detect_segments(&masked, &config.hough);

    // 7. Overlay rendering.
    let overlay = draw::render_segments(&segments, dimensions, config.style);

    // 8. Weighted compositing.
    let composite = blend::blend_weighted(&original, &overlay, config.blend)?;

    Ok(ProcessResult {
        segments,
        composite,
        dimensions,
    })
}

/// Run the full pipeline and keep every intermediate stage output.
///
/// Produces the same segments and composite as [`process`] on the same
/// input, plus the grayscale, blurred, edge, and masked rasters and
/// the trapezoid polygon. Useful for parameter tuning, at the cost of
/// pinning every intermediate in memory at once.
///
/// # Errors
///
/// Same failure modes as [`process`].
pub fn process_staged(
    image_bytes: &[u8],
    config: &PipelineConfig,
) -> Result<StagedResult, PipelineError> {
    Ok(Pipeline::new(image_bytes.to_vec(), config.clone())
        .decode()?
        .to_grayscale()
        .blur()?
        .detect_edges()?
        .mask()?
        .extract_segments()
        .render()
        .composite()?
        .into_result())
}

/// Run the full pipeline, collecting per-stage timing and metrics.
///
/// Drives the same stages as [`process`] with a wall-clock measurement
/// around each advance. The returned [`PipelineDiagnostics`] can be
/// rendered with [`PipelineDiagnostics::report`] or serialized to
/// JSON.
///
/// # Errors
///
/// Same failure modes as [`process`].
#[allow(clippy::too_many_lines)]
pub fn process_with_diagnostics(
    image_bytes: &[u8],
    config: &PipelineConfig,
) -> Result<(ProcessResult, PipelineDiagnostics), PipelineError> {
    use std::time::Instant;

    fn timed(since: Instant, details: StageMetrics) -> TimedStage {
        TimedStage {
            elapsed: since.elapsed(),
            details,
        }
    }

    let bytes_in = image_bytes.len();
    let started = Instant::now();

    let step = Instant::now();
    let decoded = Pipeline::new(image_bytes.to_vec(), config.clone()).decode()?;
    let dimensions = decoded.dimensions();
    let pixel_count = u64::from(dimensions.width) * u64::from(dimensions.height);
    let decode = timed(
        step,
        StageMetrics::Decode {
            bytes_in,
            width: dimensions.width,
            height: dimensions.height,
        },
    );

    let step = Instant::now();
    let grayscaled = decoded.to_grayscale();
    let grayscale = timed(
        step,
        StageMetrics::Grayscale {
            passthrough: grayscaled.passthrough(),
        },
    );

    let step = Instant::now();
    let blurred = grayscaled.blur()?;
    let blur = timed(
        step,
        StageMetrics::Blur {
            kernel_size: config.blur_kernel,
            sigma: blur::sigma_for_kernel(config.blur_kernel),
        },
    );

    let step = Instant::now();
    let edges_detected = blurred.detect_edges()?;
    let edge_pixels = diagnostics::count_edge_pixels(edges_detected.edges());
    let edge_detection = timed(
        step,
        StageMetrics::EdgeDetection {
            low: config.canny_low,
            high: config.canny_high,
            edge_pixels,
            image_pixels: pixel_count,
        },
    );

    let step = Instant::now();
    let masked = edges_detected.mask()?;
    let masked_edge_pixels = diagnostics::count_edge_pixels(masked.masked());
    let mask = timed(
        step,
        StageMetrics::Mask {
            vertices: masked.trapezoid().len(),
            edges_before: edge_pixels,
            edges_after: masked_edge_pixels,
        },
    );

    let step = Instant::now();
    let extracted = masked.extract_segments();
    let stats = diagnostics::segment_stats(extracted.segments());
    let segment_count = extracted.segments().len();
    let extraction = timed(
        step,
        StageMetrics::Extraction {
            segments: segment_count,
            shortest_px: stats.shortest,
            longest_px: stats.longest,
            mean_px: stats.mean,
        },
    );

    let step = Instant::now();
    let rendered = extracted.render();
    let render = timed(
        step,
        StageMetrics::Render {
            segments: segment_count,
            thickness_px: config.style.thickness,
        },
    );

    let step = Instant::now();
    let composited = rendered.composite()?;
    let composite = timed(
        step,
        StageMetrics::Composite {
            alpha: config.blend.alpha,
            beta: config.blend.beta,
            gamma: config.blend.gamma,
        },
    );

    let staged = composited.into_result();
    let collected = PipelineDiagnostics {
        decode,
        grayscale,
        blur,
        edge_detection,
        mask,
        extraction,
        render,
        composite,
        total: started.elapsed(),
        summary: PipelineSummary {
            width: dimensions.width,
            height: dimensions.height,
            masked_edge_pixels,
            segments: segment_count,
        },
    };

    Ok((
        ProcessResult {
            segments: staged.segments,
            composite: staged.composite,
            dimensions: staged.dimensions,
        },
        collected,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::codecs::png::PngEncoder;
    use image::{ExtendedColorType, ImageEncoder};

    fn png_of(img: &image::RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        PngEncoder::new(&mut buf)
            .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgb8)
            .unwrap();
        buf
    }

    /// Black left half, white right half; the vertical boundary cuts
    /// straight through the lane trapezoid.
    fn split_png(width: u32, height: u32) -> Vec<u8> {
        png_of(&image::RgbImage::from_fn(width, height, |x, _| {
            image::Rgb(if x < width / 2 { [0, 0, 0] } else { [255, 255, 255] })
        }))
    }

    fn flat_png(width: u32, height: u32, value: u8) -> Vec<u8> {
        png_of(&image::RgbImage::from_pixel(
            width,
            height,
            image::Rgb([value; 3]),
        ))
    }

    #[test]
    fn empty_bytes_are_rejected() {
        assert!(matches!(
            process(&[], &PipelineConfig::default()),
            Err(PipelineError::EmptyInput)
        ));
    }

    #[test]
    fn undecodable_bytes_are_rejected() {
        assert!(matches!(
            process(&[0xFF, 0x00], &PipelineConfig::default()),
            Err(PipelineError::ImageDecode(_))
        ));
    }

    #[test]
    fn bad_config_fails_before_decoding() {
        let config = PipelineConfig {
            blur_kernel: 2,
            ..PipelineConfig::default()
        };
        // Invalid bytes after an invalid config: the config wins.
        let result = process(&[0xFF, 0x00], &config);
        assert!(matches!(result, Err(PipelineError::InvalidKernelSize(2))));
    }

    #[test]
    fn featureless_photograph_is_a_valid_input() {
        let png = flat_png(100, 100, 128);
        let result = process(&png, &PipelineConfig::default()).unwrap();
        assert!(result.segments.is_empty());
        assert_eq!(result.dimensions.width, 100);
        assert_eq!(result.dimensions.height, 100);
        // With a black overlay the composite is the original scaled by
        // alpha: 128 * 0.8 = 102.4, rounded to 102.
        assert_eq!(result.composite.get_pixel(50, 50).0, [102, 102, 102]);
    }

    #[test]
    fn strong_vertical_boundary_yields_segments() {
        let result = process(&split_png(100, 100), &PipelineConfig::default()).unwrap();
        assert!(!result.segments.is_empty(), "no segments recovered");
        assert_eq!(result.dimensions.width, 100);
        assert_eq!(result.dimensions.height, 100);
    }

    #[test]
    fn staged_matches_process() {
        let png = split_png(100, 100);
        let config = PipelineConfig::default();
        let flat = process(&png, &config).unwrap();
        let staged = process_staged(&png, &config).unwrap();
        assert_eq!(flat.segments, staged.segments);
        assert_eq!(flat.composite, staged.composite);
        assert_eq!(flat.dimensions, staged.dimensions);
    }

    #[test]
    fn staged_keeps_every_intermediate() {
        let png = split_png(100, 100);
        let staged = process_staged(&png, &PipelineConfig::default()).unwrap();
        assert_eq!(staged.original.dimensions(), (100, 100));
        assert_eq!(staged.grayscale.dimensions(), (100, 100));
        assert_eq!(staged.blurred.dimensions(), (100, 100));
        assert_eq!(staged.edges.dimensions(), (100, 100));
        assert_eq!(staged.masked.dimensions(), (100, 100));
        assert_eq!(staged.overlay.dimensions(), (100, 100));
        assert_eq!(staged.trapezoid.len(), 4);
    }

    #[test]
    fn diagnostics_track_the_run() {
        let png = split_png(100, 100);
        let (result, diagnostics) =
            process_with_diagnostics(&png, &PipelineConfig::default()).unwrap();
        assert_eq!(diagnostics.summary.segments, result.segments.len());
        assert_eq!(diagnostics.summary.width, 100);
        assert_eq!(diagnostics.summary.height, 100);
        assert!(diagnostics.summary.masked_edge_pixels > 0);
        assert!(diagnostics.total > std::time::Duration::ZERO);
        let report = diagnostics.report();
        assert!(report.contains("hough"), "{report}");
    }

    #[test]
    fn diagnostics_on_flat_photograph_count_nothing() {
        let png = flat_png(100, 100, 128);
        let (result, diagnostics) =
            process_with_diagnostics(&png, &PipelineConfig::default()).unwrap();
        assert!(result.segments.is_empty());
        assert_eq!(diagnostics.summary.masked_edge_pixels, 0);
        assert_eq!(diagnostics.summary.segments, 0);
        assert!(matches!(
            diagnostics.extraction.details,
            StageMetrics::Extraction { segments: 0, .. },
        ));
    }
}

//! Canny edge detection.
//!
//! Wraps [`imageproc::edges::canny`] to detect edges in a blurred
//! grayscale image. Returns a binary image where white pixels (255)
//! are edges and black pixels (0) are background.
//!
//! The detector is consumed as a black box: gradient computation,
//! non-maximum suppression, and hysteresis thresholding all belong to
//! `imageproc`. This module only enforces the threshold contract.

use image::GrayImage;

use crate::types::PipelineError;

/// Highest meaningful Canny threshold for 8-bit gradient magnitudes.
pub const MAX_THRESHOLD: f32 = 255.0;
const _: () = assert!(MAX_THRESHOLD > 0.0);

/// Run Canny edge detection over a grayscale image.
///
/// Returns a binary image of identical dimensions: 255 for edge
/// pixels, 0 for non-edge. Pixels with gradient magnitude above
/// `high_threshold` are definite edges; those between the thresholds
/// are edges only if connected to a definite edge.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidThresholds`] unless
/// `0 < low_threshold < high_threshold <= 255`. An inverted or
/// collapsed threshold pair silently disables hysteresis, so it is
/// rejected rather than clamped.
pub fn canny(
    image: &GrayImage,
    low_threshold: f32,
    high_threshold: f32,
) -> Result<GrayImage, PipelineError> {
    if !(low_threshold > 0.0 && low_threshold < high_threshold && high_threshold <= MAX_THRESHOLD)
    {
        return Err(PipelineError::InvalidThresholds {
            low: low_threshold,
            high: high_threshold,
        });
    }

    Ok(imageproc::edges::canny(image, low_threshold, high_threshold))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Dark field on the left, bright field on the right, split at x = 12.
    fn split_field() -> GrayImage {
        GrayImage::from_fn(24, 16, |x, _| image::Luma([if x < 12 { 10 } else { 245 }]))
    }

    #[test]
    fn uniform_image_produces_no_edges() {
        let img = GrayImage::from_pixel(16, 16, image::Luma([96]));
        let edges = canny(&img, 50.0, 150.0).unwrap();
        assert!(
            edges.pixels().all(|p| p.0[0] == 0),
            "expected no edges in uniform image"
        );
    }

    #[test]
    fn sharp_boundary_is_detected() {
        let edges = canny(&split_field(), 50.0, 150.0).unwrap();
        let hits = edges.pixels().filter(|p| p.0[0] != 0).count();
        assert!(hits > 0, "expected edges along the x=12 split");
    }

    #[test]
    fn output_is_binary() {
        let edges = canny(&split_field(), 50.0, 150.0).unwrap();
        for pixel in edges.pixels() {
            assert!(
                pixel.0[0] == 0 || pixel.0[0] == 255,
                "expected binary edge map, got {}",
                pixel.0[0],
            );
        }
    }

    #[test]
    fn shape_is_preserved() {
        let edges = canny(&GrayImage::new(17, 31), 50.0, 150.0).unwrap();
        assert_eq!(edges.dimensions(), (17, 31));
    }

    #[test]
    fn bad_threshold_pairs_are_rejected() {
        let img = split_field();
        // Collapsed, inverted, zero-low, and above-255 pairs in turn.
        for (low, high) in [(100.0, 100.0), (200.0, 100.0), (0.0, 150.0), (50.0, 300.0)] {
            let result = canny(&img, low, high);
            assert!(
                matches!(result, Err(PipelineError::InvalidThresholds { .. })),
                "({low}, {high}) should be rejected",
            );
        }
    }
}

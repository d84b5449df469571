//! Weighted compositing of the overlay onto the photograph.
//!
//! Implements the linear blend `original * alpha + overlay * beta +
//! gamma` per channel, rounded to nearest and saturated to `[0, 255]`.
//! With the default weights the photograph is dimmed slightly and the
//! stroked segments are added at full strength, so the markings read
//! clearly over the road surface.

use crate::types::{BlendWeights, Dimensions, PipelineError, RgbImage};

/// Blend the overlay onto the original with per-channel weights.
///
/// Both images must have identical dimensions. Overlapping bright
/// regions can saturate; that is a property of the linear blend, not
/// an error.
///
/// # Errors
///
/// Returns [`PipelineError::ShapeMismatch`] when the dimensions
/// differ.
pub fn blend_weighted(
    original: &RgbImage,
    overlay: &RgbImage,
    weights: BlendWeights,
) -> Result<RgbImage, PipelineError> {
    if original.dimensions() != overlay.dimensions() {
        return Err(PipelineError::ShapeMismatch {
            expected: Dimensions {
                width: original.width(),
                height: original.height(),
            },
            actual: Dimensions {
                width: overlay.width(),
                height: overlay.height(),
            },
        });
    }

    let mut out = RgbImage::new(original.width(), original.height());
    for ((dst, src), over) in out
        .pixels_mut()
        .zip(original.pixels())
        .zip(overlay.pixels())
    {
        dst.0 = [
            blend_channel(src.0[0], over.0[0], weights),
            blend_channel(src.0[1], over.0[1], weights),
            blend_channel(src.0[2], over.0[2], weights),
        ];
    }
    Ok(out)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn blend_channel(original: u8, overlay: u8, weights: BlendWeights) -> u8 {
    let value = f64::from(original).mul_add(
        weights.alpha,
        f64::from(overlay).mul_add(weights.beta, weights.gamma),
    );
    value.round().clamp(0.0, 255.0) as u8
}

//! Image decoding and luminance conversion.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces the two
//! views the pipeline needs: the original RGB image for compositing
//! and a single-channel luminance image for edge detection.

use image::{ColorType, DynamicImage, GrayImage, RgbImage};

use crate::types::PipelineError;

/// Decode raw image bytes into a [`DynamicImage`].
///
/// The container format is sniffed from the bytes; anything the
/// `image` crate is compiled to read (PNG, JPEG, BMP, WebP) works.
///
/// # Errors
///
/// [`PipelineError::EmptyInput`] for a zero-length slice,
/// [`PipelineError::ImageDecode`] when the bytes are not a readable
/// image.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    Ok(image::load_from_memory(bytes)?)
}

/// Whether the decoded image stores luminance only (no color channels).
#[must_use]
pub fn is_single_channel(image: &DynamicImage) -> bool {
    matches!(
        image.color(),
        ColorType::L8 | ColorType::La8 | ColorType::L16 | ColorType::La16
    )
}

/// Convert a decoded image to single-channel luminance.
///
/// RGB input is reduced with perceptual luma weighting (green
/// contributes most, blue least). An image that is already
/// single-channel passes through unchanged apart from bit-depth
/// normalization; a warning is logged since that usually means the
/// source was pre-processed elsewhere.
#[must_use = "returns the luminance image"]
pub fn to_luma(image: &DynamicImage) -> GrayImage {
    if is_single_channel(image) {
        tracing::warn!("input image is already single-channel; luminance conversion is a no-op");
    }
    image.to_luma8()
}

/// Convert a decoded image to 8-bit RGB.
///
/// This is the canvas the final composite is built on; alpha is
/// discarded.
#[must_use = "returns the RGB image"]
pub fn to_rgb(image: &DynamicImage) -> RgbImage {
    image.to_rgb8()
}

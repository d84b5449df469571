//! Gaussian blur for noise suppression before edge detection.
//!
//! Road photographs carry high-frequency texture (asphalt grain,
//! foliage, sensor noise) that the Canny detector would happily turn
//! into spurious edges. A light blur ahead of it suppresses that
//! texture while leaving lane paint boundaries intact. The smoothing
//! itself is [`imageproc::filter::gaussian_blur_f32`].
//!
//! The blur is parameterized by an odd kernel size rather than a
//! sigma; the standard deviation is derived from the kernel size with
//! the conventional rule used when only a kernel is given.

use image::GrayImage;

use crate::types::PipelineError;

/// Standard deviation derived from an odd kernel size.
///
/// Uses the conventional auto-sigma rule
/// `0.3 * ((k - 1) * 0.5 - 1) + 0.8`, which yields `1.1` for the
/// default 5-pixel kernel.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sigma_for_kernel(kernel_size: u32) -> f32 {
    let half_extent = (kernel_size as f32 - 1.0).mul_add(0.5, -1.0);
    0.3_f32.mul_add(half_extent, 0.8)
}

/// Apply Gaussian blur to a grayscale image.
///
/// The kernel size must be a positive odd integer. A kernel size of 1
/// is the identity and returns the image unchanged. Output dimensions
/// always match the input.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidKernelSize`] if `kernel_size` is
/// zero or even.
pub fn gaussian_blur(image: &GrayImage, kernel_size: u32) -> Result<GrayImage, PipelineError> {
    if kernel_size == 0 || kernel_size.is_multiple_of(2) {
        return Err(PipelineError::InvalidKernelSize(kernel_size));
    }
    if kernel_size == 1 {
        return Ok(image.clone());
    }

    Ok(imageproc::filter::gaussian_blur_f32(
        image,
        sigma_for_kernel(kernel_size),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Black left half, white right half, step at x = 6.
    fn step(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, _| {
            image::Luma([if x < 6 { 0 } else { 255 }])
        })
    }

    /// Largest brightness jump between horizontally adjacent pixels.
    fn max_horizontal_jump(img: &GrayImage) -> i16 {
        let mut max = 0;
        for y in 0..img.height() {
            for x in 1..img.width() {
                let a = i16::from(img.get_pixel(x - 1, y).0[0]);
                let b = i16::from(img.get_pixel(x, y).0[0]);
                max = max.max((a - b).abs());
            }
        }
        max
    }

    #[test]
    fn even_and_zero_kernels_are_rejected() {
        let img = step(12, 8);
        for kernel in [0, 2, 4, 8] {
            assert!(
                matches!(
                    gaussian_blur(&img, kernel),
                    Err(PipelineError::InvalidKernelSize(k)) if k == kernel
                ),
                "kernel {kernel} should be rejected",
            );
        }
    }

    #[test]
    fn unit_kernel_is_the_identity() {
        let img = step(12, 8);
        assert_eq!(gaussian_blur(&img, 1).unwrap(), img);
    }

    #[test]
    fn shape_is_preserved() {
        for kernel in [3, 5, 7, 9] {
            let blurred = gaussian_blur(&GrayImage::new(17, 31), kernel).unwrap();
            assert_eq!(blurred.dimensions(), (17, 31));
        }
    }

    #[test]
    fn step_edge_is_softened() {
        let img = step(12, 8);
        let blurred = gaussian_blur(&img, 7).unwrap();
        let before = max_horizontal_jump(&img);
        let after = max_horizontal_jump(&blurred);
        assert_eq!(before, 255);
        assert!(after < 200, "blur left a jump of {after}");
    }

    #[test]
    fn flat_image_stays_flat() {
        let img = GrayImage::from_pixel(10, 10, image::Luma([200]));
        let blurred = gaussian_blur(&img, 5).unwrap();
        for pixel in blurred.pixels() {
            let off_by = (i16::from(pixel.0[0]) - 200).abs();
            assert!(off_by <= 1, "flat area drifted to {}", pixel.0[0]);
        }
    }

    #[test]
    fn default_kernel_sigma() {
        let sigma = sigma_for_kernel(5);
        assert!((sigma - 1.1).abs() < 1e-6, "expected 1.1, got {sigma}");
    }

    #[test]
    fn sigma_grows_with_kernel() {
        assert!(sigma_for_kernel(9) > sigma_for_kernel(5));
        assert!(sigma_for_kernel(5) > sigma_for_kernel(3));
    }
}

//! Shared types for the shasen lane detection pipeline.

use serde::{Deserialize, Serialize};

/// Single-channel raster, re-exported so callers can name the
/// grayscale intermediates without importing `image` themselves.
pub use image::GrayImage;

/// Three-channel raster, re-exported for the same reason: the decoded
/// photograph, the overlay, and the composite all use it.
pub use image::RgbImage;

/// A straight line segment with integer pixel endpoints.
///
/// Endpoints are in image coordinates: `x` grows rightward, `y` grows
/// downward. Segment extraction reports endpoints in the order the
/// line walk discovered them; no ordering between `(x1, y1)` and
/// `(x2, y2)` is guaranteed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSegment {
    /// First endpoint, horizontal position.
    pub x1: i32,
    /// First endpoint, vertical position.
    pub y1: i32,
    /// Second endpoint, horizontal position.
    pub x2: i32,
    /// Second endpoint, vertical position.
    pub y2: i32,
}

impl LineSegment {
    /// Create a new line segment.
    #[must_use]
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Euclidean length of the segment in pixels.
    #[must_use]
    pub fn length(self) -> f64 {
        let dx = f64::from(self.x2) - f64::from(self.x1);
        let dy = f64::from(self.y2) - f64::from(self.y1);
        dx.hypot(dy)
    }

    /// Slope `dy / dx` in image coordinates, or `None` for a vertical
    /// segment.
    ///
    /// Because `y` grows downward, a lane line leaning to the right in
    /// the photograph has a negative slope.
    #[must_use]
    pub fn slope(self) -> Option<f64> {
        if self.x1 == self.x2 {
            return None;
        }
        let dx = f64::from(self.x2) - f64::from(self.x1);
        let dy = f64::from(self.y2) - f64::from(self.y1);
        Some(dy / dx)
    }
}

/// A single polygon vertex in integer pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    /// Horizontal position (pixels from left edge).
    pub x: i32,
    /// Vertical position (pixels from top edge).
    pub y: i32,
}

impl Vertex {
    /// Create a new vertex.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// An ordered list of vertices forming one closed polygon ring.
///
/// The closing edge from the last vertex back to the first is
/// implicit; the last vertex must not repeat the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polygon(Vec<Vertex>);

impl Polygon {
    /// Create a new polygon from a vector of vertices.
    #[must_use]
    pub const fn new(vertices: Vec<Vertex>) -> Self {
        Self(vertices)
    }

    /// Returns `true` if the polygon has no vertices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of vertices in the polygon.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all vertices.
    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.0
    }

    /// Consumes the polygon and returns the underlying vertex vector.
    #[must_use]
    pub fn into_vertices(self) -> Vec<Vertex> {
        self.0
    }
}

/// Width and height of a raster, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Horizontal extent.
    pub width: u32,
    /// Vertical extent.
    pub height: u32,
}

/// Fractions of the image dimensions that position the lane trapezoid.
///
/// See [`region::road_trapezoid`](crate::region::road_trapezoid) for
/// how the four vertices are derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskFractions {
    /// Horizontal inset of the bottom corners as a fraction of image
    /// width. Also half the width of the trapezoid's top edge.
    /// Must lie in `(0, 0.5)`.
    pub x_pct: f64,
    /// Vertical position of the trapezoid's top edge as a fraction of
    /// image height. Must lie in `(0, 1)`.
    pub y_pct: f64,
}

/// Parameters for probabilistic Hough segment extraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HoughParams {
    /// Distance resolution of the accumulator in pixels per bin. Must
    /// be finite and at least [`PipelineConfig::MIN_HOUGH_RHO`].
    pub rho: f64,
    /// Angular resolution of the accumulator in radians per bin. Must
    /// be finite and at least [`PipelineConfig::MIN_HOUGH_THETA`].
    pub theta: f64,
    /// Minimum accumulator votes before a candidate line is walked.
    pub min_votes: u32,
    /// Minimum segment length in pixels; shorter walks are discarded.
    pub min_length: f64,
    /// Maximum gap in pixels bridged while walking a candidate line.
    pub max_gap: f64,
}

/// Stroke style for rendering extracted segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawStyle {
    /// Stroke color as `[R, G, B]`.
    pub color: [u8; 3],
    /// Stroke thickness in pixels. Must be at least 1.
    pub thickness: u32,
}

/// Per-channel weights for the final overlay composite.
///
/// Each output channel is `clamp(original * alpha + overlay * beta + gamma)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendWeights {
    /// Weight applied to the original image. Must be non-negative.
    pub alpha: f64,
    /// Weight applied to the rendered overlay. Must be non-negative.
    pub beta: f64,
    /// Scalar bias added to every channel before clamping.
    pub gamma: f64,
}

/// Configuration for the lane detection pipeline.
///
/// All parameters have defaults matching the reference tuning for
/// 960x540 dashcam frames. [`validate`](Self::validate) checks every
/// invariant once; the pipeline runs it before the first stage so a
/// bad configuration fails fast instead of mid-batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Gaussian blur kernel size in pixels. Must be a positive odd
    /// integer; the standard deviation is derived from it (see
    /// [`blur::sigma_for_kernel`](crate::blur::sigma_for_kernel)).
    pub blur_kernel: u32,

    /// Canny edge detector low threshold. Pixels with gradient
    /// magnitude between `canny_low` and `canny_high` are edges only
    /// if connected to a strong edge.
    ///
    /// Must be positive and strictly below `canny_high`.
    pub canny_low: f32,

    /// Canny edge detector high threshold. Pixels with gradient
    /// magnitude above this value are definite edges.
    ///
    /// Must be at most 255.
    pub canny_high: f32,

    /// Placement of the forward-road trapezoid mask.
    pub mask: MaskFractions,

    /// Segment extraction parameters.
    pub hough: HoughParams,

    /// Stroke style for the rendered overlay.
    pub style: DrawStyle,

    /// Weights for compositing the overlay onto the original.
    pub blend: BlendWeights,
}

impl PipelineConfig {
    /// Default Gaussian blur kernel size.
    pub const DEFAULT_BLUR_KERNEL: u32 = 5;
    /// Default Canny low threshold.
    pub const DEFAULT_CANNY_LOW: f32 = 50.0;
    /// Default Canny high threshold.
    pub const DEFAULT_CANNY_HIGH: f32 = 150.0;
    /// Default horizontal mask fraction.
    pub const DEFAULT_MASK_X_PCT: f64 = 0.05;
    /// Default vertical mask fraction.
    pub const DEFAULT_MASK_Y_PCT: f64 = 0.60;
    /// Default Hough distance resolution (pixels per bin).
    pub const DEFAULT_HOUGH_RHO: f64 = 2.0;
    /// Default Hough angular resolution (one degree, in radians).
    pub const DEFAULT_HOUGH_THETA: f64 = std::f64::consts::PI / 180.0;
    /// Default Hough vote threshold.
    pub const DEFAULT_HOUGH_MIN_VOTES: u32 = 15;
    /// Default minimum segment length in pixels.
    pub const DEFAULT_HOUGH_MIN_LENGTH: f64 = 20.0;
    /// Default maximum bridged gap in pixels.
    pub const DEFAULT_HOUGH_MAX_GAP: f64 = 30.0;
    /// Smallest accepted Hough distance resolution in pixels per bin.
    /// The accumulator's distance axis holds about
    /// `2 * (width + height) / rho` bins; the floor caps that at ten
    /// bins per pixel of frame perimeter.
    pub const MIN_HOUGH_RHO: f64 = 0.1;
    /// Smallest accepted Hough angular resolution, a twentieth of a
    /// degree. The angle axis and its trig tables hold
    /// `round(pi / theta)` entries; the floor caps that at 3600.
    pub const MIN_HOUGH_THETA: f64 = std::f64::consts::PI / 3600.0;
    /// Default overlay stroke color (red).
    pub const DEFAULT_DRAW_COLOR: [u8; 3] = [255, 0, 0];
    /// Default overlay stroke thickness in pixels.
    pub const DEFAULT_DRAW_THICKNESS: u32 = 2;
    /// Default weight for the original image.
    pub const DEFAULT_BLEND_ALPHA: f64 = 0.8;
    /// Default weight for the rendered overlay.
    pub const DEFAULT_BLEND_BETA: f64 = 1.0;
    /// Default scalar bias.
    pub const DEFAULT_BLEND_GAMMA: f64 = 0.0;

    /// Check every configuration invariant.
    ///
    /// Returns the first violation found. The checks mirror the
    /// per-stage contracts so a configuration that validates here
    /// cannot fail stage-level validation later.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidKernelSize`] for an even or
    /// zero blur kernel, [`PipelineError::InvalidThresholds`] for an
    /// unordered or out-of-range Canny pair, and
    /// [`PipelineError::InvalidConfig`] for any other violation.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.blur_kernel == 0 || self.blur_kernel.is_multiple_of(2) {
            return Err(PipelineError::InvalidKernelSize(self.blur_kernel));
        }
        if !(self.canny_low > 0.0 && self.canny_low < self.canny_high && self.canny_high <= 255.0)
        {
            return Err(PipelineError::InvalidThresholds {
                low: self.canny_low,
                high: self.canny_high,
            });
        }
        if !(self.mask.x_pct > 0.0 && self.mask.x_pct < 0.5) {
            return Err(PipelineError::InvalidConfig(format!(
                "mask x fraction must be in (0, 0.5), got {}",
                self.mask.x_pct,
            )));
        }
        if !(self.mask.y_pct > 0.0 && self.mask.y_pct < 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "mask y fraction must be in (0, 1), got {}",
                self.mask.y_pct,
            )));
        }
        if !(self.hough.rho.is_finite() && self.hough.rho >= Self::MIN_HOUGH_RHO) {
            return Err(PipelineError::InvalidConfig(format!(
                "hough distance resolution must be finite and at least 0.1 pixels per bin, got {}",
                self.hough.rho,
            )));
        }
        if !(self.hough.theta.is_finite() && self.hough.theta >= Self::MIN_HOUGH_THETA) {
            return Err(PipelineError::InvalidConfig(format!(
                "hough angular resolution must be finite and at least pi/3600 radians, got {}",
                self.hough.theta,
            )));
        }
        if self.hough.min_votes == 0 {
            return Err(PipelineError::InvalidConfig(
                "hough vote threshold must be at least 1".to_string(),
            ));
        }
        if self.hough.min_length.is_nan() || self.hough.min_length < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "minimum segment length must be non-negative, got {}",
                self.hough.min_length,
            )));
        }
        if self.hough.max_gap.is_nan() || self.hough.max_gap < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "maximum segment gap must be non-negative, got {}",
                self.hough.max_gap,
            )));
        }
        if self.style.thickness == 0 {
            return Err(PipelineError::InvalidConfig(
                "stroke thickness must be at least 1".to_string(),
            ));
        }
        if !(self.blend.alpha >= 0.0 && self.blend.beta >= 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "blend weights must be non-negative, got alpha={} beta={}",
                self.blend.alpha, self.blend.beta,
            )));
        }
        if !self.blend.gamma.is_finite() {
            return Err(PipelineError::InvalidConfig(format!(
                "blend bias must be finite, got {}",
                self.blend.gamma,
            )));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            blur_kernel: Self::DEFAULT_BLUR_KERNEL,
            canny_low: Self::DEFAULT_CANNY_LOW,
            canny_high: Self::DEFAULT_CANNY_HIGH,
            mask: MaskFractions {
                x_pct: Self::DEFAULT_MASK_X_PCT,
                y_pct: Self::DEFAULT_MASK_Y_PCT,
            },
            hough: HoughParams {
                rho: Self::DEFAULT_HOUGH_RHO,
                theta: Self::DEFAULT_HOUGH_THETA,
                min_votes: Self::DEFAULT_HOUGH_MIN_VOTES,
                min_length: Self::DEFAULT_HOUGH_MIN_LENGTH,
                max_gap: Self::DEFAULT_HOUGH_MAX_GAP,
            },
            style: DrawStyle {
                color: Self::DEFAULT_DRAW_COLOR,
                thickness: Self::DEFAULT_DRAW_THICKNESS,
            },
            blend: BlendWeights {
                alpha: Self::DEFAULT_BLEND_ALPHA,
                beta: Self::DEFAULT_BLEND_BETA,
                gamma: Self::DEFAULT_BLEND_GAMMA,
            },
        }
    }
}

/// Result of running the full lane detection pipeline.
///
/// An empty `segments` vector is a valid outcome (featureless road,
/// heavy occlusion): the composite then shows the original image
/// scaled by the blend weights, with no overlay.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    /// Extracted lane-line segments in discovery order.
    pub segments: Vec<LineSegment>,

    /// The original image with the rendered segments composited on top.
    pub composite: RgbImage,

    /// Dimensions of the source image in pixels.
    pub dimensions: Dimensions,
}

/// Result of running the pipeline with all intermediate stage outputs
/// preserved.
///
/// Each field captures the output of one pipeline stage, for
/// inspection, tuning, and diagnostics. Prefer [`crate::process`]
/// when only the composite and segments are needed; this variant pins
/// several full-resolution rasters in memory at once.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Stage 1: original decoded RGB image.
    pub original: RgbImage,
    /// Stage 2: single-channel luminance image.
    pub grayscale: GrayImage,
    /// Stage 3: Gaussian-blurred image.
    pub blurred: GrayImage,
    /// Stage 4: binary Canny edge map.
    pub edges: GrayImage,
    /// Stage 5: edge map restricted to the lane trapezoid.
    pub masked: GrayImage,
    /// The trapezoid polygon the mask stage applied.
    pub trapezoid: Polygon,
    /// Stage 6: extracted lane-line segments.
    pub segments: Vec<LineSegment>,
    /// Stage 7: segments rendered on a black canvas.
    pub overlay: RgbImage,
    /// Stage 8: weighted composite of original and overlay.
    pub composite: RgbImage,
    /// Source image dimensions in pixels.
    pub dimensions: Dimensions,
}

/// Everything that can go wrong between input bytes and composite.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The bytes did not parse as any supported image format.
    #[error("could not decode the image data: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// Zero bytes of input were supplied.
    #[error("the input byte slice is empty")]
    EmptyInput,

    /// A configuration field failed validation.
    #[error("configuration rejected: {0}")]
    InvalidConfig(String),

    /// Blur kernel size is even or zero.
    #[error("blur kernel size must be a positive odd integer, got {0}")]
    InvalidKernelSize(u32),

    /// Canny thresholds are unordered or out of range.
    #[error("canny thresholds must satisfy 0 < low < high <= 255, got low={low} high={high}")]
    InvalidThresholds {
        /// The offending low threshold.
        low: f32,
        /// The offending high threshold.
        high: f32,
    },

    /// A mask polygon vertex lies outside the image bounds.
    #[error("polygon vertex ({x}, {y}) lies outside the {width}x{height} image")]
    PolygonOutOfBounds {
        /// Horizontal position of the offending vertex.
        x: i32,
        /// Vertical position of the offending vertex.
        y: i32,
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },

    /// Two images that must share dimensions do not.
    #[error(
        "image dimensions mismatch: expected {}x{}, got {}x{}",
        expected.width, expected.height, actual.width, actual.height
    )]
    ShapeMismatch {
        /// Dimensions of the reference image.
        expected: Dimensions,
        /// Dimensions of the mismatched image.
        actual: Dimensions,
    },
}

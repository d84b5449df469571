//! Stage-at-a-time execution of the lane detection pipeline.
//!
//! The one-call entry points ([`crate::process`] and
//! [`crate::process_staged`]) run every stage back to back. [`Pipeline`]
//! instead hands control back after each stage, which is what the
//! diagnostics collector and parameter-tuning callers want: inspect an
//! intermediate raster, time one stage in isolation, or stop early.
//!
//! ```rust
//! # use shasen_pipeline::{Pipeline, PipelineConfig, PipelineError};
//! # fn tune(photo: Vec<u8>) -> Result<(), PipelineError> {
//! let masked = Pipeline::new(photo, PipelineConfig::default())
//!     .decode()?
//!     .to_grayscale()
//!     .blur()?
//!     .detect_edges()?
//!     .mask()?;
//!
//! // How much edge signal survived the road mask?
//! let lit = masked.masked().pixels().filter(|p| p.0[0] != 0).count();
//! println!("{lit} edge pixels inside the trapezoid");
//!
//! let staged = masked.extract_segments().render().composite()?.into_result();
//! assert_eq!(staged.composite.dimensions(), staged.original.dimensions());
//! # Ok(())
//! # }
//! ```
//!
//! Skipping a stage, repeating one, or reading an output that has not
//! been computed yet is a compile error: every advance consumes the
//! current state and returns the next one, and each state only exposes
//! what exists at that point.
//!
//! # Memory
//!
//! A stage keeps every raster computed before it, so [`Composited`]
//! pins the photograph, four grayscale intermediates, the overlay, and
//! the composite at once. At 960x540 that is roughly 7 MB. The cost is
//! deliberate, since [`StagedResult`] hands all of it to the caller.
//! When only the segments and the composite matter, [`crate::process`]
//! returns just those.

use image::DynamicImage;

use crate::types::{
    Dimensions, GrayImage, LineSegment, PipelineConfig, PipelineError, Polygon, RgbImage,
    StagedResult,
};

/// Settings and the decoded photograph, fixed at decode time and
/// carried by every later stage.
struct Context {
    config: PipelineConfig,
    photo: RgbImage,
    size: Dimensions,
}

/// An unstarted pipeline holding source bytes and settings.
///
/// [`Pipeline::new`] does no work. Processing begins with
/// [`decode`](Self::decode) and continues one stage per call:
///
/// ```rust
/// # use shasen_pipeline::{Pipeline, PipelineConfig, PipelineError};
/// # fn detect(bytes: Vec<u8>) -> Result<usize, PipelineError> {
/// let staged = Pipeline::new(bytes, PipelineConfig::default())
///     .decode()?
///     .to_grayscale()
///     .blur()?
///     .detect_edges()?
///     .mask()?
///     .extract_segments()
///     .render()
///     .composite()?
///     .into_result();
/// # Ok(staged.segments.len())
/// # }
/// ```
#[must_use = "a pipeline runs nothing until .decode() starts it"]
pub struct Pipeline {
    bytes: Vec<u8>,
    config: PipelineConfig,
}

impl Pipeline {
    /// Package image bytes and settings into an unstarted pipeline.
    pub const fn new(image_bytes: Vec<u8>, config: PipelineConfig) -> Self {
        Self {
            bytes: image_bytes,
            config,
        }
    }

    /// The undecoded bytes this pipeline was created over.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.bytes
    }

    /// Check the settings, then decode and normalize the photograph.
    ///
    /// # Errors
    ///
    /// Settings problems surface first, as
    /// [`PipelineError::InvalidKernelSize`],
    /// [`PipelineError::InvalidThresholds`], or
    /// [`PipelineError::InvalidConfig`]. After that, empty input is
    /// [`PipelineError::EmptyInput`] and unrecognized or corrupt input
    /// is [`PipelineError::ImageDecode`].
    pub fn decode(self) -> Result<Decoded, PipelineError> {
        self.config.validate()?;
        let image = crate::grayscale::decode(&self.bytes)?;
        let photo = crate::grayscale::to_rgb(&image);
        let size = Dimensions {
            width: photo.width(),
            height: photo.height(),
        };
        Ok(Decoded {
            ctx: Context {
                config: self.config,
                photo,
                size,
            },
            image,
        })
    }
}

/// A decoded photograph, nothing else computed yet.
#[must_use = "dropping a stage discards its work; advance with .to_grayscale()"]
pub struct Decoded {
    ctx: Context,
    image: DynamicImage,
}

impl Decoded {
    /// The photograph, normalized to RGB.
    #[must_use]
    pub const fn original(&self) -> &RgbImage {
        &self.ctx.photo
    }

    /// Width and height of the photograph.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.ctx.size
    }

    /// Reduce the photograph to single-channel luminance. A source
    /// that was grayscale to begin with passes through untouched.
    pub fn to_grayscale(self) -> Grayscaled {
        let passthrough = crate::grayscale::is_single_channel(&self.image);
        let luma = crate::grayscale::to_luma(&self.image);
        Grayscaled {
            ctx: self.ctx,
            luma,
            passthrough,
        }
    }
}

/// Luminance in hand, ready for smoothing.
#[must_use = "dropping a stage discards its work; advance with .blur()"]
pub struct Grayscaled {
    ctx: Context,
    luma: GrayImage,
    passthrough: bool,
}

impl Grayscaled {
    /// The luminance raster.
    #[must_use]
    pub const fn grayscale(&self) -> &GrayImage {
        &self.luma
    }

    /// True when the source was already single-channel.
    #[must_use]
    pub const fn passthrough(&self) -> bool {
        self.passthrough
    }

    /// Smooth the luminance with the configured Gaussian kernel so
    /// sensor grain does not shatter the edge map. Kernel size 1 is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// An even or zero kernel is [`PipelineError::InvalidKernelSize`].
    /// [`Pipeline::decode`] validated the settings already, so a
    /// pipeline that decoded never fails here.
    pub fn blur(self) -> Result<Blurred, PipelineError> {
        let smooth = crate::blur::gaussian_blur(&self.luma, self.ctx.config.blur_kernel)?;
        Ok(Blurred {
            ctx: self.ctx,
            luma: self.luma,
            smooth,
        })
    }
}

/// Smoothed luminance, ready for edge detection.
#[must_use = "dropping a stage discards its work; advance with .detect_edges()"]
pub struct Blurred {
    ctx: Context,
    luma: GrayImage,
    smooth: GrayImage,
}

impl Blurred {
    /// The smoothed luminance raster.
    #[must_use]
    pub const fn blurred(&self) -> &GrayImage {
        &self.smooth
    }

    /// Find edges with Canny hysteresis at the configured thresholds.
    ///
    /// # Errors
    ///
    /// A disordered or out-of-range threshold pair is
    /// [`PipelineError::InvalidThresholds`], already ruled out by
    /// [`Pipeline::decode`] for any pipeline that got this far.
    pub fn detect_edges(self) -> Result<EdgesDetected, PipelineError> {
        let frame_edges = crate::edge::canny(
            &self.smooth,
            self.ctx.config.canny_low,
            self.ctx.config.canny_high,
        )?;
        Ok(EdgesDetected {
            ctx: self.ctx,
            luma: self.luma,
            smooth: self.smooth,
            frame_edges,
        })
    }
}

/// A binary edge map covering the whole frame.
#[must_use = "dropping a stage discards its work; advance with .mask()"]
pub struct EdgesDetected {
    ctx: Context,
    luma: GrayImage,
    smooth: GrayImage,
    frame_edges: GrayImage,
}

impl EdgesDetected {
    /// The full-frame edge map.
    #[must_use]
    pub const fn edges(&self) -> &GrayImage {
        &self.frame_edges
    }

    /// Cut the edge map down to the forward road trapezoid derived
    /// from the configured mask fractions.
    ///
    /// # Errors
    ///
    /// [`PipelineError::PolygonOutOfBounds`] would mean a derived
    /// vertex escaped the frame. The derivation clamps every vertex
    /// into bounds, so seeing this error indicates a bug.
    pub fn mask(self) -> Result<Masked, PipelineError> {
        let trapezoid = crate::region::road_trapezoid(self.ctx.size, self.ctx.config.mask);
        let road_edges = crate::region::mask_region(&self.frame_edges, &trapezoid)?;
        Ok(Masked {
            ctx: self.ctx,
            luma: self.luma,
            smooth: self.smooth,
            frame_edges: self.frame_edges,
            road_edges,
            trapezoid,
        })
    }
}

/// Edges restricted to the road region.
#[must_use = "dropping a stage discards its work; advance with .extract_segments()"]
pub struct Masked {
    ctx: Context,
    luma: GrayImage,
    smooth: GrayImage,
    frame_edges: GrayImage,
    road_edges: GrayImage,
    trapezoid: Polygon,
}

impl Masked {
    /// The edge map with everything outside the trapezoid cleared.
    #[must_use]
    pub const fn masked(&self) -> &GrayImage {
        &self.road_edges
    }

    /// The trapezoid the mask kept.
    #[must_use]
    pub const fn trapezoid(&self) -> &Polygon {
        &self.trapezoid
    }

    /// Pull line segments out of the road edges with the probabilistic
    /// Hough transform. Finding none is an ordinary outcome, not an
    /// error.
    pub fn extract_segments(self) -> SegmentsExtracted {
        let segments = crate::hough::detect_segments(&self.road_edges, &self.ctx.config.hough);
        SegmentsExtracted {
            ctx: self.ctx,
            luma: self.luma,
            smooth: self.smooth,
            frame_edges: self.frame_edges,
            road_edges: self.road_edges,
            trapezoid: self.trapezoid,
            segments,
        }
    }
}

/// Lane-line candidates, not yet drawn.
#[must_use = "dropping a stage discards its work; advance with .render()"]
pub struct SegmentsExtracted {
    ctx: Context,
    luma: GrayImage,
    smooth: GrayImage,
    frame_edges: GrayImage,
    road_edges: GrayImage,
    trapezoid: Polygon,
    segments: Vec<LineSegment>,
}

impl SegmentsExtracted {
    /// Every segment the transform kept, in discovery order.
    #[must_use]
    pub fn segments(&self) -> &[LineSegment] {
        &self.segments
    }

    /// Stroke the segments onto a black canvas the size of the
    /// photograph. With no segments the canvas stays black.
    pub fn render(self) -> Rendered {
        let overlay =
            crate::draw::render_segments(&self.segments, self.ctx.size, self.ctx.config.style);
        Rendered {
            ctx: self.ctx,
            luma: self.luma,
            smooth: self.smooth,
            frame_edges: self.frame_edges,
            road_edges: self.road_edges,
            trapezoid: self.trapezoid,
            segments: self.segments,
            overlay,
        }
    }
}

/// The segment overlay, stroked but not yet blended.
#[must_use = "dropping a stage discards its work; advance with .composite()"]
pub struct Rendered {
    ctx: Context,
    luma: GrayImage,
    smooth: GrayImage,
    frame_edges: GrayImage,
    road_edges: GrayImage,
    trapezoid: Polygon,
    segments: Vec<LineSegment>,
    overlay: RgbImage,
}

impl Rendered {
    /// The stroked overlay on its black canvas.
    #[must_use]
    pub const fn overlay(&self) -> &RgbImage {
        &self.overlay
    }

    /// Blend the overlay over the photograph with the configured
    /// weights.
    ///
    /// # Errors
    ///
    /// [`PipelineError::ShapeMismatch`] would mean the overlay came
    /// out a different size than the photograph, which the render
    /// stage rules out.
    pub fn composite(self) -> Result<Composited, PipelineError> {
        let composite =
            crate::blend::blend_weighted(&self.ctx.photo, &self.overlay, self.ctx.config.blend)?;
        Ok(Composited {
            ctx: self.ctx,
            luma: self.luma,
            smooth: self.smooth,
            frame_edges: self.frame_edges,
            road_edges: self.road_edges,
            trapezoid: self.trapezoid,
            segments: self.segments,
            overlay: self.overlay,
            composite,
        })
    }
}

/// Everything computed; only unpacking remains.
///
/// The [module-level memory notes](self#memory) describe the cost of
/// holding every intermediate at this point.
#[must_use = "call .into_result() to take the StagedResult"]
pub struct Composited {
    ctx: Context,
    luma: GrayImage,
    smooth: GrayImage,
    frame_edges: GrayImage,
    road_edges: GrayImage,
    trapezoid: Polygon,
    segments: Vec<LineSegment>,
    overlay: RgbImage,
    composite: RgbImage,
}

impl Composited {
    /// The blended result.
    #[must_use]
    pub const fn composite(&self) -> &RgbImage {
        &self.composite
    }

    /// The segments that were stroked into the overlay.
    #[must_use]
    pub fn segments(&self) -> &[LineSegment] {
        &self.segments
    }

    /// Width and height shared by every raster in the result.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.ctx.size
    }

    /// Unpack every intermediate into a [`StagedResult`].
    #[must_use]
    pub fn into_result(self) -> StagedResult {
        StagedResult {
            original: self.ctx.photo,
            grayscale: self.luma,
            blurred: self.smooth,
            edges: self.frame_edges,
            masked: self.road_edges,
            trapezoid: self.trapezoid,
            segments: self.segments,
            overlay: self.overlay,
            composite: self.composite,
            dimensions: self.ctx.size,
        }
    }
}

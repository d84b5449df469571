//! Per-stage timing and counts for a pipeline run.
//!
//! The numbers exist for parameter tuning. When a photograph yields
//! too few segments, the mask and extraction rows show whether the
//! edges were thresholded away, masked away, or never voted past the
//! Hough threshold; when it yields too many, the edge density row
//! usually points at the blur kernel.
//! [`process_with_diagnostics`](crate::process_with_diagnostics)
//! collects one [`PipelineDiagnostics`] per run.
//!
//! `std::time::Duration` has no serde support, so timings cross the
//! JSON boundary as fractional seconds.

use std::fmt::Write as _;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::LineSegment;

/// `Duration` as fractional seconds, for JSON-friendly timings.
mod secs_f64 {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        Duration::try_from_secs_f64(f64::deserialize(de)?).map_err(serde::de::Error::custom)
    }
}

/// Everything measured across one run of the pipeline.
///
/// Every stage always runs, so no field is optional: a grayscale
/// passthrough or an empty segment set still produces a timed row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Byte decoding.
    pub decode: TimedStage,
    /// Luminance conversion.
    pub grayscale: TimedStage,
    /// Gaussian blur.
    pub blur: TimedStage,
    /// Canny edge detection.
    pub edge_detection: TimedStage,
    /// Trapezoid region masking.
    pub mask: TimedStage,
    /// Hough segment extraction.
    pub extraction: TimedStage,
    /// Overlay rendering.
    pub render: TimedStage,
    /// Weighted compositing.
    pub composite: TimedStage,
    /// Whole-run wall time.
    #[serde(with = "secs_f64")]
    pub total: Duration,
    /// Headline numbers for the run.
    pub summary: PipelineSummary,
}

/// One stage's wall time plus whatever that stage counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedStage {
    /// Wall time spent in the stage.
    #[serde(with = "secs_f64")]
    pub elapsed: Duration,
    /// Stage-specific numbers.
    pub details: StageMetrics,
}

/// What each stage has to say about its own work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Byte decoding.
    Decode {
        /// Length of the encoded input.
        bytes_in: usize,
        /// Decoded width in pixels.
        width: u32,
        /// Decoded height in pixels.
        height: u32,
    },
    /// Luminance conversion.
    Grayscale {
        /// True when the input was already single-channel.
        passthrough: bool,
    },
    /// Gaussian blur.
    Blur {
        /// Odd kernel size in pixels.
        kernel_size: u32,
        /// Standard deviation derived from the kernel.
        sigma: f32,
    },
    /// Canny edge detection.
    EdgeDetection {
        /// Low hysteresis threshold.
        low: f32,
        /// High hysteresis threshold.
        high: f32,
        /// Nonzero pixels in the edge map.
        edge_pixels: u64,
        /// Pixels in the whole image, for density.
        image_pixels: u64,
    },
    /// Region masking.
    Mask {
        /// Vertices in the mask polygon.
        vertices: usize,
        /// Edge pixels entering the mask.
        edges_before: u64,
        /// Edge pixels surviving it.
        edges_after: u64,
    },
    /// Segment extraction.
    Extraction {
        /// Segments the Hough transform kept.
        segments: usize,
        /// Shortest kept segment in pixels, 0 when none.
        shortest_px: f64,
        /// Longest kept segment in pixels, 0 when none.
        longest_px: f64,
        /// Mean kept length in pixels, 0 when none.
        mean_px: f64,
    },
    /// Overlay rendering.
    Render {
        /// Segments stroked onto the overlay.
        segments: usize,
        /// Stroke thickness in pixels.
        thickness_px: u32,
    },
    /// Weighted compositing.
    Composite {
        /// Weight on the photograph.
        alpha: f64,
        /// Weight on the overlay.
        beta: f64,
        /// Additive bias.
        gamma: f64,
    },
}

/// Headline numbers for a whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Photograph width in pixels.
    pub width: u32,
    /// Photograph height in pixels.
    pub height: u32,
    /// Edge pixels surviving the region mask.
    pub masked_edge_pixels: u64,
    /// Segments in the final output.
    pub segments: usize,
}

impl PipelineDiagnostics {
    /// Stage rows in execution order, labeled for the report.
    fn rows(&self) -> [(&'static str, &TimedStage); 8] {
        [
            ("decode", &self.decode),
            ("grayscale", &self.grayscale),
            ("blur", &self.blur),
            ("edges", &self.edge_detection),
            ("mask", &self.mask),
            ("hough", &self.extraction),
            ("render", &self.render),
            ("composite", &self.composite),
        ]
    }

    /// Render the diagnostics as a plain-text table.
    #[must_use]
    pub fn report(&self) -> String {
        let total_ms = ms(self.total);
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{}x{} photograph, {} segment(s), {total_ms:.3}ms total",
            self.summary.width, self.summary.height, self.summary.segments,
        );
        let _ = writeln!(out, "{:<10} {:>11} {:>6}  detail", "stage", "time", "share");
        let _ = writeln!(out, "{}", "-".repeat(64));

        for (label, stage) in self.rows() {
            let stage_ms = ms(stage.elapsed);
            let share = if total_ms > 0.0 {
                stage_ms / total_ms * 100.0
            } else {
                0.0
            };
            let _ = writeln!(
                out,
                "{label:<10} {stage_ms:>9.3}ms {share:>5.1}%  {}",
                stage.details.describe(),
            );
        }

        let _ = write!(
            out,
            "\nmasked edge pixels {} | segments kept {}",
            self.summary.masked_edge_pixels, self.summary.segments,
        );
        out
    }
}

impl StageMetrics {
    /// One-line description for the report's detail column.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Decode {
                bytes_in,
                width,
                height,
            } => format!("{width}x{height} from {bytes_in} input bytes"),
            Self::Grayscale { passthrough } => {
                if *passthrough {
                    "passthrough (already single-channel)".to_string()
                } else {
                    "rgb -> luma".to_string()
                }
            }
            Self::Blur { kernel_size, sigma } => {
                format!("k={kernel_size}, sigma {sigma:.2}")
            }
            Self::EdgeDetection {
                low,
                high,
                edge_pixels,
                image_pixels,
            } => {
                #[allow(clippy::cast_precision_loss)]
                let density = if *image_pixels > 0 {
                    *edge_pixels as f64 / *image_pixels as f64 * 100.0
                } else {
                    0.0
                };
                format!("thresholds {low:.0}/{high:.0}, {edge_pixels} edge px ({density:.1}%)")
            }
            Self::Mask {
                vertices,
                edges_before,
                edges_after,
            } => format!("{vertices}-gon kept {edges_after} of {edges_before} edge px"),
            Self::Extraction {
                segments,
                shortest_px,
                longest_px,
                mean_px,
            } => format!(
                "{segments} segments, len {shortest_px:.1}..{longest_px:.1} px (mean {mean_px:.1})",
            ),
            Self::Render {
                segments,
                thickness_px,
            } => format!("{segments} strokes at {thickness_px} px"),
            Self::Composite { alpha, beta, gamma } => {
                format!("{alpha:.2}*photo + {beta:.2}*overlay + {gamma:.2}")
            }
        }
    }
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Count the nonzero pixels of a grayscale image.
pub(crate) fn count_edge_pixels(image: &image::GrayImage) -> u64 {
    image
        .pixels()
        .fold(0u64, |acc, p| acc + u64::from(p.0[0] != 0))
}

/// Length statistics over a set of segments.
pub(crate) struct SegmentStats {
    /// Shortest length in pixels.
    pub shortest: f64,
    /// Longest length in pixels.
    pub longest: f64,
    /// Mean length in pixels.
    pub mean: f64,
}

/// Single pass over `segments`; all zeros for an empty slice.
pub(crate) fn segment_stats(segments: &[LineSegment]) -> SegmentStats {
    if segments.is_empty() {
        return SegmentStats {
            shortest: 0.0,
            longest: 0.0,
            mean: 0.0,
        };
    }
    let (shortest, longest, total) = segments.iter().fold(
        (f64::INFINITY, 0.0_f64, 0.0_f64),
        |(lo, hi, sum), segment| {
            let len = segment.length();
            (lo.min(len), hi.max(len), sum + len)
        },
    );
    #[allow(clippy::cast_precision_loss)]
    SegmentStats {
        shortest,
        longest,
        mean: total / segments.len() as f64,
    }
}

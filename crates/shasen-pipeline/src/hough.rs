//! Line-segment extraction via the progressive probabilistic Hough
//! transform.
//!
//! Every edge pixel votes for each candidate orientation in a
//! rho-theta accumulator. As soon as one orientation gathers enough
//! votes, the supporting pixels are walked in both directions from the
//! seed pixel, removed from the voting pool, and emitted as a segment
//! when the walk spans at least the minimum length. Votes cast by
//! consumed pixels are retracted so they cannot seed a second line.
//!
//! The classic formulation visits edge pixels in random order. Pixels
//! are visited in row-major scan order here instead, so the same edge
//! map always produces the same segments in the same order. The
//! parameters carry the same meaning as in OpenCV's `HoughLinesP`, so
//! tuned values translate directly.

use image::GrayImage;

use crate::types::{HoughParams, LineSegment};

/// Extract line segments from a binary edge map.
///
/// Any nonzero pixel counts as an edge pixel. Parameters are assumed
/// to come from a validated [`PipelineConfig`](crate::types::PipelineConfig);
/// see [`HoughParams`] for their meaning. Segments are returned in
/// discovery order. An empty result is a normal outcome for a
/// featureless input, not an error.
#[must_use = "returns the extracted line segments"]
pub fn detect_segments(edges: &GrayImage, params: &HoughParams) -> Vec<LineSegment> {
    if edges.width() == 0 || edges.height() == 0 {
        return Vec::new();
    }
    let segments = Detector::new(edges, params).run();
    tracing::debug!("{} segments extracted", segments.len());
    segments
}

/// Working state for one extraction run: the vote accumulator, the
/// trig tables, and the mask of edge pixels not yet claimed by a
/// segment.
struct Detector<'a> {
    params: &'a HoughParams,
    width: i32,
    height: i32,
    numrho: i64,
    center: i64,
    tab_cos: Vec<f64>,
    tab_sin: Vec<f64>,
    mask: Vec<u8>,
    accum: Vec<i32>,
    points: Vec<(i32, i32)>,
}

impl<'a> Detector<'a> {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss
    )]
    fn new(edges: &GrayImage, params: &'a HoughParams) -> Self {
        let numangle = ((std::f64::consts::PI / params.theta).round() as u32).max(1);
        let span = (f64::from(edges.width()) + f64::from(edges.height())).mul_add(2.0, 1.0);
        let numrho = ((span / params.rho).round() as i64).max(1);

        // Scaling by 1/rho makes the vote formula land directly in bin units.
        let scale = 1.0 / params.rho;
        let (tab_cos, tab_sin): (Vec<f64>, Vec<f64>) = (0..numangle)
            .map(|n| {
                let angle = params.theta * f64::from(n);
                (angle.cos() * scale, angle.sin() * scale)
            })
            .unzip();

        let row = edges.width() as usize;
        let mut mask = vec![0u8; row * edges.height() as usize];
        let mut points = Vec::new();
        for (x, y, pixel) in edges.enumerate_pixels() {
            if pixel.0[0] != 0 {
                mask[y as usize * row + x as usize] = 1;
                points.push((x as i32, y as i32));
            }
        }

        Self {
            params,
            width: edges.width() as i32,
            height: edges.height() as i32,
            numrho,
            center: (numrho - 1) / 2,
            accum: vec![0_i32; numangle as usize * numrho as usize],
            tab_cos,
            tab_sin,
            mask,
            points,
        }
    }

    fn run(&mut self) -> Vec<LineSegment> {
        let threshold = i32::try_from(self.params.min_votes).unwrap_or(i32::MAX);
        let mut segments = Vec::new();

        let points = std::mem::take(&mut self.points);
        for (sx, sy) in points {
            // Pixels already claimed by an earlier segment no longer vote.
            let Some(slot) = self.slot(sx, sy) else {
                continue;
            };
            if self.mask[slot] == 0 {
                continue;
            }

            let (max_votes, max_n) = self.vote(sx, sy);
            if max_votes < threshold {
                continue;
            }

            let step = self.direction(max_n);
            let back = (-step.0, -step.1);
            let end_a = self.trace_end((sx, sy), step);
            let end_b = self.trace_end((sx, sy), back);

            let candidate = LineSegment::new(end_a.0, end_a.1, end_b.0, end_b.1);
            let good = candidate.length() >= self.params.min_length;
            self.consume((sx, sy), step, end_a, good);
            self.consume((sx, sy), back, end_b, good);
            if good {
                segments.push(candidate);
            }
        }
        segments
    }

    /// Cast one vote per orientation for the pixel and report the best
    /// supported bin. Ties resolve to the lowest angle index.
    fn vote(&mut self, px: i32, py: i32) -> (i32, usize) {
        let mut max_votes = i32::MIN;
        let mut max_n = 0;
        for n in 0..self.tab_cos.len() {
            let index = self.accum_index(n, self.rho_bin(px, py, n));
            self.accum[index] += 1;
            if self.accum[index] > max_votes {
                max_votes = self.accum[index];
                max_n = n;
            }
        }
        (max_votes, max_n)
    }

    fn retract_votes(&mut self, px: i32, py: i32) {
        for n in 0..self.tab_cos.len() {
            let index = self.accum_index(n, self.rho_bin(px, py, n));
            // May go negative for pixels that never voted; harmless.
            self.accum[index] -= 1;
        }
    }

    /// Unit step along the line of orientation `n`, scaled so the
    /// dominant axis advances exactly one pixel per step.
    fn direction(&self, n: usize) -> (f64, f64) {
        let a = -self.tab_sin[n];
        let b = self.tab_cos[n];
        // sin and cos cannot both vanish, so the divisor is nonzero.
        if a.abs() > b.abs() {
            (a.signum(), b / a.abs())
        } else {
            (a / b.abs(), b.signum())
        }
    }

    /// March from the seed pixel, returning the last edge pixel seen
    /// before the border or a run of misses longer than `max_gap`
    /// ended the walk.
    fn trace_end(&self, seed: (i32, i32), step: (f64, f64)) -> (i32, i32) {
        let mut x = f64::from(seed.0);
        let mut y = f64::from(seed.1);
        let mut gap = 0_u32;
        let mut end = seed;
        loop {
            let (px, py) = nearest_pixel(x, y);
            let Some(slot) = self.slot(px, py) else {
                break;
            };
            if self.mask[slot] != 0 {
                gap = 0;
                end = (px, py);
            } else {
                gap += 1;
                if f64::from(gap) > self.params.max_gap {
                    break;
                }
            }
            x += step.0;
            y += step.1;
        }
        end
    }

    /// Re-march from the seed to `end`, clearing every edge pixel on
    /// the way. For an accepted segment the votes those pixels cast
    /// are retracted as well.
    fn consume(&mut self, seed: (i32, i32), step: (f64, f64), end: (i32, i32), accepted: bool) {
        let mut x = f64::from(seed.0);
        let mut y = f64::from(seed.1);
        loop {
            let (px, py) = nearest_pixel(x, y);
            let Some(slot) = self.slot(px, py) else {
                break;
            };
            if self.mask[slot] != 0 {
                self.mask[slot] = 0;
                if accepted {
                    self.retract_votes(px, py);
                }
            }
            if (px, py) == end {
                break;
            }
            x += step.0;
            y += step.1;
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn rho_bin(&self, px: i32, py: i32, n: usize) -> usize {
        let r = f64::from(px)
            .mul_add(self.tab_cos[n], f64::from(py) * self.tab_sin[n])
            .round() as i64;
        (r + self.center).clamp(0, self.numrho - 1) as usize
    }

    #[allow(clippy::cast_sign_loss)]
    fn accum_index(&self, n: usize, bin: usize) -> usize {
        n * self.numrho as usize + bin
    }

    #[allow(clippy::cast_sign_loss)]
    fn slot(&self, px: i32, py: i32) -> Option<usize> {
        if px < 0 || px >= self.width || py < 0 || py >= self.height {
            return None;
        }
        Some(py as usize * self.width as usize + px as usize)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn nearest_pixel(x: f64, y: f64) -> (i32, i32) {
    (x.round() as i32, y.round() as i32)
}

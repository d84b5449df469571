//! Fixed-cell montage grid for the display sink.
//!
//! A [`GridLayout`] assigns incoming images to cells in row-major fill
//! order, applying the configured [`OverflowPolicy`] once the grid is
//! full. A [`Montage`] owns the canvas and resizes each composite into
//! its cell.

use image::imageops::{self, FilterType};
use shasen_pipeline::RgbImage;

/// What [`GridLayout::place`] does once every configured cell is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Reject further images with [`GridFullError`].
    Error,
    /// Start over at the first cell, overwriting earlier images.
    Wrap,
    /// Append extra rows below the configured grid.
    Grow,
}

/// A full montage grid refused another image.
#[derive(Debug, thiserror::Error)]
#[error("montage grid is full ({capacity} cells)")]
pub struct GridFullError {
    /// Total number of cells in the configured grid.
    pub capacity: usize,
}

/// Assigns images to montage cells in row-major fill order.
#[derive(Debug)]
pub struct GridLayout {
    rows: u32,
    cols: u32,
    policy: OverflowPolicy,
    placed: usize,
}

impl GridLayout {
    /// Create a layout for a `rows` x `cols` grid.
    ///
    /// Zero rows or columns are treated as 1.
    #[must_use]
    pub const fn new(rows: u32, cols: u32, policy: OverflowPolicy) -> Self {
        Self {
            rows: if rows == 0 { 1 } else { rows },
            cols: if cols == 0 { 1 } else { cols },
            policy,
            placed: 0,
        }
    }

    /// Total number of cells in the configured grid.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Claim the next cell, returning its `(row, col)`.
    ///
    /// # Errors
    ///
    /// Returns [`GridFullError`] under [`OverflowPolicy::Error`] once
    /// every cell is taken. The other policies never fail.
    #[allow(clippy::cast_possible_truncation)]
    pub fn place(&mut self) -> Result<(u32, u32), GridFullError> {
        let capacity = self.capacity();
        let index = match self.policy {
            OverflowPolicy::Error if self.placed >= capacity => {
                return Err(GridFullError { capacity });
            }
            OverflowPolicy::Wrap => self.placed % capacity,
            OverflowPolicy::Error | OverflowPolicy::Grow => self.placed,
        };
        self.placed += 1;
        let row = (index / self.cols as usize) as u32;
        let col = (index % self.cols as usize) as u32;
        Ok((row, col))
    }
}

/// Accumulates resized composites into a single canvas.
///
/// Unused cells stay black, matching the pipeline's own overlay
/// background.
#[derive(Debug)]
pub struct Montage {
    cell_width: u32,
    cell_height: u32,
    canvas: RgbImage,
}

impl Montage {
    /// Create a black canvas sized for a `rows` x `cols` grid of
    /// `cell_width` x `cell_height` cells.
    #[must_use]
    pub fn new(rows: u32, cols: u32, cell_width: u32, cell_height: u32) -> Self {
        Self {
            cell_width,
            cell_height,
            canvas: RgbImage::new(cols * cell_width, rows * cell_height),
        }
    }

    /// Resize `image` into the cell at `(row, col)`.
    ///
    /// Rows below the current bottom edge grow the canvas first, so
    /// placements handed out by [`OverflowPolicy::Grow`] always fit.
    pub fn place(&mut self, row: u32, col: u32, image: &RgbImage) {
        self.ensure_rows(row + 1);
        let resized =
            imageops::resize(image, self.cell_width, self.cell_height, FilterType::Triangle);
        imageops::replace(
            &mut self.canvas,
            &resized,
            i64::from(col * self.cell_width),
            i64::from(row * self.cell_height),
        );
    }

    fn ensure_rows(&mut self, rows: u32) {
        let needed = rows * self.cell_height;
        if needed <= self.canvas.height() {
            return;
        }
        let mut grown = RgbImage::new(self.canvas.width(), needed);
        imageops::replace(&mut grown, &self.canvas, 0, 0);
        self.canvas = grown;
    }

    /// Consume the montage and return the finished canvas.
    #[must_use]
    pub fn into_image(self) -> RgbImage {
        self.canvas
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn fill_order_is_row_major() {
        let mut layout = GridLayout::new(2, 3, OverflowPolicy::Error);
        let cells: Vec<(u32, u32)> = (0..6).map(|_| layout.place().unwrap()).collect();
        assert_eq!(
            cells,
            vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)],
        );
    }

    #[test]
    fn error_policy_rejects_when_full() {
        let mut layout = GridLayout::new(1, 2, OverflowPolicy::Error);
        assert_eq!(layout.place().unwrap(), (0, 0));
        assert_eq!(layout.place().unwrap(), (0, 1));
        let err = layout.place().unwrap_err();
        assert_eq!(err.capacity, 2);
    }

    #[test]
    fn wrap_policy_reuses_cells() {
        let mut layout = GridLayout::new(1, 2, OverflowPolicy::Wrap);
        assert_eq!(layout.place().unwrap(), (0, 0));
        assert_eq!(layout.place().unwrap(), (0, 1));
        assert_eq!(layout.place().unwrap(), (0, 0));
    }

    #[test]
    fn grow_policy_appends_rows() {
        let mut layout = GridLayout::new(2, 3, OverflowPolicy::Grow);
        for _ in 0..6 {
            layout.place().unwrap();
        }
        assert_eq!(layout.place().unwrap(), (2, 0));
        assert_eq!(layout.place().unwrap(), (2, 1));
    }

    #[test]
    fn zero_dimensions_are_clamped() {
        let mut layout = GridLayout::new(0, 0, OverflowPolicy::Error);
        assert_eq!(layout.capacity(), 1);
        assert_eq!(layout.place().unwrap(), (0, 0));
    }

    #[test]
    fn montage_places_cells() {
        let mut montage = Montage::new(2, 2, 10, 10);
        let red = RgbImage::from_pixel(40, 40, image::Rgb([200, 0, 0]));
        let blue = RgbImage::from_pixel(40, 40, image::Rgb([0, 0, 200]));
        montage.place(0, 0, &red);
        montage.place(1, 1, &blue);
        let canvas = montage.into_image();
        assert_eq!(canvas.dimensions(), (20, 20));
        assert_eq!(canvas.get_pixel(5, 5).0, [200, 0, 0]);
        assert_eq!(canvas.get_pixel(15, 15).0, [0, 0, 200]);
        // Unfilled cell stays black.
        assert_eq!(canvas.get_pixel(15, 5).0, [0, 0, 0]);
    }

    #[test]
    fn montage_grows_for_rows_below_the_grid() {
        let mut montage = Montage::new(1, 2, 10, 10);
        let gray = RgbImage::from_pixel(10, 10, image::Rgb([128, 128, 128]));
        montage.place(0, 0, &gray);
        montage.place(2, 1, &gray);
        let canvas = montage.into_image();
        assert_eq!(canvas.dimensions(), (20, 30));
        assert_eq!(canvas.get_pixel(15, 25).0, [128, 128, 128]);
        // The original content survives the growth.
        assert_eq!(canvas.get_pixel(5, 5).0, [128, 128, 128]);
    }
}

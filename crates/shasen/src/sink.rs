//! Output sinks: where annotated composites go after processing.
//!
//! The batch runner hands every composite to one sink. [`Files`] mode
//! writes an annotated copy per photograph; [`Display`] mode collects
//! the composites into a montage written once at the end of the run.
//!
//! [`Files`]: OutputSink::Files
//! [`Display`]: OutputSink::Display

use std::path::{Path, PathBuf};

use shasen_pipeline::RgbImage;

use crate::grid::{GridFullError, GridLayout, Montage};

/// Failure modes when delivering or flushing sink output.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The output directory could not be created.
    #[error("output i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding or writing an output image failed.
    #[error("image write error: {0}")]
    Write(#[from] image::ImageError),

    /// The montage grid refused another image.
    #[error(transparent)]
    GridFull(#[from] GridFullError),
}

/// Destination for processed composites.
pub enum OutputSink {
    /// One annotated copy per photograph, named by appending the
    /// marker to the source file stem.
    Files {
        /// Target directory; `None` writes next to each source.
        out_dir: Option<PathBuf>,
        /// Marker appended to output file stems.
        marker: String,
    },
    /// A single montage image collecting every composite.
    Display {
        /// Cell assignment in fill order.
        layout: GridLayout,
        /// The canvas under construction.
        montage: Montage,
        /// Where the finished montage is written.
        preview_path: PathBuf,
    },
}

impl OutputSink {
    /// Create a per-file sink, creating `out_dir` if requested.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Io`] when `out_dir` cannot be created.
    pub fn files(out_dir: Option<PathBuf>, marker: String) -> Result<Self, SinkError> {
        if let Some(ref dir) = out_dir {
            std::fs::create_dir_all(dir)?;
        }
        Ok(Self::Files { out_dir, marker })
    }

    /// Create a montage sink that writes to `preview_path` on
    /// [`finish`](Self::finish).
    #[must_use]
    pub const fn display(layout: GridLayout, montage: Montage, preview_path: PathBuf) -> Self {
        Self::Display {
            layout,
            montage,
            preview_path,
        }
    }

    /// Deliver one composite produced from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Write`] when an annotated copy cannot be
    /// encoded and [`SinkError::GridFull`] when the montage rejects
    /// the image.
    pub fn deliver(&mut self, source: &Path, composite: &RgbImage) -> Result<(), SinkError> {
        match self {
            Self::Files { out_dir, marker } => {
                let target = annotated_path(source, out_dir.as_deref(), marker);
                composite.save(&target)?;
                tracing::info!(output = %target.display(), "wrote annotated image");
                Ok(())
            }
            Self::Display {
                layout, montage, ..
            } => {
                let (row, col) = layout.place()?;
                montage.place(row, col, composite);
                tracing::debug!(row, col, source = %source.display(), "placed in montage");
                Ok(())
            }
        }
    }

    /// Flush any output held until the end of the batch.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Write`] when the montage cannot be encoded
    /// to the preview path.
    pub fn finish(self) -> Result<(), SinkError> {
        match self {
            Self::Files { .. } => Ok(()),
            Self::Display {
                montage,
                preview_path,
                ..
            } => {
                montage.into_image().save(&preview_path)?;
                tracing::info!(output = %preview_path.display(), "wrote montage preview");
                Ok(())
            }
        }
    }
}

/// Output path for `source`: same directory (or `out_dir`) with the
/// marker appended to the stem.
///
/// The extension is preserved except for WebP; the image crate decodes
/// WebP but does not encode it, so those composites are written as PNG.
fn annotated_path(source: &Path, out_dir: Option<&Path>, marker: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map_or_else(|| "image".into(), |s| s.to_string_lossy());
    let extension = source
        .extension()
        .map_or_else(|| "png".into(), |e| e.to_string_lossy());
    let extension = if extension.eq_ignore_ascii_case("webp") {
        "png".into()
    } else {
        extension
    };
    let file_name = format!("{stem}_{marker}.{extension}");
    match out_dir {
        Some(dir) => dir.join(file_name),
        None => source.with_file_name(file_name),
    }
}

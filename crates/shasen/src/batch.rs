//! Batch runner: enumerate a directory of photographs, run the lane
//! detection pipeline on each, and hand the composites to an output
//! sink.
//!
//! Enumeration is sorted so montage cells and log output are stable
//! across runs. A failure on one image is logged and counted without
//! aborting the rest of the batch.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use shasen_pipeline::{PipelineConfig, PipelineDiagnostics, PipelineError, ProcessResult};

use crate::sink::{OutputSink, SinkError};

/// Extensions recognized as processable photographs.
const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

/// Per-image diagnostics output selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    /// No per-image diagnostics.
    Quiet,
    /// Human-readable report per image on stdout.
    Text,
    /// One JSON document per image on stdout.
    Json,
}

/// Counts for one batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    /// Images processed and delivered to the sink.
    pub processed: usize,
    /// Images that failed to read, decode, or process.
    pub failed: usize,
    /// Prior outputs skipped via the marker convention.
    pub skipped: usize,
}

/// Why a single image did not make it through the batch.
#[derive(Debug, thiserror::Error)]
enum ImageFailure {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error("diagnostics serialization failed: {0}")]
    Report(#[from] serde_json::Error),
}

/// Per-image JSON report for [`ReportMode::Json`].
#[derive(Serialize)]
struct ImageReport<'a> {
    source: String,
    diagnostics: &'a PipelineDiagnostics,
}

/// Process every photograph in `input_dir` in sorted order.
///
/// Files whose stem already ends in `_<marker>` are prior outputs and
/// are skipped, so re-running over the same directory never processes
/// its own results. Non-image files are ignored.
///
/// # Errors
///
/// Returns an [`io::Error`] only when the directory itself cannot be
/// read; per-image failures are logged and counted in the summary.
pub fn run(
    input_dir: &Path,
    config: &PipelineConfig,
    marker: &str,
    report_mode: ReportMode,
    sink: &mut OutputSink,
) -> io::Result<BatchSummary> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(input_dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_image_extension(path))
        .collect();
    entries.sort();

    let mut summary = BatchSummary::default();
    for path in entries {
        let stem = path.file_stem().map(|s| s.to_string_lossy());
        if let Some(ref stem) = stem
            && is_prior_output(stem, marker)
        {
            tracing::debug!(path = %path.display(), "skipping prior output");
            summary.skipped += 1;
            continue;
        }

        match process_one(&path, config, report_mode, sink) {
            Ok(()) => summary.processed += 1,
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "failed to process image");
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}

fn process_one(
    path: &Path,
    config: &PipelineConfig,
    report_mode: ReportMode,
    sink: &mut OutputSink,
) -> Result<(), ImageFailure> {
    let bytes = std::fs::read(path)?;
    let result = match report_mode {
        ReportMode::Quiet => shasen_pipeline::process(&bytes, config)?,
        ReportMode::Text => {
            let (result, diagnostics) = shasen_pipeline::process_with_diagnostics(&bytes, config)?;
            println!("{}", diagnostics.report());
            result
        }
        ReportMode::Json => {
            let (result, diagnostics) = shasen_pipeline::process_with_diagnostics(&bytes, config)?;
            let report = ImageReport {
                source: path.display().to_string(),
                diagnostics: &diagnostics,
            };
            println!("{}", serde_json::to_string(&report)?);
            result
        }
    };
    log_result(path, &result);
    sink.deliver(path, &result.composite)?;
    Ok(())
}

fn log_result(path: &Path, result: &ProcessResult) {
    tracing::info!(
        path = %path.display(),
        segments = result.segments.len(),
        width = result.dimensions.width,
        height = result.dimensions.height,
        "processed image",
    );
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Whether a file stem carries the output marker suffix `_<marker>`.
fn is_prior_output(stem: &str, marker: &str) -> bool {
    stem.strip_suffix(marker)
        .and_then(|rest| rest.strip_suffix('_'))
        .is_some()
}

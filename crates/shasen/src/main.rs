//! shasen: batch lane detection for road photographs.
//!
//! Scans a directory of photographs, runs the lane detection pipeline
//! on each, and writes annotated copies next to the sources (or into
//! `--out-dir`). With `--preview` the composites are collected into a
//! single montage image instead.
//!
//! # Usage
//!
//! ```text
//! shasen [OPTIONS] <INPUT_DIR>
//! ```
//!
//! Per-image diagnostics are available with `--stats` (human-readable)
//! or `--json` (one JSON document per image on stdout).

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod batch;
mod grid;
mod sink;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use shasen_pipeline::{BlendWeights, DrawStyle, HoughParams, MaskFractions, PipelineConfig};

use crate::batch::ReportMode;
use crate::grid::{GridLayout, Montage, OverflowPolicy};
use crate::sink::OutputSink;

/// Batch lane detection for road photographs.
///
/// Processes every image in the input directory and writes annotated
/// copies with the marker appended to the file stem, or a single
/// montage preview when `--preview` is given.
#[derive(Parser)]
#[command(name = "shasen", version)]
struct Cli {
    /// Directory containing the photographs to process.
    input_dir: PathBuf,

    /// Gaussian blur kernel size (positive odd integer).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_BLUR_KERNEL)]
    blur_kernel: u32,

    /// Canny low threshold.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_CANNY_LOW)]
    canny_low: f32,

    /// Canny high threshold.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_CANNY_HIGH)]
    canny_high: f32,

    /// Bottom-corner inset of the road trapezoid (fraction of width).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_MASK_X_PCT)]
    mask_x_pct: f64,

    /// Top edge of the road trapezoid (fraction of height).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_MASK_Y_PCT)]
    mask_y_pct: f64,

    /// Hough distance resolution in pixels per bin.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_HOUGH_RHO)]
    rho: f64,

    /// Hough angular resolution in radians per bin.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_HOUGH_THETA)]
    theta: f64,

    /// Minimum accumulator votes before a candidate line is walked.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_HOUGH_MIN_VOTES)]
    min_votes: u32,

    /// Minimum segment length in pixels.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_HOUGH_MIN_LENGTH)]
    min_length: f64,

    /// Maximum gap in pixels bridged along a candidate line.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_HOUGH_MAX_GAP)]
    max_gap: f64,

    /// Overlay stroke color as "R,G,B".
    #[arg(long, default_value = "255,0,0", value_parser = parse_color)]
    color: [u8; 3],

    /// Overlay stroke thickness in pixels.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_DRAW_THICKNESS, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    thickness: u32,

    /// Weight of the original photograph in the composite.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_BLEND_ALPHA)]
    alpha: f64,

    /// Weight of the overlay in the composite.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_BLEND_BETA)]
    beta: f64,

    /// Scalar added to every channel before clamping.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_BLEND_GAMMA)]
    gamma: f64,

    /// Marker appended to output file stems; files already carrying it
    /// are skipped as prior outputs.
    #[arg(long, default_value = "Hough")]
    marker: String,

    /// Write annotated copies here instead of next to the sources.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Collect composites into a single montage image at this path
    /// instead of writing per-image files.
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Montage rows.
    #[arg(long, default_value_t = 2, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    grid_rows: u32,

    /// Montage columns.
    #[arg(long, default_value_t = 3, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    grid_cols: u32,

    /// Montage cell width in pixels.
    #[arg(long, default_value_t = 480, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    cell_width: u32,

    /// Montage cell height in pixels.
    #[arg(long, default_value_t = 270, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    cell_height: u32,

    /// What to do once every montage cell is taken.
    #[arg(long, value_enum, default_value_t = Overflow::Grow)]
    overflow: Overflow,

    /// Print a per-image diagnostics report to stdout.
    #[arg(long)]
    stats: bool,

    /// Print per-image diagnostics as JSON to stdout.
    #[arg(long, conflicts_with = "stats")]
    json: bool,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all individual pipeline parameter flags are
    /// ignored. The JSON must be a valid `PipelineConfig`
    /// serialization.
    #[arg(long)]
    config_json: Option<String>,
}

/// Montage overflow behavior selection.
#[derive(Clone, Copy, ValueEnum)]
enum Overflow {
    /// Fail once every cell is taken.
    Error,
    /// Start over at the first cell, overwriting earlier images.
    Wrap,
    /// Append extra rows below the configured grid.
    Grow,
}

/// Maps the CLI [`Overflow`] selection to the montage policy.
const fn overflow_policy(overflow: Overflow) -> OverflowPolicy {
    match overflow {
        Overflow::Error => OverflowPolicy::Error,
        Overflow::Wrap => OverflowPolicy::Wrap,
        Overflow::Grow => OverflowPolicy::Grow,
    }
}

/// Parse an "R,G,B" triple into stroke color channels.
fn parse_color(raw: &str) -> Result<[u8; 3], String> {
    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() != 3 {
        return Err(format!("expected three components R,G,B, got {raw:?}"));
    }
    let mut color = [0u8; 3];
    for (slot, part) in color.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse()
            .map_err(|e| format!("bad color component {part:?}: {e}"))?;
    }
    Ok(color)
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. Otherwise, a config is
/// assembled from the individual flags.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(PipelineConfig {
        blur_kernel: cli.blur_kernel,
        canny_low: cli.canny_low,
        canny_high: cli.canny_high,
        mask: MaskFractions {
            x_pct: cli.mask_x_pct,
            y_pct: cli.mask_y_pct,
        },
        hough: HoughParams {
            rho: cli.rho,
            theta: cli.theta,
            min_votes: cli.min_votes,
            min_length: cli.min_length,
            max_gap: cli.max_gap,
        },
        style: DrawStyle {
            color: cli.color,
            thickness: cli.thickness,
        },
        blend: BlendWeights {
            alpha: cli.alpha,
            beta: cli.beta,
            gamma: cli.gamma,
        },
    })
}

/// Pick the sink for this run: montage when `--preview` is given,
/// per-file output otherwise.
fn build_sink(cli: &Cli) -> Result<OutputSink, sink::SinkError> {
    match cli.preview {
        Some(ref path) => {
            let layout =
                GridLayout::new(cli.grid_rows, cli.grid_cols, overflow_policy(cli.overflow));
            let montage =
                Montage::new(cli.grid_rows, cli.grid_cols, cli.cell_width, cli.cell_height);
            Ok(OutputSink::display(layout, montage, path.clone()))
        }
        None => OutputSink::files(cli.out_dir.clone(), cli.marker.clone()),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(config) => config,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = config.validate() {
        eprintln!("Invalid configuration: {err}");
        return ExitCode::FAILURE;
    }

    let report_mode = if cli.json {
        ReportMode::Json
    } else if cli.stats {
        ReportMode::Text
    } else {
        ReportMode::Quiet
    };

    let mut sink = match build_sink(&cli) {
        Ok(sink) => sink,
        Err(err) => {
            eprintln!("Cannot prepare output: {err}");
            return ExitCode::FAILURE;
        }
    };

    let summary = match batch::run(&cli.input_dir, &config, &cli.marker, report_mode, &mut sink) {
        Ok(summary) => summary,
        Err(err) => {
            eprintln!("Cannot read {}: {err}", cli.input_dir.display());
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = sink.finish() {
        eprintln!("Cannot write output: {err}");
        return ExitCode::FAILURE;
    }

    if summary.processed == 0 && summary.failed == 0 {
        tracing::warn!(path = %cli.input_dir.display(), "no new images to process");
    }
    eprintln!(
        "Processed {} image(s), skipped {}, {} failure(s)",
        summary.processed, summary.skipped, summary.failed,
    );

    // Partial failures still exit zero; only a fully failed batch does not.
    if summary.processed == 0 && summary.failed > 0 {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

//! Convert command implementation

use clap::Args;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::config::loader::{self, CliOverrides, ConfigError};
use crate::convert::{convert_detailed, Conversion, ConvertOptions};
use crate::error::ConvertError;
use crate::output;

/// Arguments for `sprite2gif convert`
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Sprite sheet image (PNG or any format the image crate reads)
    pub input: PathBuf,

    /// Output file or directory.
    /// If omitted: {input_dir}/{input_stem}.gif
    /// If directory (ends with / or exists): dir/{input_stem}.gif
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Width of one frame in pixels (default: 256)
    #[arg(long)]
    pub frame_width: Option<u32>,

    /// Height of one frame in pixels (default: 256)
    #[arg(long)]
    pub frame_height: Option<u32>,

    /// Frames per row (default: 4)
    #[arg(long)]
    pub columns: Option<u32>,

    /// Rows on the sheet (default: 1)
    #[arg(long)]
    pub rows: Option<u32>,

    /// Rows to animate, 1-based, in playback order (e.g. "1,3")
    #[arg(long, value_delimiter = ',')]
    pub select: Option<Vec<u32>>,

    /// Frame duration in milliseconds (default: 100)
    #[arg(long)]
    pub duration: Option<u32>,

    /// Loop count, 0 loops forever (default: 0)
    #[arg(long = "loop", conflicts_with = "once")]
    pub loop_count: Option<u16>,

    /// Play the animation once without looping
    #[arg(long)]
    pub once: bool,

    /// Encode every frame in full instead of as a difference
    #[arg(long)]
    pub no_optimize: bool,

    /// Flatten transparent pixels onto the nearest palette color
    #[arg(long)]
    pub no_transparency: bool,

    /// Number of worker threads (default: one per core)
    #[arg(long)]
    pub jobs: Option<usize>,

    /// Path to a sprite2gif.toml (default: discovered from the working directory)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print a JSON summary instead of a text line
    #[arg(long)]
    pub json: bool,
}

impl ConvertArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            frame_width: self.frame_width,
            frame_height: self.frame_height,
            columns: self.columns,
            rows: self.rows,
            selected_rows: self.select.clone(),
            duration_ms: self.duration,
            loop_count: self.loop_count,
            play_once: self.once.then_some(true),
            optimize: self.no_optimize.then_some(false),
            transparency: self.no_transparency.then_some(false),
            jobs: self.jobs,
        }
    }
}

/// Machine-readable result printed with `--json`
#[derive(Debug, Serialize)]
struct ConvertSummary {
    output: String,
    frames: usize,
    width: u32,
    height: u32,
    colors: usize,
    delay_cs: u16,
    loop_count: Option<u16>,
    optimized: bool,
    bytes: usize,
}

/// Execute the convert command
pub fn run_convert(args: &ConvertArgs) -> ExitCode {
    if args.jobs == Some(0) {
        eprintln!("Error: --jobs must be at least 1");
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let mut config = match loader::load_config(args.config.as_deref()) {
        Ok(c) => c,
        Err(e @ ConfigError::Validation(_)) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    loader::merge_cli_overrides(&mut config, &args.overrides());
    let options = config.to_convert_options();

    let sheet = match output::load_sprite_sheet(&args.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: Failed to read '{}': {}", args.input.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let pool = match build_pool(config.performance.jobs) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: Failed to start worker threads: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let result = match pool {
        Some(ref pool) => pool.install(|| convert_detailed(&sheet, &options)),
        None => convert_detailed(&sheet, &options),
    };

    let conversion = match result {
        Ok(c) => c,
        Err(e @ (ConvertError::EmptyRowSelection | ConvertError::InvalidGridSpec(_))) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let output_path = output::generate_output_path(&args.input, args.output.as_deref());
    if let Err(e) = output::save_gif(&conversion.bytes, &output_path) {
        eprintln!("Error: Failed to write '{}': {}", output_path.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }

    if args.json {
        let summary = ConvertSummary {
            output: output_path.display().to_string(),
            frames: conversion.frame_count,
            width: options.grid.frame_width,
            height: options.grid.frame_height,
            colors: conversion.palette_len,
            delay_cs: conversion.delay_cs,
            loop_count: options.loop_count,
            optimized: conversion.optimized,
            bytes: conversion.bytes.len(),
        };
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    } else {
        print_summary(&output_path, &options, &conversion);
    }

    ExitCode::from(EXIT_SUCCESS)
}

/// Dedicated worker pool when a worker count is configured, otherwise the global one.
fn build_pool(jobs: Option<usize>) -> Result<Option<ThreadPool>, ThreadPoolBuildError> {
    let Some(jobs) = jobs else {
        return Ok(None);
    };
    log::debug!("converting on {} worker threads", jobs);
    ThreadPoolBuilder::new().num_threads(jobs).build().map(Some)
}

fn print_summary(path: &Path, options: &ConvertOptions, conversion: &Conversion) {
    println!(
        "Converted: {} ({} frames, {}x{}, {} colors, {} bytes)",
        path.display(),
        conversion.frame_count,
        options.grid.frame_width,
        options.grid.frame_height,
        conversion.palette_len,
        conversion.bytes.len()
    );
}

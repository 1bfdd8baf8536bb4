//! Sprite sheet to GIF conversion entry point
//!
//! Runs the whole pipeline: slice the sheet, build the shared palette,
//! quantize frames, optionally difference them, and assemble the GIF.
//! Per-frame stages run on the current rayon pool.

use image::RgbaImage;
use rayon::prelude::*;

use crate::encoder;
use crate::error::ConvertError;
use crate::gif::{self, Animation};
use crate::grid::{self, GridSpec};
use crate::palette::PaletteBuilder;
use crate::quantize::{self, IndexedFrame};

/// Fully resolved conversion settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    pub grid: GridSpec,
    /// Display time of each frame in milliseconds
    pub duration_ms: u32,
    /// `None` plays once, `Some(0)` loops forever, `Some(n)` plays n extra times
    pub loop_count: Option<u16>,
    /// Draw frames as differences from the previous frame where possible
    pub optimize: bool,
    /// Keep fully transparent pixels transparent
    pub keep_transparency: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            grid: GridSpec::new(256, 256, 4, 1),
            duration_ms: 100,
            loop_count: Some(0),
            optimize: true,
            keep_transparency: true,
        }
    }
}

/// A finished conversion and what went into it.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub bytes: Vec<u8>,
    pub frame_count: usize,
    pub palette_len: usize,
    pub delay_cs: u16,
    /// Whether frame differencing was applied
    pub optimized: bool,
}

/// Convert a sprite sheet to GIF bytes.
pub fn convert(source: &RgbaImage, options: &ConvertOptions) -> Result<Vec<u8>, ConvertError> {
    convert_detailed(source, options).map(|c| c.bytes)
}

/// Convert a sprite sheet from individual settings.
///
/// `selected_rows` are 1-based and are played in the order given.
pub fn convert_sprite_sheet(
    source: &RgbaImage,
    frame_width: u32,
    frame_height: u32,
    num_cols: u32,
    num_rows: u32,
    duration_ms: u32,
    loop_count: Option<u16>,
    optimize: bool,
    keep_transparency: bool,
    selected_rows: &[u32],
) -> Result<Vec<u8>, ConvertError> {
    let options = ConvertOptions {
        grid: GridSpec::new(frame_width, frame_height, num_cols, num_rows)
            .with_selected_rows(selected_rows.iter().copied()),
        duration_ms,
        loop_count,
        optimize,
        keep_transparency,
    };
    convert(source, &options)
}

/// Convert a sprite sheet, reporting frame and palette details alongside the bytes.
pub fn convert_detailed(
    source: &RgbaImage,
    options: &ConvertOptions,
) -> Result<Conversion, ConvertError> {
    let frames = grid::slice(source, &options.grid)?;

    if options.optimize && !options.keep_transparency {
        log::debug!("optimize requested without transparency, frames are encoded in full");
    }
    let wants_optimize = options.optimize && options.keep_transparency && frames.len() > 1;

    let palette = PaletteBuilder::new(options.keep_transparency)
        .reserve_sentinel(wants_optimize)
        .build(&frames);

    // Differencing marks unchanged pixels with the sentinel
    let optimize = wants_optimize && palette.transparent_index().is_some();
    if wants_optimize && !optimize {
        log::debug!("palette has no sentinel slot, frames are encoded in full");
    }

    let delay_cs = quantize::delay_from_ms(options.duration_ms);
    let mut indexed: Vec<IndexedFrame> =
        frames.par_iter().map(|f| quantize::quantize(f, &palette).with_delay(delay_cs)).collect();
    drop(frames);

    if optimize {
        indexed = encoder::difference_frames(indexed, &palette);
    }

    // Validated by grid::slice
    let (width, height) = (options.grid.frame_width as u16, options.grid.frame_height as u16);
    let frame_count = indexed.len();
    let palette_len = palette.len();

    let animation =
        Animation { frames: indexed, palette, width, height, loop_count: options.loop_count };
    let bytes = gif::assemble(&animation)?;

    log::info!(
        "converted {} frames ({}x{}, {} colors, {} cs delay) into {} bytes",
        frame_count,
        width,
        height,
        palette_len,
        delay_cs,
        bytes.len()
    );

    Ok(Conversion { bytes, frame_count, palette_len, delay_cs, optimized: optimize })
}

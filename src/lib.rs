//! Sprite2GIF - Library for converting sprite sheets into animated GIFs
//!
//! This library provides functionality to:
//! - Slice a grid sprite sheet into frames, row by row
//! - Build one shared palette of at most 256 colors
//! - Quantize, optimize and LZW-encode each frame
//! - Assemble a looping GIF89a animation

pub mod cli;
pub mod config;
pub mod convert;
pub mod encoder;
pub mod error;
pub mod gif;
pub mod grid;
pub mod lzw;
pub mod output;
pub mod palette;
pub mod quantize;

pub use convert::{convert, convert_detailed, convert_sprite_sheet, Conversion, ConvertOptions};
pub use error::ConvertError;
pub use grid::GridSpec;

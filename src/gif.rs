//! GIF animation assembly

use rayon::prelude::*;

use crate::encoder;
use crate::error::ConvertError;
use crate::palette::Palette;
use crate::quantize::IndexedFrame;

const SIGNATURE: &[u8; 6] = b"GIF89a";
const TRAILER: u8 = 0x3B;

/// A complete animation waiting to be serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Animation {
    pub frames: Vec<IndexedFrame>,
    pub palette: Palette,
    pub width: u16,
    pub height: u16,
    /// `None` plays once, `Some(0)` loops forever, `Some(n)` plays n extra times
    pub loop_count: Option<u16>,
}

/// Serialize an animation as a GIF89a byte stream.
///
/// Frames are encoded in parallel and written back in frame order,
/// so identical input always yields identical bytes.
pub fn assemble(animation: &Animation) -> Result<Vec<u8>, ConvertError> {
    let encoded: Vec<Vec<u8>> = animation
        .frames
        .par_iter()
        .map(|frame| encoder::encode(frame, &animation.palette))
        .collect::<Result<_, _>>()?;

    let color_table = animation.palette.to_color_table();
    let body: usize = encoded.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(13 + color_table.len() + 19 + body + 1);

    out.extend_from_slice(SIGNATURE);
    write_screen_descriptor(&mut out, animation);
    out.extend_from_slice(&color_table);
    if let Some(count) = animation.loop_count {
        write_loop_extension(&mut out, count);
    }
    for frame in &encoded {
        out.extend_from_slice(frame);
    }
    out.push(TRAILER);

    log::debug!(
        "assembled {} frames into {} bytes ({}x{}, {} colors)",
        animation.frames.len(),
        out.len(),
        animation.width,
        animation.height,
        animation.palette.len()
    );

    Ok(out)
}

/// Logical Screen Descriptor: canvas size and global color table flags.
fn write_screen_descriptor(out: &mut Vec<u8>, animation: &Animation) {
    let size_field = animation.palette.table_bits() - 1;
    // Global color table present, color resolution, table size
    let flags = 0x80 | (size_field << 4) | size_field;

    out.extend_from_slice(&animation.width.to_le_bytes());
    out.extend_from_slice(&animation.height.to_le_bytes());
    out.push(flags);
    // Background color index, pixel aspect ratio
    out.extend_from_slice(&[0x00, 0x00]);
}

/// NETSCAPE2.0 application extension carrying the loop count.
fn write_loop_extension(out: &mut Vec<u8>, count: u16) {
    out.extend_from_slice(&[0x21, 0xFF, 0x0B]);
    out.extend_from_slice(b"NETSCAPE2.0");
    out.extend_from_slice(&[0x03, 0x01]);
    out.extend_from_slice(&count.to_le_bytes());
    out.push(0x00);
}

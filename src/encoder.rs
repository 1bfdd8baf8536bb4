//! Per-frame GIF encoding.
//!
//! Each frame becomes a Graphic Control Extension, an Image Descriptor and
//! its LZW-compressed image data. Frames always cover the whole canvas.
//!
//! With frame differencing enabled, pixels that match the previous frame are
//! replaced by the transparency sentinel so the decoder keeps what is already
//! on the canvas.

use rayon::prelude::*;

use crate::error::ConvertError;
use crate::lzw;
use crate::palette::Palette;
use crate::quantize::{DisposalMethod, IndexedFrame};

/// Extension introducer
const EXTENSION: u8 = 0x21;
/// Graphic Control Extension label
const GRAPHIC_CONTROL: u8 = 0xF9;
/// Image Descriptor separator
const IMAGE_SEPARATOR: u8 = 0x2C;

/// Encode one frame into its GIF block sequence.
pub fn encode(frame: &IndexedFrame, palette: &Palette) -> Result<Vec<u8>, ConvertError> {
    let (width, height) = frame_dimensions(frame)?;
    let expected = usize::from(width) * usize::from(height);
    if frame.indices.len() != expected {
        return Err(ConvertError::encoding(format!(
            "frame has {} indices, expected {} for {}x{}",
            frame.indices.len(),
            expected,
            width,
            height
        )));
    }
    if let Some(&bad) = frame.indices.iter().find(|&&i| usize::from(i) >= palette.len()) {
        return Err(ConvertError::encoding(format!(
            "index {} outside palette of {} entries",
            bad,
            palette.len()
        )));
    }

    let data = lzw::compress(&frame.indices, lzw::min_code_size(palette.table_bits()))?;

    let mut out = Vec::with_capacity(8 + 10 + data.len());
    write_graphic_control(&mut out, frame);
    write_image_descriptor(&mut out, width, height);
    out.extend_from_slice(&data);
    Ok(out)
}

fn frame_dimensions(frame: &IndexedFrame) -> Result<(u16, u16), ConvertError> {
    match (u16::try_from(frame.width), u16::try_from(frame.height)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => Err(ConvertError::encoding(format!(
            "frame size {}x{} does not fit a GIF image descriptor",
            frame.width, frame.height
        ))),
    }
}

fn write_graphic_control(out: &mut Vec<u8>, frame: &IndexedFrame) {
    let mut flags = u8::from(frame.disposal) << 2;
    if frame.transparent_index.is_some() {
        flags |= 0x01;
    }
    out.extend_from_slice(&[EXTENSION, GRAPHIC_CONTROL, 0x04, flags]);
    out.extend_from_slice(&frame.delay_cs.to_le_bytes());
    out.push(frame.transparent_index.unwrap_or(0));
    out.push(0x00);
}

fn write_image_descriptor(out: &mut Vec<u8>, width: u16, height: u16) {
    out.push(IMAGE_SEPARATOR);
    // Always placed at the canvas origin
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    // No local color table, not interlaced
    out.push(0x00);
}

/// Rewrite unchanged pixels to the transparency sentinel.
///
/// A frame can only be drawn as a difference when no pixel turns transparent
/// relative to the previous frame, because a kept canvas cannot be made
/// transparent again. The frame before each difference frame is switched to
/// [`DisposalMethod::Keep`]; every other frame keeps background disposal so
/// its transparent areas stay transparent. Without a sentinel the frames are
/// returned unchanged.
pub fn difference_frames(frames: Vec<IndexedFrame>, palette: &Palette) -> Vec<IndexedFrame> {
    let Some(sentinel) = palette.transparent_index() else {
        log::debug!("palette has no sentinel, skipping frame differencing");
        return frames;
    };

    let differenced: Vec<bool> = (0..frames.len())
        .into_par_iter()
        .map(|k| k > 0 && can_difference(&frames[k - 1], &frames[k], sentinel))
        .collect();

    log::debug!(
        "frame differencing: {} of {} frames drawn as differences",
        differenced.iter().filter(|&&d| d).count(),
        frames.len()
    );

    (0..frames.len())
        .into_par_iter()
        .map(|k| {
            let frame = &frames[k];
            let indices = if differenced[k] {
                frame
                    .indices
                    .iter()
                    .zip(&frames[k - 1].indices)
                    .map(|(&cur, &prev)| if cur == prev { sentinel } else { cur })
                    .collect()
            } else {
                frame.indices.clone()
            };
            let disposal = if differenced.get(k + 1).copied().unwrap_or(false) {
                DisposalMethod::Keep
            } else {
                DisposalMethod::Background
            };

            let mut out = IndexedFrame { indices, disposal, ..frame.clone() };
            out.refresh_transparency(Some(sentinel));
            out
        })
        .collect()
}

fn can_difference(prev: &IndexedFrame, cur: &IndexedFrame, sentinel: u8) -> bool {
    prev.width == cur.width
        && prev.height == cur.height
        && prev
            .indices
            .iter()
            .zip(&cur.indices)
            .all(|(&p, &c)| c != sentinel || p == sentinel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::Rgb;

    fn palette_with_sentinel() -> Palette {
        Palette::new(vec![Rgb::new(255, 0, 0), Rgb::new(0, 255, 0), Rgb::new(1, 0, 1)], Some(2))
            .unwrap()
    }

    fn frame(indices: Vec<u8>, width: u32, height: u32) -> IndexedFrame {
        IndexedFrame {
            width,
            height,
            indices,
            delay_cs: 10,
            disposal: DisposalMethod::Background,
            transparent_index: None,
        }
    }

    #[test]
    fn test_encode_block_layout() {
        let palette = palette_with_sentinel();
        let mut f = frame(vec![0, 1, 2, 0], 2, 2);
        f.refresh_transparency(Some(2));
        let bytes = encode(&f, &palette).unwrap();

        // Graphic Control Extension
        assert_eq!(&bytes[0..4], &[0x21, 0xF9, 0x04, (2 << 2) | 1]);
        assert_eq!(&bytes[4..6], &10u16.to_le_bytes());
        assert_eq!(bytes[6], 2);
        assert_eq!(bytes[7], 0);

        // Image Descriptor
        assert_eq!(bytes[8], 0x2C);
        assert_eq!(&bytes[9..13], &[0, 0, 0, 0]);
        assert_eq!(&bytes[13..17], &[2, 0, 2, 0]);
        assert_eq!(bytes[17], 0);

        // Image data: minimum code size, then sub-blocks ending in a terminator
        assert_eq!(bytes[18], 2);
        assert_eq!(*bytes.last().unwrap(), 0);
    }

    #[test]
    fn test_encode_keep_disposal_without_transparency() {
        let palette = palette_with_sentinel();
        let f = frame(vec![0, 1], 2, 1).with_disposal(DisposalMethod::Keep);
        let bytes = encode(&f, &palette).unwrap();
        assert_eq!(bytes[3], 1 << 2);
        assert_eq!(bytes[6], 0);
    }

    #[test]
    fn test_encode_rejects_wrong_length() {
        let palette = palette_with_sentinel();
        let f = frame(vec![0, 1, 0], 2, 2);
        assert!(matches!(encode(&f, &palette), Err(ConvertError::EncodingFailure(_))));
    }

    #[test]
    fn test_encode_rejects_index_outside_palette() {
        let palette = palette_with_sentinel();
        let f = frame(vec![0, 3], 2, 1);
        assert!(matches!(encode(&f, &palette), Err(ConvertError::EncodingFailure(_))));
    }

    #[test]
    fn test_encode_rejects_oversized_frame() {
        let palette = palette_with_sentinel();
        let f = frame(vec![], 70_000, 0);
        assert!(matches!(encode(&f, &palette), Err(ConvertError::EncodingFailure(_))));
    }

    #[test]
    fn test_difference_unchanged_pixels() {
        let palette = palette_with_sentinel();
        let frames = vec![frame(vec![0, 0, 1, 1], 2, 2), frame(vec![0, 1, 1, 0], 2, 2)];
        let out = difference_frames(frames, &palette);

        assert_eq!(out[0].indices, vec![0, 0, 1, 1]);
        assert_eq!(out[0].disposal, DisposalMethod::Keep);
        assert_eq!(out[1].indices, vec![2, 1, 2, 0]);
        assert_eq!(out[1].disposal, DisposalMethod::Background);
        assert_eq!(out[1].transparent_index, Some(2));
    }

    #[test]
    fn test_difference_skipped_when_pixel_turns_transparent() {
        let palette = palette_with_sentinel();
        let frames = vec![
            frame(vec![0, 1], 2, 1),
            frame(vec![0, 2], 2, 1),
            frame(vec![0, 2], 2, 1),
        ];
        let out = difference_frames(frames, &palette);

        // Frame 1 makes a pixel transparent, so it is drawn in full on a cleared canvas
        assert_eq!(out[0].disposal, DisposalMethod::Background);
        assert_eq!(out[1].indices, vec![0, 2]);
        // Frame 2 only repeats frame 1, so it becomes all sentinel
        assert_eq!(out[1].disposal, DisposalMethod::Keep);
        assert_eq!(out[2].indices, vec![2, 2]);
        assert_eq!(out[2].disposal, DisposalMethod::Background);
    }

    #[test]
    fn test_difference_without_sentinel_is_identity() {
        let palette = Palette::new(vec![Rgb::BLACK, Rgb::new(9, 9, 9)], None).unwrap();
        let frames = vec![frame(vec![0, 1], 2, 1), frame(vec![0, 1], 2, 1)];
        let out = difference_frames(frames.clone(), &palette);
        assert_eq!(out, frames);
    }
}

//! Frame quantization - maps RGBA frames onto the global palette

use image::RgbaImage;
use std::collections::HashMap;

use crate::palette::{Palette, Rgb};

/// What a decoder does with a frame's pixels before drawing the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisposalMethod {
    /// Leave the frame on the canvas; the next frame draws over it
    Keep,
    /// Clear the frame's area before the next frame is drawn
    #[default]
    Background,
}

impl From<DisposalMethod> for u8 {
    fn from(d: DisposalMethod) -> Self {
        match d {
            DisposalMethod::Keep => 1,
            DisposalMethod::Background => 2,
        }
    }
}

/// A frame expressed as palette indices, ready for LZW compression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedFrame {
    pub width: u32,
    pub height: u32,
    /// Row-major palette indices, `width * height` long
    pub indices: Vec<u8>,
    /// Display time in centiseconds
    pub delay_cs: u16,
    pub disposal: DisposalMethod,
    /// Sentinel index, set only when at least one pixel uses it
    pub transparent_index: Option<u8>,
}

impl IndexedFrame {
    /// Set how long the frame is shown.
    pub fn with_delay(mut self, delay_cs: u16) -> Self {
        self.delay_cs = delay_cs;
        self
    }

    /// Set the frame's disposal method.
    pub fn with_disposal(mut self, disposal: DisposalMethod) -> Self {
        self.disposal = disposal;
        self
    }

    /// Recompute the transparent flag against `sentinel` after the indices change.
    pub(crate) fn refresh_transparency(&mut self, sentinel: Option<u8>) {
        self.transparent_index = sentinel.filter(|s| self.indices.contains(s));
    }
}

/// Convert a per-frame duration to a GIF delay.
///
/// GIF stores delays in centiseconds; anything under 10 ms still shows for
/// one centisecond.
pub fn delay_from_ms(duration_ms: u32) -> u16 {
    (duration_ms / 10).clamp(1, u32::from(u16::MAX)) as u16
}

/// Map every pixel of `frame` to a palette index.
///
/// Fully transparent pixels go to the sentinel when the palette has one;
/// everything else goes to the nearest color (lowest index on ties). The
/// result has a one-centisecond delay and background disposal until the
/// caller says otherwise.
pub fn quantize(frame: &RgbaImage, palette: &Palette) -> IndexedFrame {
    let sentinel = palette.transparent_index();
    let mut cache: HashMap<Rgb, u8> = HashMap::new();

    let indices: Vec<u8> = frame
        .pixels()
        .map(|pixel| match sentinel {
            Some(idx) if pixel[3] == 0 => idx,
            _ => {
                let color = Rgb::from_rgba(*pixel);
                *cache.entry(color).or_insert_with(|| palette.nearest(color))
            }
        })
        .collect();

    let mut indexed = IndexedFrame {
        width: frame.width(),
        height: frame.height(),
        indices,
        delay_cs: 1,
        disposal: DisposalMethod::Background,
        transparent_index: None,
    };
    indexed.refresh_transparency(sentinel);
    indexed
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn palette(colors: &[(u8, u8, u8)], transparent: Option<u8>) -> Palette {
        Palette::new(colors.iter().map(|&(r, g, b)| Rgb::new(r, g, b)).collect(), transparent)
            .unwrap()
    }

    #[test]
    fn test_delay_from_ms() {
        assert_eq!(delay_from_ms(100), 10);
        assert_eq!(delay_from_ms(105), 10);
        assert_eq!(delay_from_ms(10), 1);
        assert_eq!(delay_from_ms(5), 1);
        assert_eq!(delay_from_ms(0), 1);
        assert_eq!(delay_from_ms(u32::MAX), u16::MAX);
    }

    #[test]
    fn test_disposal_codes() {
        assert_eq!(u8::from(DisposalMethod::Keep), 1);
        assert_eq!(u8::from(DisposalMethod::Background), 2);
    }

    #[test]
    fn test_quantize_exact_colors() {
        let pal = palette(&[(255, 0, 0), (0, 255, 0)], None);
        let mut frame = RgbaImage::from_pixel(2, 1, Rgba([255, 0, 0, 255]));
        frame.put_pixel(1, 0, Rgba([0, 255, 0, 255]));

        let indexed = quantize(&frame, &pal);
        assert_eq!(indexed.indices, vec![0, 1]);
        assert_eq!((indexed.width, indexed.height), (2, 1));
        assert_eq!(indexed.transparent_index, None);
    }

    #[test]
    fn test_quantize_nearest_color() {
        let pal = palette(&[(0, 0, 0), (200, 200, 200)], None);
        let frame = RgbaImage::from_pixel(1, 1, Rgba([180, 170, 190, 255]));
        assert_eq!(quantize(&frame, &pal).indices, vec![1]);
    }

    #[test]
    fn test_quantize_transparent_to_sentinel() {
        let pal = palette(&[(255, 0, 0), (0, 0, 0)], Some(1));
        let mut frame = RgbaImage::from_pixel(2, 1, Rgba([255, 0, 0, 255]));
        frame.put_pixel(1, 0, Rgba([255, 0, 0, 0]));

        let indexed = quantize(&frame, &pal);
        assert_eq!(indexed.indices, vec![0, 1]);
        assert_eq!(indexed.transparent_index, Some(1));
    }

    #[test]
    fn test_quantize_flag_only_when_sentinel_used() {
        let pal = palette(&[(255, 0, 0), (0, 0, 0)], Some(1));
        let frame = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255]));
        assert_eq!(quantize(&frame, &pal).transparent_index, None);
    }

    #[test]
    fn test_quantize_without_sentinel_uses_rgb() {
        let pal = palette(&[(0, 0, 0), (255, 255, 255)], None);
        let frame = RgbaImage::from_pixel(1, 1, Rgba([250, 250, 250, 0]));
        assert_eq!(quantize(&frame, &pal).indices, vec![1]);
    }

    #[test]
    fn test_builders() {
        let pal = palette(&[(0, 0, 0)], None);
        let frame = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        let indexed = quantize(&frame, &pal).with_delay(10).with_disposal(DisposalMethod::Keep);
        assert_eq!(indexed.delay_cs, 10);
        assert_eq!(indexed.disposal, DisposalMethod::Keep);
    }
}

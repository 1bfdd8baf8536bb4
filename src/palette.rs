//! Global color table construction.
//!
//! Collects the opaque colors of every frame and reduces them to at most 256
//! entries, using median cut when the sheet has more colors than fit. One slot
//! may be reserved for the transparency sentinel.
//!
//! Everything here iterates in first-seen or creation order so the same
//! frames always produce the same table.

use image::{Rgba, RgbaImage};
use std::collections::HashMap;

use crate::error::ConvertError;

/// Maximum number of entries in a GIF color table
pub const MAX_COLORS: usize = 256;

/// An opaque color as stored in the GIF color table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Drop the alpha channel.
    pub fn from_rgba(rgba: Rgba<u8>) -> Self {
        Self { r: rgba[0], g: rgba[1], b: rgba[2] }
    }

    /// Squared Euclidean distance in RGB space.
    pub fn distance_sq(self, other: Rgb) -> u32 {
        let dr = i32::from(self.r) - i32::from(other.r);
        let dg = i32::from(self.g) - i32::from(other.g);
        let db = i32::from(self.b) - i32::from(other.b);
        (dr * dr + dg * dg + db * db) as u32
    }
}

/// The global color table shared by every frame of one animation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb>,
    transparent_index: Option<u8>,
}

impl Palette {
    /// Create a palette from explicit entries.
    ///
    /// Fails if there are no entries, more than 256, or the transparent index
    /// does not point at an entry.
    pub fn new(colors: Vec<Rgb>, transparent_index: Option<u8>) -> Result<Self, ConvertError> {
        if colors.is_empty() || colors.len() > MAX_COLORS {
            return Err(ConvertError::encoding(format!(
                "palette must have 1..={} entries, got {}",
                MAX_COLORS,
                colors.len()
            )));
        }
        if let Some(idx) = transparent_index {
            if usize::from(idx) >= colors.len() {
                return Err(ConvertError::encoding(format!(
                    "transparent index {} outside palette of {} entries",
                    idx,
                    colors.len()
                )));
            }
        }
        Ok(Self { colors, transparent_index })
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Index of the transparency sentinel, if one was reserved.
    pub fn transparent_index(&self) -> Option<u8> {
        self.transparent_index
    }

    /// Bits needed to address every entry: `ceil(log2(len))`, at least 1.
    pub fn table_bits(&self) -> u8 {
        let mut bits = 1u8;
        while (1usize << bits) < self.colors.len() {
            bits += 1;
        }
        bits
    }

    /// Entry count once padded to a power of two.
    pub fn table_len(&self) -> usize {
        1 << self.table_bits()
    }

    /// Serialize as a GIF color table, padded with black to `table_len()` entries.
    pub fn to_color_table(&self) -> Vec<u8> {
        let mut table = Vec::with_capacity(self.table_len() * 3);
        for color in &self.colors {
            table.extend_from_slice(&[color.r, color.g, color.b]);
        }
        table.resize(self.table_len() * 3, 0);
        table
    }

    /// Nearest non-sentinel entry by Euclidean RGB distance.
    ///
    /// Ties go to the lowest index.
    pub fn nearest(&self, color: Rgb) -> u8 {
        let mut best = (0usize, u32::MAX);
        for (i, entry) in self.colors.iter().enumerate() {
            if Some(i as u8) == self.transparent_index {
                continue;
            }
            let d = color.distance_sq(*entry);
            if d < best.1 {
                best = (i, d);
                if d == 0 {
                    break;
                }
            }
        }
        best.0 as u8
    }
}

/// Builds a [`Palette`] from a set of frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaletteBuilder {
    keep_transparency: bool,
    reserve_sentinel: bool,
}

impl PaletteBuilder {
    pub fn new(keep_transparency: bool) -> Self {
        Self { keep_transparency, reserve_sentinel: false }
    }

    /// Reserve the sentinel slot even when no pixel is transparent.
    ///
    /// Frame differencing needs a sentinel to mark unchanged pixels. Has no
    /// effect when transparency is off, and is skipped when the frames hold
    /// exactly [`MAX_COLORS`] opaque colors, since the extra slot would force
    /// an otherwise exact palette through median cut.
    pub fn reserve_sentinel(mut self, reserve: bool) -> Self {
        self.reserve_sentinel = reserve;
        self
    }

    pub fn build(&self, frames: &[RgbaImage]) -> Palette {
        let histogram = ColorHistogram::collect(frames, self.keep_transparency);
        let reserve = self.reserve_sentinel && histogram.counts.len() != MAX_COLORS;
        if self.reserve_sentinel && !reserve && !histogram.has_transparent {
            log::debug!("{} opaque colors fill the table, no sentinel reserved", MAX_COLORS);
        }
        let with_sentinel = self.keep_transparency && (histogram.has_transparent || reserve);
        let limit = if with_sentinel { MAX_COLORS - 1 } else { MAX_COLORS };

        let mut colors = match exact_palette(&histogram, limit) {
            Ok(colors) => colors,
            Err(overflow) => {
                log::debug!(
                    "{} distinct colors exceed limit of {}, quantizing with median cut",
                    overflow.distinct,
                    overflow.limit
                );
                median_cut(histogram.counts, limit)
            }
        };

        let transparent_index = if with_sentinel {
            colors.push(sentinel_color(&colors));
            Some((colors.len() - 1) as u8)
        } else {
            None
        };

        if colors.is_empty() {
            colors.push(Rgb::BLACK);
        }

        log::debug!(
            "built palette with {} entries (transparent index: {:?})",
            colors.len(),
            transparent_index
        );

        Palette { colors, transparent_index }
    }
}

/// Build the global palette for `frames`.
pub fn build(frames: &[RgbaImage], keep_transparency: bool) -> Palette {
    PaletteBuilder::new(keep_transparency).build(frames)
}

/// Does this pixel map to the transparency sentinel?
pub(crate) fn is_sentinel_pixel(pixel: &Rgba<u8>, keep_transparency: bool) -> bool {
    keep_transparency && pixel[3] == 0
}

/// Distinct opaque colors in first-seen order, with pixel counts.
struct ColorHistogram {
    counts: Vec<(Rgb, u32)>,
    has_transparent: bool,
}

impl ColorHistogram {
    fn collect(frames: &[RgbaImage], keep_transparency: bool) -> Self {
        let mut counts: Vec<(Rgb, u32)> = Vec::new();
        // Lookup only; ordering comes from `counts`
        let mut slots: HashMap<Rgb, usize> = HashMap::new();
        let mut has_transparent = false;

        for frame in frames {
            for pixel in frame.pixels() {
                if is_sentinel_pixel(pixel, keep_transparency) {
                    has_transparent = true;
                    continue;
                }
                let color = Rgb::from_rgba(*pixel);
                match slots.get(&color) {
                    Some(&slot) => counts[slot].1 += 1,
                    None => {
                        slots.insert(color, counts.len());
                        counts.push((color, 1));
                    }
                }
            }
        }

        Self { counts, has_transparent }
    }
}

/// Raised when a sheet has more distinct colors than the table can hold.
///
/// Never leaves this module: the builder answers it with median cut.
#[derive(Debug)]
struct PaletteOverflow {
    distinct: usize,
    limit: usize,
}

fn exact_palette(histogram: &ColorHistogram, limit: usize) -> Result<Vec<Rgb>, PaletteOverflow> {
    if histogram.counts.len() > limit {
        return Err(PaletteOverflow { distinct: histogram.counts.len(), limit });
    }
    Ok(histogram.counts.iter().map(|(c, _)| *c).collect())
}

/// Pick a sentinel color not already used by an opaque entry.
fn sentinel_color(colors: &[Rgb]) -> Rgb {
    (0..=255u8).map(|v| Rgb::new(v, 0, v)).find(|c| !colors.contains(c)).unwrap_or(Rgb::BLACK)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    fn of(self, color: Rgb) -> u8 {
        match self {
            Channel::Red => color.r,
            Channel::Green => color.g,
            Channel::Blue => color.b,
        }
    }
}

/// A box of colors for median cut algorithm.
#[derive(Debug, Clone)]
struct ColorBox {
    colors: Vec<(Rgb, u32)>, // Color and count
}

impl ColorBox {
    fn new(colors: Vec<(Rgb, u32)>) -> Self {
        Self { colors }
    }

    /// Find which channel has the largest range, and that range.
    fn widest_channel(&self) -> (Channel, u8) {
        let (mut min_r, mut max_r) = (255u8, 0u8);
        let (mut min_g, mut max_g) = (255u8, 0u8);
        let (mut min_b, mut max_b) = (255u8, 0u8);

        for (color, _) in &self.colors {
            min_r = min_r.min(color.r);
            max_r = max_r.max(color.r);
            min_g = min_g.min(color.g);
            max_g = max_g.max(color.g);
            min_b = min_b.min(color.b);
            max_b = max_b.max(color.b);
        }

        let range_r = max_r.saturating_sub(min_r);
        let range_g = max_g.saturating_sub(min_g);
        let range_b = max_b.saturating_sub(min_b);

        if range_r >= range_g && range_r >= range_b {
            (Channel::Red, range_r)
        } else if range_g >= range_b {
            (Channel::Green, range_g)
        } else {
            (Channel::Blue, range_b)
        }
    }

    /// Split the box into two along the widest channel.
    fn split(mut self) -> (ColorBox, ColorBox) {
        let (channel, _) = self.widest_channel();

        // Stable sort keeps first-seen order among equal channel values
        self.colors.sort_by_key(|(color, _)| channel.of(*color));

        // Find median by pixel count
        let total: u64 = self.pixel_count();
        let mut running = 0u64;
        let mut split_idx = self.colors.len() / 2;

        for (i, (_, count)) in self.colors.iter().enumerate() {
            running += u64::from(*count);
            if running * 2 >= total {
                split_idx = i + 1;
                break;
            }
        }

        // Ensure we don't create empty boxes
        split_idx = split_idx.clamp(1, self.colors.len() - 1);

        let right = self.colors.split_off(split_idx);
        (ColorBox::new(self.colors), ColorBox::new(right))
    }

    /// Get the average color of this box (weighted by pixel count).
    fn average_color(&self) -> Rgb {
        let total = self.pixel_count();
        if total == 0 {
            return Rgb::BLACK;
        }

        let mean = |channel: Channel| -> u8 {
            let sum: u64 =
                self.colors.iter().map(|(c, n)| u64::from(channel.of(*c)) * u64::from(*n)).sum();
            ((sum + total / 2) / total) as u8
        };

        Rgb::new(mean(Channel::Red), mean(Channel::Green), mean(Channel::Blue))
    }

    /// Total pixel count in this box.
    fn pixel_count(&self) -> u64 {
        self.colors.iter().map(|(_, count)| u64::from(*count)).sum()
    }
}

/// Reduce `colors` to at most `max_colors` entries.
///
/// Repeatedly splits the box with the widest channel range (earliest box wins
/// ties), then represents each box by its pixel-weighted mean.
fn median_cut(colors: Vec<(Rgb, u32)>, max_colors: usize) -> Vec<Rgb> {
    if colors.is_empty() || max_colors == 0 {
        return Vec::new();
    }

    let mut boxes = vec![ColorBox::new(colors)];

    while boxes.len() < max_colors {
        let mut target: Option<(usize, u8)> = None;
        for (i, b) in boxes.iter().enumerate() {
            if b.colors.len() < 2 {
                continue;
            }
            let (_, range) = b.widest_channel();
            if target.map_or(true, |(_, best)| range > best) {
                target = Some((i, range));
            }
        }

        let Some((idx, _)) = target else {
            break;
        };

        let (left, right) = boxes.remove(idx).split();
        boxes.push(left);
        boxes.push(right);
    }

    // Two boxes can average to the same color; keep the first
    let mut result: Vec<Rgb> = Vec::with_capacity(boxes.len());
    for color in boxes.iter().map(ColorBox::average_color) {
        if !result.contains(&color) {
            result.push(color);
        }
    }
    result
}

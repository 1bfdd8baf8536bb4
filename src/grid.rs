//! Sprite sheet slicing - cuts a grid layout back into individual frames

use image::{Rgba, RgbaImage};

use crate::error::ConvertError;

/// Transparent color used for padding
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Layout of frames on a sprite sheet.
///
/// Frames are `frame_width × frame_height` cells arranged in `columns × rows`.
/// Rows are addressed 1-based, matching how a user counts them on the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSpec {
    pub frame_width: u32,
    pub frame_height: u32,
    pub columns: u32,
    pub rows: u32,
    /// 1-based rows to include, in playback order
    pub selected_rows: Vec<u32>,
}

impl GridSpec {
    /// Create a grid that selects every row, top to bottom.
    pub fn new(frame_width: u32, frame_height: u32, columns: u32, rows: u32) -> Self {
        Self { frame_width, frame_height, columns, rows, selected_rows: (1..=rows).collect() }
    }

    /// Replace the row selection.
    pub fn with_selected_rows(mut self, rows: impl IntoIterator<Item = u32>) -> Self {
        self.selected_rows = rows.into_iter().collect();
        self
    }

    /// Check the grid can produce frames.
    ///
    /// Geometry extending past the sheet is not checked here: missing pixels
    /// are padded with transparency during slicing.
    pub fn validate(&self) -> Result<(), ConvertError> {
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(ConvertError::grid(format!(
                "frame size must be positive, got {}x{}",
                self.frame_width, self.frame_height
            )));
        }
        if self.frame_width > u16::MAX as u32 || self.frame_height > u16::MAX as u32 {
            return Err(ConvertError::grid(format!(
                "frame size {}x{} exceeds the GIF limit of {}",
                self.frame_width,
                self.frame_height,
                u16::MAX
            )));
        }
        if self.columns == 0 {
            return Err(ConvertError::grid("columns must be at least 1"));
        }
        if self.rows == 0 {
            return Err(ConvertError::grid("rows must be at least 1"));
        }
        if self.selected_rows.is_empty() {
            return Err(ConvertError::EmptyRowSelection);
        }
        if let Some(&row) = self.selected_rows.iter().find(|&&r| r == 0 || r > self.rows) {
            return Err(ConvertError::grid(format!(
                "selected row {} is outside 1..={}",
                row, self.rows
            )));
        }
        Ok(())
    }

    /// Selected rows with repeats removed, keeping the first occurrence.
    pub fn playback_rows(&self) -> Vec<u32> {
        let mut rows = Vec::with_capacity(self.selected_rows.len());
        for &row in &self.selected_rows {
            if !rows.contains(&row) {
                rows.push(row);
            }
        }
        rows
    }

    /// Number of frames slicing will produce.
    pub fn frame_count(&self) -> usize {
        self.columns as usize * self.playback_rows().len()
    }
}

/// Cut a sprite sheet into frames.
///
/// Frames are ordered by selected row (in selection order), then by column
/// left to right. Each frame is exactly `frame_width × frame_height`; any part
/// of a cell lying outside the sheet is filled with fully transparent pixels.
///
/// # Examples
///
/// ```
/// use image::{Rgba, RgbaImage};
/// use sprite2gif::grid::{slice, GridSpec};
///
/// // A 4x2 sheet of 2x2 cells: 2 columns, 1 row
/// let sheet = RgbaImage::from_pixel(4, 2, Rgba([255, 0, 0, 255]));
/// let frames = slice(&sheet, &GridSpec::new(2, 2, 2, 1)).unwrap();
/// assert_eq!(frames.len(), 2);
/// assert_eq!(frames[1].dimensions(), (2, 2));
/// ```
pub fn slice(image: &RgbaImage, grid: &GridSpec) -> Result<Vec<RgbaImage>, ConvertError> {
    grid.validate()?;

    let rows = grid.playback_rows();
    let mut frames = Vec::with_capacity(grid.columns as usize * rows.len());

    for &row in &rows {
        let src_y = u64::from(row - 1) * u64::from(grid.frame_height);
        for col in 0..grid.columns {
            let src_x = u64::from(col) * u64::from(grid.frame_width);
            frames.push(crop_cell(image, src_x, src_y, grid.frame_width, grid.frame_height));
        }
    }

    log::debug!(
        "sliced {} frames ({} rows x {} columns) from {}x{} sheet",
        frames.len(),
        rows.len(),
        grid.columns,
        image.width(),
        image.height()
    );

    Ok(frames)
}

/// Copy one cell out of the sheet, padding out-of-bounds pixels.
fn crop_cell(image: &RgbaImage, src_x: u64, src_y: u64, width: u32, height: u32) -> RgbaImage {
    let mut frame = RgbaImage::from_pixel(width, height, TRANSPARENT);

    let (sheet_w, sheet_h) = (u64::from(image.width()), u64::from(image.height()));
    if src_x >= sheet_w || src_y >= sheet_h {
        return frame;
    }

    // Both bounded by the sheet dimensions, so they fit in u32
    let copy_w = (sheet_w - src_x).min(u64::from(width)) as u32;
    let copy_h = (sheet_h - src_y).min(u64::from(height)) as u32;
    let (src_x, src_y) = (src_x as u32, src_y as u32);

    for y in 0..copy_h {
        for x in 0..copy_w {
            frame.put_pixel(x, y, *image.get_pixel(src_x + x, src_y + y));
        }
    }
    // Remaining pixels stay transparent (default from from_pixel)

    frame
}

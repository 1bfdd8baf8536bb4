//! Configuration schema types for `sprite2gif.toml`
//!
//! Defines the structure and validation rules for conversion defaults.

use serde::{Deserialize, Serialize};

use crate::convert::ConvertOptions;
use crate::grid::GridSpec;

/// Sprite sheet layout section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Width of one frame in pixels
    #[serde(default = "default_frame_size")]
    pub frame_width: u32,
    /// Height of one frame in pixels
    #[serde(default = "default_frame_size")]
    pub frame_height: u32,
    /// Frames per row
    #[serde(default = "default_columns")]
    pub columns: u32,
    /// Number of rows on the sheet
    #[serde(default = "default_rows")]
    pub rows: u32,
    /// 1-based rows to animate, in playback order (default: all rows)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_rows: Option<Vec<u32>>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            frame_width: default_frame_size(),
            frame_height: default_frame_size(),
            columns: default_columns(),
            rows: default_rows(),
            selected_rows: None,
        }
    }
}

fn default_frame_size() -> u32 {
    256
}

fn default_columns() -> u32 {
    4
}

fn default_rows() -> u32 {
    1
}

/// Animation output section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// Display time per frame in milliseconds
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u32,
    /// Loop count (0 = infinite)
    #[serde(default)]
    pub loop_count: u16,
    /// Play the animation once and stop (no loop extension)
    #[serde(default)]
    pub play_once: bool,
    /// Draw frames as differences from the previous frame
    #[serde(default = "default_true")]
    pub optimize: bool,
    /// Keep transparent areas transparent
    #[serde(default = "default_true")]
    pub transparency: bool,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_duration_ms(),
            loop_count: 0,
            play_once: false,
            optimize: true,
            transparency: true,
        }
    }
}

fn default_duration_ms() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

/// Worker pool settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Number of worker threads (default: one per core)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
}

/// Root configuration structure for `sprite2gif.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprite2GifConfig {
    /// Sprite sheet layout
    #[serde(default)]
    pub grid: GridConfig,
    /// Animation settings
    #[serde(default)]
    pub animation: AnimationConfig,
    /// Worker pool settings
    #[serde(default)]
    pub performance: PerformanceConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "grid.columns")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sprite2gif.toml: '{}' {}", self.field, self.message)
    }
}

impl Sprite2GifConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: String| {
            errors.push(ConfigValidationError { field: field.to_string(), message });
        };

        if self.grid.frame_width == 0 {
            push("grid.frame_width", "must be a positive integer".to_string());
        }
        if self.grid.frame_height == 0 {
            push("grid.frame_height", "must be a positive integer".to_string());
        }
        if self.grid.columns == 0 {
            push("grid.columns", "must be a positive integer".to_string());
        }
        if self.grid.rows == 0 {
            push("grid.rows", "must be a positive integer".to_string());
        }
        if let Some(ref rows) = self.grid.selected_rows {
            if rows.is_empty() {
                push("grid.selected_rows", "must name at least one row".to_string());
            }
            for &row in rows {
                if row == 0 || row > self.grid.rows {
                    push(
                        "grid.selected_rows",
                        format!("row {} is outside 1..={}", row, self.grid.rows),
                    );
                }
            }
        }

        if self.performance.jobs == Some(0) {
            push("performance.jobs", "must be a positive integer".to_string());
        }

        errors
    }

    /// Loop count as the converter expects it.
    pub fn effective_loop_count(&self) -> Option<u16> {
        if self.animation.play_once {
            None
        } else {
            Some(self.animation.loop_count)
        }
    }

    /// Resolve into conversion settings.
    pub fn to_convert_options(&self) -> ConvertOptions {
        let mut grid = GridSpec::new(
            self.grid.frame_width,
            self.grid.frame_height,
            self.grid.columns,
            self.grid.rows,
        );
        if let Some(ref rows) = self.grid.selected_rows {
            grid = grid.with_selected_rows(rows.iter().copied());
        }

        ConvertOptions {
            grid,
            duration_ms: self.animation.duration_ms,
            loop_count: self.effective_loop_count(),
            optimize: self.animation.optimize,
            keep_transparency: self.animation.transparency,
        }
    }
}

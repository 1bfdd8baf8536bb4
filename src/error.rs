//! Error types for sprite sheet conversion

use thiserror::Error;

/// Failure returned by [`crate::convert::convert`].
///
/// No partial output accompanies an error: a conversion either yields a
/// complete GIF buffer or one of these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConvertError {
    /// Grid geometry cannot produce frames (zero sizes, zero columns/rows,
    /// rows outside the grid, or dimensions beyond GIF's 16-bit fields)
    #[error("Invalid grid: {0}")]
    InvalidGridSpec(String),
    /// No rows were selected for the animation
    #[error("No rows selected: select at least one row to animate")]
    EmptyRowSelection,
    /// An internal invariant was violated while packing LZW data
    #[error("GIF encoding failed: {0}")]
    EncodingFailure(String),
}

impl ConvertError {
    pub(crate) fn grid(message: impl Into<String>) -> Self {
        ConvertError::InvalidGridSpec(message.into())
    }

    pub(crate) fn encoding(message: impl Into<String>) -> Self {
        ConvertError::EncodingFailure(message.into())
    }
}

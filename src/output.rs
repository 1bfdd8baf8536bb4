//! Sprite sheet loading, GIF output and file path generation

use image::RgbaImage;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ConvertError;

/// Error type for file-level operations around a conversion
#[derive(Debug)]
pub enum OutputError {
    /// IO error during file operations
    Io(io::Error),
    /// Sprite sheet could not be decoded
    Image(image::ImageError),
    /// The conversion itself failed
    Convert(ConvertError),
}

impl std::fmt::Display for OutputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputError::Io(e) => write!(f, "IO error: {}", e),
            OutputError::Image(e) => write!(f, "Image error: {}", e),
            OutputError::Convert(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for OutputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OutputError::Io(e) => Some(e),
            OutputError::Image(e) => Some(e),
            OutputError::Convert(e) => Some(e),
        }
    }
}

impl From<io::Error> for OutputError {
    fn from(e: io::Error) -> Self {
        OutputError::Io(e)
    }
}

impl From<image::ImageError> for OutputError {
    fn from(e: image::ImageError) -> Self {
        OutputError::Image(e)
    }
}

impl From<ConvertError> for OutputError {
    fn from(e: ConvertError) -> Self {
        OutputError::Convert(e)
    }
}

/// Load a sprite sheet from disk as RGBA.
///
/// Any format the `image` crate can decode is accepted; PNG is the usual case.
pub fn load_sprite_sheet(path: &Path) -> Result<RgbaImage, OutputError> {
    let image = image::open(path)?;
    log::debug!("loaded {} ({}x{})", path.display(), image.width(), image.height());
    Ok(image.to_rgba8())
}

/// Decode a sprite sheet held in memory as RGBA.
pub fn decode_sprite_sheet(bytes: &[u8]) -> Result<RgbaImage, OutputError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Write GIF bytes to a file.
///
/// # Arguments
///
/// * `bytes` - A complete GIF byte stream
/// * `path` - The output file path
///
/// # Returns
///
/// * `Ok(())` on success
/// * `Err(OutputError)` on failure
pub fn save_gif(bytes: &[u8], path: &Path) -> Result<(), OutputError> {
    // Create parent directories if they don't exist
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(path, bytes)?;
    Ok(())
}

/// Generate the output path for a converted sprite sheet.
///
/// | Scenario | Output |
/// |----------|--------|
/// | No `-o` | `{input_dir}/{input_stem}.gif` |
/// | With `-o out.gif` | `out.gif` |
/// | With `-o dir/` | `dir/{input_stem}.gif` |
pub fn generate_output_path(input: &Path, output_arg: Option<&Path>) -> PathBuf {
    let input_stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    let file_name = format!("{}.gif", input_stem);

    match output_arg {
        Some(output) => {
            // Check if output is a directory (ends with / or is existing directory)
            let is_dir = output.as_os_str().to_string_lossy().ends_with('/') || output.is_dir();

            if is_dir {
                output.join(file_name)
            } else {
                output.to_path_buf()
            }
        }
        None => {
            let parent = input.parent().unwrap_or(Path::new(""));
            if parent.as_os_str().is_empty() {
                PathBuf::from(file_name)
            } else {
                parent.join(file_name)
            }
        }
    }
}

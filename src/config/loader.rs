//! Configuration loading and discovery for `sprite2gif.toml`
//!
//! Provides functions to find, load, write, and merge configuration.

use super::schema::Sprite2GifConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name searched for when discovering configuration
pub const CONFIG_FILE_NAME: &str = "sprite2gif.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse sprite2gif.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// TOML serialization error
    #[error("Failed to write sprite2gif.toml: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
    /// Refused to replace an existing file
    #[error("{} already exists (use --force to overwrite)", .0.display())]
    AlreadyExists(PathBuf),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub frame_width: Option<u32>,
    pub frame_height: Option<u32>,
    pub columns: Option<u32>,
    pub rows: Option<u32>,
    /// Rows to animate, in playback order
    pub selected_rows: Option<Vec<u32>>,
    pub duration_ms: Option<u32>,
    pub loop_count: Option<u16>,
    /// Play once instead of looping
    pub play_once: Option<bool>,
    pub optimize: Option<bool>,
    pub transparency: Option<bool>,
    /// Number of parallel jobs
    pub jobs: Option<usize>,
}

/// Find sprite2gif.toml by walking up from the current working directory.
///
/// Search order:
/// 1. Walk up from current directory looking for sprite2gif.toml
/// 2. Check XDG_CONFIG_HOME/sprite2gif/sprite2gif.toml (or ~/.config/sprite2gif/sprite2gif.toml)
pub fn find_config() -> Option<PathBuf> {
    if let Ok(cwd) = env::current_dir() {
        if let Some(path) = find_config_from(cwd) {
            return Some(path);
        }
    }

    find_xdg_config()
}

/// Find sprite2gif.toml in the XDG config directory.
pub fn find_xdg_config() -> Option<PathBuf> {
    let xdg_config = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;

    let config_path = xdg_config.join("sprite2gif").join(CONFIG_FILE_NAME);
    if config_path.exists() {
        Some(config_path)
    } else {
        None
    }
}

/// Find sprite2gif.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate one. With no config file anywhere, returns the defaults.
///
/// # Example
/// ```ignore
/// let config = load_config(None)?;
/// let config = load_config(Some(Path::new("art/sprite2gif.toml")))?;
/// ```
pub fn load_config(path: Option<&Path>) -> Result<Sprite2GifConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => {
            log::debug!("loading config from {}", p.display());
            load_config_file(&p)
        }
        None => Ok(default_config()),
    }
}

fn load_config_file(path: &Path) -> Result<Sprite2GifConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: Sprite2GifConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Configuration used when no sprite2gif.toml is found.
pub fn default_config() -> Sprite2GifConfig {
    Sprite2GifConfig::default()
}

/// Write the default configuration to `path`.
///
/// Fails with [`ConfigError::AlreadyExists`] if the file exists and `force` is false.
pub fn write_default_config(path: &Path, force: bool) -> Result<(), ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists(path.to_path_buf()));
    }

    let contents = toml::to_string_pretty(&default_config())?;
    fs::write(path, contents)?;
    Ok(())
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut Sprite2GifConfig, overrides: &CliOverrides) {
    if let Some(frame_width) = overrides.frame_width {
        config.grid.frame_width = frame_width;
    }
    if let Some(frame_height) = overrides.frame_height {
        config.grid.frame_height = frame_height;
    }
    if let Some(columns) = overrides.columns {
        config.grid.columns = columns;
    }

    // A new row count invalidates a row selection made for the old grid
    if let Some(rows) = overrides.rows {
        if rows != config.grid.rows {
            config.grid.selected_rows = None;
        }
        config.grid.rows = rows;
    }
    if let Some(ref selected) = overrides.selected_rows {
        config.grid.selected_rows = Some(selected.clone());
    }

    if let Some(duration_ms) = overrides.duration_ms {
        config.animation.duration_ms = duration_ms;
    }
    if let Some(loop_count) = overrides.loop_count {
        config.animation.loop_count = loop_count;
        config.animation.play_once = false;
    }
    if let Some(play_once) = overrides.play_once {
        config.animation.play_once = play_once;
    }
    if let Some(optimize) = overrides.optimize {
        config.animation.optimize = optimize;
    }
    if let Some(transparency) = overrides.transparency {
        config.animation.transparency = transparency;
    }

    if let Some(jobs) = overrides.jobs {
        config.performance.jobs = Some(jobs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(path: &Path, contents: &[u8]) {
        File::create(path)
            .expect("should create config file")
            .write_all(contents)
            .expect("should write config content");
    }

    #[test]
    fn test_find_config_in_current_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        write_file(&config_path, b"[grid]\ncolumns = 2");

        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        write_file(&config_path, b"[grid]\ncolumns = 2");

        let subdir = temp.path().join("art").join("characters");
        fs::create_dir_all(&subdir).expect("should create subdirectories");

        let found = find_config_from(subdir);
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_not_found() {
        let temp = TempDir::new().expect("should create temp dir");
        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, None);
    }

    #[test]
    #[serial]
    fn test_find_xdg_config() {
        let temp = TempDir::new().expect("should create temp dir");
        let dir = temp.path().join("sprite2gif");
        fs::create_dir_all(&dir).expect("should create xdg dir");
        let config_path = dir.join(CONFIG_FILE_NAME);
        write_file(&config_path, b"");

        let previous = env::var_os("XDG_CONFIG_HOME");
        env::set_var("XDG_CONFIG_HOME", temp.path());
        let found = find_xdg_config();
        match previous {
            Some(value) => env::set_var("XDG_CONFIG_HOME", value),
            None => env::remove_var("XDG_CONFIG_HOME"),
        }

        assert_eq!(found, Some(config_path));
    }

    #[test]
    #[serial]
    fn test_find_xdg_config_missing() {
        let temp = TempDir::new().expect("should create temp dir");

        let previous = env::var_os("XDG_CONFIG_HOME");
        env::set_var("XDG_CONFIG_HOME", temp.path());
        let found = find_xdg_config();
        match previous {
            Some(value) => env::set_var("XDG_CONFIG_HOME", value),
            None => env::remove_var("XDG_CONFIG_HOME"),
        }

        assert_eq!(found, None);
    }

    #[test]
    fn test_load_config_from_file() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        write_file(
            &config_path,
            br#"
[grid]
frame_width = 32
frame_height = 48
columns = 6

[animation]
duration_ms = 120
play_once = true
"#,
        );

        let config = load_config(Some(&config_path)).expect("should load valid config");
        assert_eq!(config.grid.frame_width, 32);
        assert_eq!(config.grid.frame_height, 48);
        assert_eq!(config.grid.columns, 6);
        assert_eq!(config.grid.rows, 1);
        assert_eq!(config.animation.duration_ms, 120);
        assert_eq!(config.effective_loop_count(), None);
    }

    #[test]
    fn test_load_config_missing_file_errors() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join("nonexistent.toml");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        write_file(&config_path, b"this is not valid toml {{{");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_validation_error() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        write_file(&config_path, b"[grid]\nframe_height = 0\n");

        let result = load_config(Some(&config_path));
        match result {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].contains("grid.frame_height"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_write_default_config() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE_NAME);

        write_default_config(&config_path, false).expect("should write config");
        let config = load_config(Some(&config_path)).expect("written config should load");
        assert_eq!(config, default_config());
    }

    #[test]
    fn test_write_default_config_refuses_overwrite() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        write_file(&config_path, b"[grid]\ncolumns = 9\n");

        let result = write_default_config(&config_path, false);
        assert!(matches!(result, Err(ConfigError::AlreadyExists(_))));
        assert_eq!(
            fs::read_to_string(&config_path).expect("should read config"),
            "[grid]\ncolumns = 9\n"
        );

        write_default_config(&config_path, true).expect("force should overwrite");
        let config = load_config(Some(&config_path)).expect("should load config");
        assert_eq!(config.grid.columns, 4);
    }

    #[test]
    fn test_merge_cli_overrides_grid() {
        let mut config = default_config();
        let overrides = CliOverrides {
            frame_width: Some(64),
            frame_height: Some(32),
            columns: Some(8),
            ..Default::default()
        };

        merge_cli_overrides(&mut config, &overrides);
        assert_eq!(config.grid.frame_width, 64);
        assert_eq!(config.grid.frame_height, 32);
        assert_eq!(config.grid.columns, 8);
    }

    #[test]
    fn test_merge_cli_overrides_rows_resets_selection() {
        let mut config = default_config();
        config.grid.rows = 4;
        config.grid.selected_rows = Some(vec![4]);

        let overrides = CliOverrides { rows: Some(2), ..Default::default() };
        merge_cli_overrides(&mut config, &overrides);

        assert_eq!(config.grid.rows, 2);
        assert_eq!(config.grid.selected_rows, None);
    }

    #[test]
    fn test_merge_cli_overrides_rows_with_selection() {
        let mut config = default_config();
        let overrides =
            CliOverrides { rows: Some(3), selected_rows: Some(vec![3, 1]), ..Default::default() };

        merge_cli_overrides(&mut config, &overrides);
        assert_eq!(config.grid.rows, 3);
        assert_eq!(config.grid.selected_rows, Some(vec![3, 1]));
    }

    #[test]
    fn test_merge_cli_overrides_loop_clears_play_once() {
        let mut config = default_config();
        config.animation.play_once = true;

        let overrides = CliOverrides { loop_count: Some(5), ..Default::default() };
        merge_cli_overrides(&mut config, &overrides);

        assert_eq!(config.effective_loop_count(), Some(5));
    }

    #[test]
    fn test_merge_cli_overrides_flags() {
        let mut config = default_config();
        let overrides = CliOverrides {
            duration_ms: Some(40),
            play_once: Some(true),
            optimize: Some(false),
            transparency: Some(false),
            jobs: Some(2),
            ..Default::default()
        };

        merge_cli_overrides(&mut config, &overrides);
        assert_eq!(config.animation.duration_ms, 40);
        assert!(config.animation.play_once);
        assert!(!config.animation.optimize);
        assert!(!config.animation.transparency);
        assert_eq!(config.performance.jobs, Some(2));
    }
}

//! Init command implementation

use std::path::Path;
use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_SUCCESS};
use crate::config::loader::{self, CONFIG_FILE_NAME};

/// Execute the init command
pub fn run_init(path: Option<&Path>, force: bool) -> ExitCode {
    let path = path.unwrap_or(Path::new(CONFIG_FILE_NAME));

    match loader::write_default_config(path, force) {
        Ok(()) => {
            println!("Created: {}", path.display());
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

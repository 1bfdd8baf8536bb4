//! Sprite2GIF - Command-line tool for converting sprite sheets into animated GIFs

use std::process::ExitCode;

use sprite2gif::cli;

fn main() -> ExitCode {
    cli::run()
}

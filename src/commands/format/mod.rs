mod execute;
mod output;

pub use execute::FormatResult;

use std::path::PathBuf;

use clap::Args;

use super::validate_file_exists;

/// Print or rewrite an SDL file in canonical form
#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  sdl_engine format -f schema.sdl            # Print canonical SDL
  sdl_engine format -f schema.sdl --write    # Rewrite the file in place")]
pub struct FormatCmd {
    /// Path to the SDL file
    #[arg(short, long, value_parser = validate_file_exists)]
    pub file: PathBuf,

    /// Rewrite the file instead of printing it
    #[arg(long, default_value_t = false)]
    pub write: bool,
}

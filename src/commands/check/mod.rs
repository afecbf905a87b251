mod execute;
mod output;

pub use execute::{CheckResult, EntitySummary};

use std::path::PathBuf;

use clap::Args;

use super::validate_file_exists;

/// Parse an SDL file and report its entities, relations and errors
#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  sdl_engine check -f schema.sdl            # Summarize entities and relations
  sdl_engine check -f schema.sdl -o json    # Full report as JSON")]
pub struct CheckCmd {
    /// Path to the SDL file
    #[arg(short, long, value_parser = validate_file_exists)]
    pub file: PathBuf,
}

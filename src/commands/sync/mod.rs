mod execute;
mod output;

pub use execute::SyncResult;

use std::path::PathBuf;

use clap::Args;

use super::validate_file_exists;

/// Replace a data model's schema with the contents of an SDL file
#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  sdl_engine sync -m <model-id> -f schema.sdl --principal alice
  sdl_engine sync --model <model-id> --file schema.sdl -o json

The whole stored schema is replaced in one transaction. Invalid SDL is
rejected with its diagnostics and nothing is written.")]
pub struct SyncCmd {
    /// Id of the data model to replace
    #[arg(short, long)]
    pub model: String,

    /// Path to the SDL file
    #[arg(short, long, value_parser = validate_file_exists)]
    pub file: PathBuf,
}

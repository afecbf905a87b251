mod cli_tests;
mod execute;
mod output;

pub use execute::{ShowResult, ShownEntity};

use clap::Args;

/// Show the persisted schema of a data model
#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  sdl_engine show -m <model-id>               # Entities, fields and relations
  sdl_engine show -m <model-id> --sdl         # Canonical SDL of the stored schema
  sdl_engine show -m <model-id> -o json       # Full projection as JSON")]
pub struct ShowCmd {
    /// Id of the data model
    #[arg(short, long)]
    pub model: String,

    /// Render the stored schema as canonical SDL
    #[arg(long, default_value_t = false)]
    pub sdl: bool,
}

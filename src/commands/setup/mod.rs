mod cli_tests;
mod execute;
mod output;
mod output_tests;

pub use execute::{RelationState, SetupRelation, SetupResult};

use clap::Args;

/// Create the schema store relations
#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  sdl_engine setup                           # Create relations in the default store
  sdl_engine setup --db ./models.sqlite      # Create relations in a specific store
  sdl_engine setup --dry-run                 # Show what would be created")]
pub struct SetupCmd {
    /// Show what would be created without doing it
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

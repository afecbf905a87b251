mod execute;
mod output;

pub use execute::NewModelResult;

use clap::Args;

/// Create an empty data model owned by the principal
#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  sdl_engine new-model -n Blog --principal alice
  SDL_ENGINE_PRINCIPAL=alice sdl_engine new-model --name Shop -o json")]
pub struct NewModelCmd {
    /// Human-readable name of the data model
    #[arg(short, long)]
    pub name: String,
}

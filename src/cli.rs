//! CLI argument definitions.
//!
//! This module contains the top-level CLI structure and the resolution of
//! global options. Individual command definitions are in the `commands`
//! module.

use clap::Parser;
use std::error::Error;

use crate::commands::{Command, Context};
use crate::config::ConfigFile;
use crate::output::OutputFormat;
use crate::store::DatabaseConfig;

/// Environment variable consulted when `--principal` is not given.
pub const PRINCIPAL_ENV: &str = "SDL_ENGINE_PRINCIPAL";

#[derive(Parser, Debug)]
#[command(author, version, about = "Parse, format and persist SDL data models", long_about = None)]
pub struct Args {
    /// Database URL or path (`:memory:`, `sqlite://...`, `postgres://...`)
    ///
    /// If not specified, uses `.sdl_engine.json`, then `DATABASE_URL`, then
    /// the first existing of:
    ///   1. .sdl_engine/schema.sqlite (project-local)
    ///   2. ~/.sdl_engine/schema.sqlite (user-global)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,

    /// Principal performing the operation (owner of data models)
    #[arg(long, global = true)]
    pub principal: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    /// Resolve global options into an execution context.
    pub fn context(&self) -> Result<Context, Box<dyn Error>> {
        let config_file = ConfigFile::load_optional()?;

        let db = DatabaseConfig::resolve(self.db.as_deref(), config_file.as_ref())?;

        let principal = resolve_principal(
            self.principal.clone(),
            std::env::var(PRINCIPAL_ENV).ok(),
            config_file.and_then(|c| c.principal),
        );

        Ok(Context { db, principal })
    }
}

/// Pick the first non-blank principal: flag, environment, config file.
pub fn resolve_principal(
    flag: Option<String>,
    env: Option<String>,
    config: Option<String>,
) -> Option<String> {
    [flag, env, config]
        .into_iter()
        .flatten()
        .map(|p| p.trim().to_string())
        .find(|p| !p.is_empty())
}

//! Command definitions and implementations.
//!
//! Each command is defined in its own module with:
//! - `mod.rs`: the command struct with clap attributes for CLI parsing
//! - `execute.rs`: the [`Execute`] implementation and its result type
//! - `output.rs`: the [`Outputable`] implementation for the result
//! - `cli_tests.rs` / `output_tests.rs`: parsing and formatting tests

mod check;
mod format;
mod new_model;
mod setup;
mod show;
mod sync;

pub use check::CheckCmd;
pub use format::FormatCmd;
pub use new_model::NewModelCmd;
pub use setup::SetupCmd;
pub use show::ShowCmd;
pub use sync::SyncCmd;

use clap::Subcommand;
use std::error::Error;
use std::path::PathBuf;

use crate::output::{OutputFormat, Outputable};
use crate::store::{DatabaseConfig, SchemaStore};
use crate::sync::SyncError;

/// Resolved global options shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub db: DatabaseConfig,
    pub principal: Option<String>,
}

impl Context {
    pub fn connect(&self) -> Result<Box<dyn SchemaStore>, Box<dyn Error>> {
        self.db.connect()
    }

    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    /// The principal, or `Unauthenticated` when none was configured.
    pub fn require_principal(&self) -> Result<&str, SyncError> {
        self.principal().ok_or(SyncError::Unauthenticated)
    }
}

/// Trait for executing commands with command-specific result types.
pub trait Execute {
    type Output: Outputable;

    fn execute(self, ctx: &Context) -> Result<Self::Output, Box<dyn Error>>;
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse an SDL file and report entities, relations and errors
    Check(CheckCmd),

    /// Print or rewrite an SDL file in canonical form
    Format(FormatCmd),

    /// Create the schema store relations
    Setup(SetupCmd),

    /// Create an empty data model owned by the principal
    NewModel(NewModelCmd),

    /// Replace a data model's schema with the contents of an SDL file
    Sync(SyncCmd),

    /// Show the persisted schema of a data model
    Show(ShowCmd),
}

impl Command {
    /// Execute the command and return formatted output
    pub fn run(self, ctx: &Context, format: OutputFormat) -> Result<String, Box<dyn Error>> {
        match self {
            Command::Check(cmd) => {
                let result = cmd.execute(ctx)?;
                Ok(result.format(format))
            }
            Command::Format(cmd) => {
                let result = cmd.execute(ctx)?;
                Ok(result.format(format))
            }
            Command::Setup(cmd) => {
                let result = cmd.execute(ctx)?;
                Ok(result.format(format))
            }
            Command::NewModel(cmd) => {
                let result = cmd.execute(ctx)?;
                Ok(result.format(format))
            }
            Command::Sync(cmd) => {
                let result = cmd.execute(ctx)?;
                Ok(result.format(format))
            }
            Command::Show(cmd) => {
                let result = cmd.execute(ctx)?;
                Ok(result.format(format))
            }
        }
    }
}

/// Clap value parser rejecting paths that do not exist.
pub(crate) fn validate_file_exists(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if path.exists() {
        Ok(path)
    } else {
        Err(format!("File not found: {}", path.display()))
    }
}

/// Read an SDL source file, naming the path on failure.
pub(crate) fn read_source(path: &std::path::Path) -> Result<String, Box<dyn Error>> {
    std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e).into())
}

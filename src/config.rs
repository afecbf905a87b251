//! Configuration file handling.
//!
//! Loads `.sdl_engine.json` from the current directory. Both keys are
//! optional:
//!
//! ```json
//! {
//!   "database": { "type": "sqlite", "path": ".sdl_engine/schema.sqlite" },
//!   "principal": "alice"
//! }
//! ```
//!
//! `database.type` is one of `sqlite` (with `path`), `memory`, or `postgres`
//! (with `connection_string`).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::store::DatabaseConfig;

pub const CONFIG_FILE_NAME: &str = ".sdl_engine.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {message}")]
    Parse { path: String, message: String },
}

/// Top-level configuration file structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub database: Option<DatabaseConfigFile>,

    /// Principal used when neither `--principal` nor the environment sets one.
    #[serde(default)]
    pub principal: Option<String>,
}

/// Database configuration variants, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DatabaseConfigFile {
    Sqlite {
        path: PathBuf,
    },
    #[serde(rename = "memory")]
    Mem,
    Postgres {
        connection_string: String,
    },
}

impl ConfigFile {
    /// Load `.sdl_engine.json` from the current directory, if present.
    pub fn load_optional() -> Result<Option<Self>, ConfigError> {
        let path = PathBuf::from(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

impl DatabaseConfigFile {
    pub fn to_database_config(&self) -> DatabaseConfig {
        match self {
            Self::Sqlite { path } => DatabaseConfig::CozoSqlite { path: path.clone() },
            Self::Mem => DatabaseConfig::CozoMem,
            Self::Postgres { connection_string } => DatabaseConfig::Postgres {
                connection_string: connection_string.clone(),
            },
        }
    }
}

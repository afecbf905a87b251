//! Shared test utilities for execute and store tests.

use std::io::Write;
use std::sync::{Mutex, OnceLock};

use tempfile::{NamedTempFile, TempDir};

use crate::commands::Context;
use crate::store::DatabaseConfig;

/// A small valid schema with a forward reference and an array relation.
pub const BLOG_SDL: &str = "\
entity User {
  id: ID @primary
  email: email @unique
  posts: Post[]
}

entity Post {
  id: ID @primary
  author: User @nullable(false)
  status: enum(draft,published) @default(draft)
}
";

/// Serializes tests that touch process-global state (current directory, env vars).
pub fn test_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Create a temporary `.sdl` file containing the given content.
pub fn create_temp_sdl_file(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".sdl")
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write temp file");
    file
}

/// A context backed by a fresh SQLite store inside a temp directory.
///
/// The directory must outlive the context.
pub fn sqlite_context(principal: Option<&str>) -> (TempDir, Context) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let ctx = Context {
        db: DatabaseConfig::CozoSqlite {
            path: dir.path().join("schema.sqlite"),
        },
        principal: principal.map(String::from),
    };
    (dir, ctx)
}

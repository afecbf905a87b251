//! sdl_engine library - schema definition language engine
//!
//! Parses and canonically re-serializes SDL data model schemas, and replaces
//! a data model's persisted schema transactionally in a CozoDB or
//! PostgreSQL store.

pub mod cli;
pub mod commands;
pub mod config;
pub mod output;
pub mod sdl;
pub mod store;
pub mod sync;

#[macro_use]
pub mod test_macros;

#[cfg(test)]
pub mod test_utils;

//! Persistence of normalized schemas.
//!
//! A data model's schema is stored as a projection over four relations:
//! `data_models`, `sdl_entities`, `sdl_fields` and `sdl_relations`. Fields
//! reference entities and relations reference fields, so deletes run
//! relations first and inserts run entities first.
//!
//! # Backends
//!
//! - CozoDB with SQLite storage (default, on disk)
//! - CozoDB in memory (tests, `:memory:`)
//! - PostgreSQL with real foreign keys
//!
//! Every multi-step write goes through a [`SchemaTransaction`]. Dropping a
//! transaction without calling [`SchemaTransaction::commit`] rolls it back.

mod config;
mod cozo;
mod postgres;
mod records;

pub use config::{default_db_path, DatabaseConfig, DEFAULT_DB_PATH};
pub use cozo::CozoStore;
pub use postgres::PostgresStore;
pub use records::{
    DataModelRecord, EntityRecord, FieldRecord, PersistedSchema, RelationRecord, TypeKind,
};

use serde::Serialize;
use thiserror::Error;

/// Relations created by [`SchemaStore::setup`], in dependency order.
pub const RELATION_NAMES: [&str; 4] = ["data_models", "sdl_entities", "sdl_fields", "sdl_relations"];

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open database '{path}': {message}")]
    OpenFailed { path: String, message: String },

    #[error("Query failed: {message}")]
    QueryFailed { message: String },

    #[error("Schema creation failed for '{relation}': {message}")]
    SchemaCreationFailed { relation: String, message: String },

    #[error("Malformed {record} row: {message}")]
    Decode {
        record: &'static str,
        message: String,
    },

    #[error("Data model '{id}' does not exist")]
    MissingDataModel { id: String },

    #[error("Transaction failed: {message}")]
    TransactionFailed { message: String },
}

/// Outcome of creating one relation during setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationStatus {
    pub relation: String,
    pub created: bool,
}

/// Rows removed while clearing a data model's projection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClearCounts {
    pub relations: usize,
    pub fields: usize,
    pub entities: usize,
}

/// Generate a fresh record identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Backing store for data models and their schema projections.
pub trait SchemaStore: Send + Sync {
    /// Backend name for logging and output.
    fn backend_name(&self) -> &'static str;

    /// Create any missing relations. Safe to call repeatedly.
    fn setup(&self) -> Result<Vec<RelationStatus>, StoreError>;

    /// Register a new, empty data model owned by `owner`.
    fn create_data_model(&self, owner: &str, name: &str) -> Result<DataModelRecord, StoreError>;

    fn find_data_model(&self, id: &str) -> Result<Option<DataModelRecord>, StoreError>;

    /// Read the committed projection, entities and fields ordered by position.
    fn load_projection(&self, data_model_id: &str) -> Result<PersistedSchema, StoreError>;

    /// Open a write transaction.
    fn begin(&self) -> Result<Box<dyn SchemaTransaction + '_>, StoreError>;
}

/// Scoped write transaction. Rolled back on drop unless committed.
pub trait SchemaTransaction {
    /// Store the SDL source on the data model and bump its revision.
    ///
    /// Returns the new revision.
    fn record_source(&mut self, data_model_id: &str, sdl_text: &str) -> Result<i64, StoreError>;

    fn delete_relations(&mut self, data_model_id: &str) -> Result<usize, StoreError>;

    /// Delete every field belonging to the data model's entities.
    fn delete_fields(&mut self, data_model_id: &str) -> Result<usize, StoreError>;

    fn delete_entities(&mut self, data_model_id: &str) -> Result<usize, StoreError>;

    fn insert_entity(&mut self, entity: &EntityRecord) -> Result<(), StoreError>;

    fn insert_field(&mut self, field: &FieldRecord) -> Result<(), StoreError>;

    fn insert_relation(&mut self, relation: &RelationRecord) -> Result<(), StoreError>;

    fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

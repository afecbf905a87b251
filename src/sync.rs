//! Transactional replacement of a data model's persisted schema.
//!
//! Every successful call swaps the whole projection: the previous entities,
//! fields and relations are deleted and the new ones inserted inside one
//! store transaction. A failure at any step leaves the previous projection
//! untouched.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::sdl::{self, Diagnostic, Relation, Schema};
use crate::store::{
    new_id, ClearCounts, DataModelRecord, EntityRecord, FieldRecord, PersistedSchema,
    RelationRecord, SchemaStore, StoreError,
};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("No authenticated principal")]
    Unauthenticated,

    #[error("Data model '{id}' not found")]
    NotFound { id: String },

    #[error("Data model '{id}' belongs to another principal")]
    Forbidden { id: String },

    #[error("Schema has {} error(s)", .errors.len())]
    InvalidSchema { errors: Vec<Diagnostic> },

    #[error("Failed to persist schema: {message}")]
    PersistenceFailure { message: String },
}

impl From<StoreError> for SyncError {
    fn from(e: StoreError) -> Self {
        Self::PersistenceFailure {
            message: e.to_string(),
        }
    }
}

/// A derived relation that could not be stored because an endpoint did not
/// resolve to a persisted field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedRelation {
    pub relation: Relation,
    pub reason: String,
}

impl fmt::Display for DroppedRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.relation, self.reason)
    }
}

/// Result of a committed replace.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub data_model_id: String,
    pub revision: i64,
    pub persisted: PersistedSchema,
    pub schema: Schema,
    pub cleared: ClearCounts,
    pub dropped_relations: Vec<DroppedRelation>,
}

/// A data model together with its committed projection.
#[derive(Debug, Clone, Serialize)]
pub struct LoadedModel {
    pub model: DataModelRecord,
    pub persisted: PersistedSchema,
}

/// Check that `principal` may modify `data_model_id`.
///
/// Runs before any transaction is opened, so a refusal never mutates.
pub fn authorize(
    store: &dyn SchemaStore,
    principal: Option<&str>,
    data_model_id: &str,
) -> Result<DataModelRecord, SyncError> {
    let principal = principal
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or(SyncError::Unauthenticated)?;

    let model = store
        .find_data_model(data_model_id)?
        .ok_or_else(|| SyncError::NotFound {
            id: data_model_id.to_string(),
        })?;

    if model.owner != principal {
        warn!(data_model_id, principal, "refusing access to data model owned by another principal");
        return Err(SyncError::Forbidden {
            id: data_model_id.to_string(),
        });
    }

    Ok(model)
}

/// Parse `sdl_text` and, if it is valid, replace the stored schema with it.
///
/// The raw text is recorded as the data model's source.
pub fn save_schema_text(
    store: &dyn SchemaStore,
    principal: Option<&str>,
    data_model_id: &str,
    sdl_text: &str,
) -> Result<SyncOutcome, SyncError> {
    let model = authorize(store, principal, data_model_id)?;

    let schema = sdl::parse(sdl_text);
    if !schema.is_valid() {
        debug!(data_model_id, errors = schema.errors.len(), "rejecting invalid schema text");
        return Err(SyncError::InvalidSchema {
            errors: schema.errors,
        });
    }

    persist(store, &model, schema, sdl_text)
}

/// Replace the stored schema with an already parsed one.
///
/// The canonical rendering of `schema` is recorded as the source.
pub fn replace_schema(
    store: &dyn SchemaStore,
    principal: Option<&str>,
    data_model_id: &str,
    schema: &Schema,
) -> Result<SyncOutcome, SyncError> {
    let model = authorize(store, principal, data_model_id)?;

    if !schema.is_valid() {
        return Err(SyncError::InvalidSchema {
            errors: schema.errors.clone(),
        });
    }

    let text = sdl::serialize(schema);
    persist(store, &model, schema.clone(), &text)
}

/// Load the committed projection of a data model owned by `principal`.
pub fn load_schema(
    store: &dyn SchemaStore,
    principal: Option<&str>,
    data_model_id: &str,
) -> Result<LoadedModel, SyncError> {
    let model = authorize(store, principal, data_model_id)?;
    let persisted = store.load_projection(data_model_id)?;
    Ok(LoadedModel { model, persisted })
}

fn persist(
    store: &dyn SchemaStore,
    model: &DataModelRecord,
    schema: Schema,
    sdl_text: &str,
) -> Result<SyncOutcome, SyncError> {
    let data_model_id = model.id.as_str();
    let mut tx = store.begin()?;

    // Locks the data model row before anything else is touched.
    let revision = tx.record_source(data_model_id, sdl_text)?;

    let cleared = ClearCounts {
        relations: tx.delete_relations(data_model_id)?,
        fields: tx.delete_fields(data_model_id)?,
        entities: tx.delete_entities(data_model_id)?,
    };
    debug!(data_model_id, ?cleared, "cleared previous projection");

    let mut persisted = PersistedSchema {
        data_model_id: data_model_id.to_string(),
        ..PersistedSchema::default()
    };
    let mut field_ids: HashMap<(&str, &str), (String, String)> = HashMap::new();

    for (position, entity) in schema.entities.iter().enumerate() {
        let entity_record = EntityRecord {
            id: new_id(),
            data_model_id: data_model_id.to_string(),
            name: entity.name.clone(),
            position: position as i64,
        };
        tx.insert_entity(&entity_record)?;

        for (field_position, field) in entity.fields.iter().enumerate() {
            let field_record =
                FieldRecord::from_field(new_id(), &entity_record.id, field_position, field);
            tx.insert_field(&field_record)?;

            field_ids.insert(
                (entity.name.as_str(), field.name.as_str()),
                (entity_record.id.clone(), field_record.id.clone()),
            );
            persisted.fields.push(field_record);
        }

        persisted.entities.push(entity_record);
    }

    let mut dropped_relations = Vec::new();
    for relation in schema.relations() {
        let from = field_ids.get(&(relation.from_entity.as_str(), relation.from_field.as_str()));
        let to = field_ids.get(&(relation.to_entity.as_str(), relation.to_field.as_str()));

        let ((from_entity_id, from_field_id), (to_entity_id, to_field_id)) = match (from, to) {
            (Some(from), Some(to)) => (from, to),
            (None, _) => {
                dropped_relations.push(drop_relation(relation, "source field was not persisted"));
                continue;
            }
            (_, None) => {
                let reason = format!(
                    "target {}.{} was not persisted",
                    relation.to_entity, relation.to_field
                );
                dropped_relations.push(drop_relation(relation, &reason));
                continue;
            }
        };

        let record = RelationRecord {
            id: new_id(),
            data_model_id: data_model_id.to_string(),
            position: persisted.relations.len() as i64,
            from_entity_id: from_entity_id.clone(),
            from_field_id: from_field_id.clone(),
            to_entity_id: to_entity_id.clone(),
            to_field_id: to_field_id.clone(),
            cardinality: relation.cardinality,
            is_nullable: relation.is_nullable,
        };
        tx.insert_relation(&record)?;
        persisted.relations.push(record);
    }

    tx.commit()?;

    info!(
        data_model_id,
        revision,
        entities = persisted.entities.len(),
        fields = persisted.fields.len(),
        relations = persisted.relations.len(),
        dropped = dropped_relations.len(),
        "replaced schema"
    );

    Ok(SyncOutcome {
        data_model_id: data_model_id.to_string(),
        revision,
        persisted,
        schema,
        cleared,
        dropped_relations,
    })
}

fn drop_relation(relation: Relation, reason: &str) -> DroppedRelation {
    warn!(relation = %relation, reason, "dropping unresolved relation");
    DroppedRelation {
        relation,
        reason: reason.to_string(),
    }
}

//! PostgreSQL store.
//!
//! Uses plain relational tables with foreign keys. The client is a
//! synchronous `postgres::Client` guarded by a mutex; an open transaction
//! holds the guard until it commits or is dropped.

use std::sync::{LazyLock, Mutex, MutexGuard};

use postgres::{Client, NoTls, Row};
use regex::Regex;
use tracing::{debug, warn};

use super::records::{DataModelRecord, EntityRecord, FieldRecord, PersistedSchema, RelationRecord, TypeKind};
use super::{new_id, RelationStatus, SchemaStore, SchemaTransaction, StoreError, RELATION_NAMES};
use crate::sdl::Cardinality;

const CREATE_DATA_MODELS: &str = "
CREATE TABLE IF NOT EXISTS data_models (
    id TEXT PRIMARY KEY,
    owner TEXT NOT NULL,
    name TEXT NOT NULL,
    sdl_text TEXT NOT NULL DEFAULT '',
    revision BIGINT NOT NULL DEFAULT 0
)";

const CREATE_ENTITIES: &str = "
CREATE TABLE IF NOT EXISTS sdl_entities (
    id TEXT PRIMARY KEY,
    data_model_id TEXT NOT NULL REFERENCES data_models(id),
    name TEXT NOT NULL,
    position BIGINT NOT NULL
)";

const CREATE_FIELDS: &str = "
CREATE TABLE IF NOT EXISTS sdl_fields (
    id TEXT PRIMARY KEY,
    entity_id TEXT NOT NULL REFERENCES sdl_entities(id),
    name TEXT NOT NULL,
    position BIGINT NOT NULL,
    type_kind TEXT NOT NULL,
    type_name TEXT NOT NULL,
    referenced_field TEXT,
    enum_values TEXT[] NOT NULL DEFAULT '{}',
    is_array BOOLEAN NOT NULL,
    is_primary BOOLEAN NOT NULL,
    is_unique BOOLEAN NOT NULL,
    is_index BOOLEAN NOT NULL,
    is_nullable BOOLEAN NOT NULL,
    default_value TEXT
)";

const CREATE_RELATIONS: &str = "
CREATE TABLE IF NOT EXISTS sdl_relations (
    id TEXT PRIMARY KEY,
    data_model_id TEXT NOT NULL REFERENCES data_models(id),
    position BIGINT NOT NULL,
    from_entity_id TEXT NOT NULL REFERENCES sdl_entities(id),
    from_field_id TEXT NOT NULL REFERENCES sdl_fields(id),
    to_entity_id TEXT NOT NULL REFERENCES sdl_entities(id),
    to_field_id TEXT NOT NULL REFERENCES sdl_fields(id),
    cardinality TEXT NOT NULL,
    is_nullable BOOLEAN NOT NULL
)";

/// Schema store backed by PostgreSQL.
pub struct PostgresStore {
    client: Mutex<Client>,
}

impl PostgresStore {
    /// Connect using a `postgres://` connection string.
    pub fn connect(connection_string: &str) -> Result<Self, StoreError> {
        let client = Client::connect(connection_string, NoTls).map_err(|e| StoreError::OpenFailed {
            path: redact(connection_string),
            message: e.to_string(),
        })?;
        Ok(Self {
            client: Mutex::new(client),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Client>, StoreError> {
        self.client.lock().map_err(|e| StoreError::QueryFailed {
            message: format!("Failed to acquire client lock: {}", e),
        })
    }
}

static PASSWORD_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bpassword\s*=\s*('(?:[^'\\]|\\.)*'|[^\s&]*)").expect("valid password regex")
});

/// Strip the password from a connection string before it reaches an error.
///
/// Handles URL credentials (`user:secret@host`) and key-value or query
/// parameters (`password=secret`).
fn redact(connection_string: &str) -> String {
    let without_credentials = redact_url_credentials(connection_string);
    PASSWORD_PARAM
        .replace_all(&without_credentials, "password=***")
        .into_owned()
}

fn redact_url_credentials(connection_string: &str) -> String {
    match (connection_string.find("://"), connection_string.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            let credentials = &connection_string[scheme_end + 3..at];
            let user = credentials.split(':').next().unwrap_or_default();
            format!(
                "{}{}@{}",
                &connection_string[..scheme_end + 3],
                user,
                &connection_string[at + 1..]
            )
        }
        _ => connection_string.to_string(),
    }
}

fn query_error(e: postgres::Error) -> StoreError {
    StoreError::QueryFailed {
        message: e.to_string(),
    }
}

impl SchemaStore for PostgresStore {
    fn backend_name(&self) -> &'static str {
        "Postgres"
    }

    fn setup(&self) -> Result<Vec<RelationStatus>, StoreError> {
        let mut client = self.lock()?;
        let scripts = [CREATE_DATA_MODELS, CREATE_ENTITIES, CREATE_FIELDS, CREATE_RELATIONS];
        let mut statuses = Vec::new();

        for (name, script) in RELATION_NAMES.into_iter().zip(scripts) {
            let exists: bool = client
                .query_one(
                    "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
                     WHERE table_schema = current_schema() AND table_name = $1)",
                    &[&name],
                )
                .map_err(query_error)?
                .get(0);

            if !exists {
                client
                    .batch_execute(script)
                    .map_err(|e| StoreError::SchemaCreationFailed {
                        relation: name.to_string(),
                        message: e.to_string(),
                    })?;
            }
            debug!(relation = name, created = !exists, "postgres setup");
            statuses.push(RelationStatus {
                relation: name.to_string(),
                created: !exists,
            });
        }

        Ok(statuses)
    }

    fn create_data_model(&self, owner: &str, name: &str) -> Result<DataModelRecord, StoreError> {
        let record = DataModelRecord {
            id: new_id(),
            owner: owner.to_string(),
            name: name.to_string(),
            sdl_text: String::new(),
            revision: 0,
        };

        self.lock()?
            .execute(
                "INSERT INTO data_models (id, owner, name) VALUES ($1, $2, $3)",
                &[&record.id, &record.owner, &record.name],
            )
            .map_err(query_error)?;

        Ok(record)
    }

    fn find_data_model(&self, id: &str) -> Result<Option<DataModelRecord>, StoreError> {
        let row = self
            .lock()?
            .query_opt(
                "SELECT id, owner, name, sdl_text, revision FROM data_models WHERE id = $1",
                &[&id],
            )
            .map_err(query_error)?;

        Ok(row.map(|row| DataModelRecord {
            id: row.get(0),
            owner: row.get(1),
            name: row.get(2),
            sdl_text: row.get(3),
            revision: row.get(4),
        }))
    }

    fn load_projection(&self, data_model_id: &str) -> Result<PersistedSchema, StoreError> {
        let mut client = self.lock()?;

        let entities = client
            .query(
                "SELECT id, data_model_id, name, position FROM sdl_entities \
                 WHERE data_model_id = $1 ORDER BY position",
                &[&data_model_id],
            )
            .map_err(query_error)?
            .iter()
            .map(|row| EntityRecord {
                id: row.get(0),
                data_model_id: row.get(1),
                name: row.get(2),
                position: row.get(3),
            })
            .collect();

        let fields = client
            .query(
                "SELECT f.id, f.entity_id, f.name, f.position, f.type_kind, f.type_name, \
                        f.referenced_field, f.enum_values, f.is_array, f.is_primary, \
                        f.is_unique, f.is_index, f.is_nullable, f.default_value \
                 FROM sdl_fields f JOIN sdl_entities e ON e.id = f.entity_id \
                 WHERE e.data_model_id = $1 ORDER BY e.position, f.position",
                &[&data_model_id],
            )
            .map_err(query_error)?
            .iter()
            .map(decode_field)
            .collect::<Result<Vec<_>, StoreError>>()?;

        let relations = client
            .query(
                "SELECT id, data_model_id, position, from_entity_id, from_field_id, \
                        to_entity_id, to_field_id, cardinality, is_nullable \
                 FROM sdl_relations WHERE data_model_id = $1 ORDER BY position",
                &[&data_model_id],
            )
            .map_err(query_error)?
            .iter()
            .map(decode_relation)
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(PersistedSchema {
            data_model_id: data_model_id.to_string(),
            entities,
            fields,
            relations,
        })
    }

    fn begin(&self) -> Result<Box<dyn SchemaTransaction + '_>, StoreError> {
        let mut client = self.lock()?;
        client.batch_execute("BEGIN").map_err(|e| StoreError::TransactionFailed {
            message: e.to_string(),
        })?;
        Ok(Box::new(PostgresTransaction {
            client,
            finished: false,
        }))
    }
}

/// Write transaction holding the store's client. Rolled back on drop unless
/// committed.
pub struct PostgresTransaction<'a> {
    client: MutexGuard<'a, Client>,
    finished: bool,
}

impl SchemaTransaction for PostgresTransaction<'_> {
    fn record_source(&mut self, data_model_id: &str, sdl_text: &str) -> Result<i64, StoreError> {
        // Takes the row lock that serializes concurrent replaces of one model.
        let row = self
            .client
            .query_opt(
                "UPDATE data_models SET sdl_text = $2, revision = revision + 1 \
                 WHERE id = $1 RETURNING revision",
                &[&data_model_id, &sdl_text],
            )
            .map_err(query_error)?
            .ok_or_else(|| StoreError::MissingDataModel {
                id: data_model_id.to_string(),
            })?;
        Ok(row.get(0))
    }

    fn delete_relations(&mut self, data_model_id: &str) -> Result<usize, StoreError> {
        let count = self
            .client
            .execute(
                "DELETE FROM sdl_relations WHERE data_model_id = $1",
                &[&data_model_id],
            )
            .map_err(query_error)?;
        Ok(count as usize)
    }

    fn delete_fields(&mut self, data_model_id: &str) -> Result<usize, StoreError> {
        let count = self
            .client
            .execute(
                "DELETE FROM sdl_fields WHERE entity_id IN \
                 (SELECT id FROM sdl_entities WHERE data_model_id = $1)",
                &[&data_model_id],
            )
            .map_err(query_error)?;
        Ok(count as usize)
    }

    fn delete_entities(&mut self, data_model_id: &str) -> Result<usize, StoreError> {
        let count = self
            .client
            .execute(
                "DELETE FROM sdl_entities WHERE data_model_id = $1",
                &[&data_model_id],
            )
            .map_err(query_error)?;
        Ok(count as usize)
    }

    fn insert_entity(&mut self, entity: &EntityRecord) -> Result<(), StoreError> {
        self.client
            .execute(
                "INSERT INTO sdl_entities (id, data_model_id, name, position) VALUES ($1, $2, $3, $4)",
                &[&entity.id, &entity.data_model_id, &entity.name, &entity.position],
            )
            .map_err(query_error)?;
        Ok(())
    }

    fn insert_field(&mut self, field: &FieldRecord) -> Result<(), StoreError> {
        let type_kind = field.type_kind.as_str();
        self.client
            .execute(
                "INSERT INTO sdl_fields (id, entity_id, name, position, type_kind, type_name, \
                    referenced_field, enum_values, is_array, is_primary, is_unique, is_index, \
                    is_nullable, default_value) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
                &[
                    &field.id,
                    &field.entity_id,
                    &field.name,
                    &field.position,
                    &type_kind,
                    &field.type_name,
                    &field.referenced_field,
                    &field.enum_values,
                    &field.is_array,
                    &field.is_primary,
                    &field.is_unique,
                    &field.is_index,
                    &field.is_nullable,
                    &field.default_value,
                ],
            )
            .map_err(query_error)?;
        Ok(())
    }

    fn insert_relation(&mut self, relation: &RelationRecord) -> Result<(), StoreError> {
        let cardinality = relation.cardinality.as_str();
        self.client
            .execute(
                "INSERT INTO sdl_relations (id, data_model_id, position, from_entity_id, \
                    from_field_id, to_entity_id, to_field_id, cardinality, is_nullable) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
                &[
                    &relation.id,
                    &relation.data_model_id,
                    &relation.position,
                    &relation.from_entity_id,
                    &relation.from_field_id,
                    &relation.to_entity_id,
                    &relation.to_field_id,
                    &cardinality,
                    &relation.is_nullable,
                ],
            )
            .map_err(query_error)?;
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        self.client
            .batch_execute("COMMIT")
            .map_err(|e| StoreError::TransactionFailed {
                message: e.to_string(),
            })?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for PostgresTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            debug!("rolling back uncommitted postgres transaction");
            if let Err(e) = self.client.batch_execute("ROLLBACK") {
                warn!(error = %e, "rollback failed");
            }
        }
    }
}

fn decode_field(row: &Row) -> Result<FieldRecord, StoreError> {
    let kind: String = row.get(4);
    Ok(FieldRecord {
        id: row.get(0),
        entity_id: row.get(1),
        name: row.get(2),
        position: row.get(3),
        type_kind: TypeKind::from_name(&kind).ok_or_else(|| StoreError::Decode {
            record: "field",
            message: format!("unknown type kind '{}'", kind),
        })?,
        type_name: row.get(5),
        referenced_field: row.get(6),
        enum_values: row.get(7),
        is_array: row.get(8),
        is_primary: row.get(9),
        is_unique: row.get(10),
        is_index: row.get(11),
        is_nullable: row.get(12),
        default_value: row.get(13),
    })
}

fn decode_relation(row: &Row) -> Result<RelationRecord, StoreError> {
    let cardinality: String = row.get(7);
    Ok(RelationRecord {
        id: row.get(0),
        data_model_id: row.get(1),
        position: row.get(2),
        from_entity_id: row.get(3),
        from_field_id: row.get(4),
        to_entity_id: row.get(5),
        to_field_id: row.get(6),
        cardinality: Cardinality::from_name(&cardinality).ok_or_else(|| StoreError::Decode {
            record: "relation",
            message: format!("unknown cardinality '{}'", cardinality),
        })?,
        is_nullable: row.get(8),
    })
}

//! CozoDB store.
//!
//! Schemas are stored in four Cozo relations keyed by generated ids. Write
//! transactions use `DbInstance::multi_transaction`, so every script run
//! through a [`CozoTransaction`] commits or aborts together.

use std::collections::BTreeMap;
use std::path::Path;

use cozo::{DataValue, DbInstance, MultiTransaction, NamedRows, Num, ScriptMutability};
use tracing::debug;

use super::records::{DataModelRecord, EntityRecord, FieldRecord, PersistedSchema, RelationRecord, TypeKind};
use super::{new_id, RelationStatus, SchemaStore, SchemaTransaction, StoreError, RELATION_NAMES};
use crate::sdl::Cardinality;

type Params = BTreeMap<String, DataValue>;

const SCHEMA_DATA_MODELS: &str = r#"
:create data_models {
    id: String
    =>
    owner: String,
    name: String,
    sdl_text: String default "",
    revision: Int default 0
}
"#;

const SCHEMA_ENTITIES: &str = r#"
:create sdl_entities {
    id: String
    =>
    data_model_id: String,
    name: String,
    position: Int
}
"#;

const SCHEMA_FIELDS: &str = r#"
:create sdl_fields {
    id: String
    =>
    entity_id: String,
    name: String,
    position: Int,
    type_kind: String,
    type_name: String,
    referenced_field: String?,
    enum_values: [String],
    is_array: Bool,
    is_primary: Bool,
    is_unique: Bool,
    is_index: Bool,
    is_nullable: Bool,
    default_value: String?
}
"#;

const SCHEMA_RELATIONS: &str = r#"
:create sdl_relations {
    id: String
    =>
    data_model_id: String,
    position: Int,
    from_entity_id: String,
    from_field_id: String,
    to_entity_id: String,
    to_field_id: String,
    cardinality: String,
    is_nullable: Bool
}
"#;

const FIELD_COLUMNS: &str = "id, entity_id, name, position, type_kind, type_name, referenced_field, \
     enum_values, is_array, is_primary, is_unique, is_index, is_nullable, default_value";

const RELATION_COLUMNS: &str = "id, data_model_id, position, from_entity_id, from_field_id, \
     to_entity_id, to_field_id, cardinality, is_nullable";

/// Schema store backed by CozoDB.
pub struct CozoStore {
    db: DbInstance,
    name: &'static str,
}

impl CozoStore {
    /// Open a CozoDB database backed by SQLite storage.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = DbInstance::new("sqlite", path, "").map_err(|e| StoreError::OpenFailed {
            path: path.display().to_string(),
            message: format!("{:?}", e),
        })?;
        Ok(Self {
            db,
            name: "CozoSqlite",
        })
    }

    /// Create an in-memory store.
    pub fn open_mem() -> Result<Self, StoreError> {
        let db = DbInstance::new("mem", "", "").map_err(|e| StoreError::OpenFailed {
            path: ":memory:".to_string(),
            message: format!("{:?}", e),
        })?;
        Ok(Self { db, name: "CozoMem" })
    }

    fn run(&self, script: &str, params: Params) -> Result<NamedRows, StoreError> {
        self.db
            .run_script(script, params, ScriptMutability::Mutable)
            .map_err(|e| StoreError::QueryFailed {
                message: format!("{:?}", e),
            })
    }

    fn existing_relations(&self) -> Result<Vec<String>, StoreError> {
        let rows = self.run("::relations", Params::new())?;
        Ok(rows
            .rows
            .iter()
            .filter_map(|row| row.first().and_then(extract_string))
            .collect())
    }
}

impl SchemaStore for CozoStore {
    fn backend_name(&self) -> &'static str {
        self.name
    }

    fn setup(&self) -> Result<Vec<RelationStatus>, StoreError> {
        let existing = self.existing_relations()?;
        let scripts = [SCHEMA_DATA_MODELS, SCHEMA_ENTITIES, SCHEMA_FIELDS, SCHEMA_RELATIONS];
        let mut statuses = Vec::new();

        for (name, script) in RELATION_NAMES.into_iter().zip(scripts) {
            let created = if existing.iter().any(|r| r == name) {
                false
            } else {
                self.run(script, Params::new())
                    .map_err(|e| StoreError::SchemaCreationFailed {
                        relation: name.to_string(),
                        message: e.to_string(),
                    })?;
                true
            };
            debug!(relation = name, created, "cozo setup");
            statuses.push(RelationStatus {
                relation: name.to_string(),
                created,
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

        let mut params = Params::new();
        params.insert("id".to_string(), str_value(&record.id));
        params.insert("owner".to_string(), str_value(owner));
        params.insert("name".to_string(), str_value(name));

        self.run(
            r#"
            ?[id, owner, name, sdl_text, revision] <- [[$id, $owner, $name, "", 0]]
            :put data_models { id => owner, name, sdl_text, revision }
            "#,
            params,
        )?;

        Ok(record)
    }

    fn find_data_model(&self, id: &str) -> Result<Option<DataModelRecord>, StoreError> {
        let mut params = Params::new();
        params.insert("id".to_string(), str_value(id));

        let rows = self.run(
            r#"
            ?[id, owner, name, sdl_text, revision] :=
                *data_models{ id, owner, name, sdl_text, revision }, id = $id
            "#,
            params,
        )?;

        rows.rows
            .first()
            .map(|row| {
                Ok(DataModelRecord {
                    id: string_at(row, 0, "data model")?,
                    owner: string_at(row, 1, "data model")?,
                    name: string_at(row, 2, "data model")?,
                    sdl_text: string_at(row, 3, "data model")?,
                    revision: int_at(row, 4, "data model")?,
                })
            })
            .transpose()
    }

    fn load_projection(&self, data_model_id: &str) -> Result<PersistedSchema, StoreError> {
        let mut params = Params::new();
        params.insert("dm".to_string(), str_value(data_model_id));

        let entity_rows = self.run(
            r#"
            ?[id, name, position] := *sdl_entities{ id, data_model_id: $dm, name, position }
            "#,
            params.clone(),
        )?;
        let mut entities = entity_rows
            .rows
            .iter()
            .map(|row| {
                Ok(EntityRecord {
                    id: string_at(row, 0, "entity")?,
                    data_model_id: data_model_id.to_string(),
                    name: string_at(row, 1, "entity")?,
                    position: int_at(row, 2, "entity")?,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        entities.sort_by_key(|e| e.position);

        let field_script = format!(
            "?[{cols}] := *sdl_entities{{ id: entity_id, data_model_id: $dm }}, *sdl_fields{{ {cols} }}",
            cols = FIELD_COLUMNS
        );
        let field_rows = self.run(&field_script, params.clone())?;
        let mut fields = field_rows
            .rows
            .iter()
            .map(|row| decode_field(row))
            .collect::<Result<Vec<_>, StoreError>>()?;
        let entity_position = |entity_id: &str| {
            entities
                .iter()
                .find(|e| e.id == entity_id)
                .map(|e| e.position)
                .unwrap_or(i64::MAX)
        };
        fields.sort_by_key(|f| (entity_position(&f.entity_id), f.position));

        let relation_script = format!(
            "?[{cols}] := *sdl_relations{{ {cols} }}, data_model_id = $dm",
            cols = RELATION_COLUMNS
        );
        let relation_rows = self.run(&relation_script, params)?;
        let mut relations = relation_rows
            .rows
            .iter()
            .map(|row| decode_relation(row))
            .collect::<Result<Vec<_>, StoreError>>()?;
        relations.sort_by_key(|r| r.position);

        Ok(PersistedSchema {
            data_model_id: data_model_id.to_string(),
            entities,
            fields,
            relations,
        })
    }

    fn begin(&self) -> Result<Box<dyn SchemaTransaction + '_>, StoreError> {
        Ok(Box::new(CozoTransaction {
            tx: self.db.multi_transaction(true),
            finished: false,
        }))
    }
}

/// Write transaction over a [`CozoStore`]. Aborted on drop unless committed.
pub struct CozoTransaction {
    tx: MultiTransaction,
    finished: bool,
}

impl CozoTransaction {
    fn run(&self, script: &str, params: Params) -> Result<NamedRows, StoreError> {
        self.tx
            .run_script(script, params)
            .map_err(|e| StoreError::QueryFailed {
                message: format!("{:?}", e),
            })
    }

    /// Remove the rows whose ids the `?[id]` rule in `select` yields.
    fn remove_ids(&self, select: &str, relation: &str, data_model_id: &str) -> Result<usize, StoreError> {
        let mut params = Params::new();
        params.insert("dm".to_string(), str_value(data_model_id));

        let ids = self.run(select, params.clone())?.rows.len();
        if ids > 0 {
            let script = format!("{}\n:rm {} {{ id }}", select, relation);
            self.run(&script, params)?;
        }
        Ok(ids)
    }
}

impl SchemaTransaction for CozoTransaction {
    fn record_source(&mut self, data_model_id: &str, sdl_text: &str) -> Result<i64, StoreError> {
        let mut params = Params::new();
        params.insert("id".to_string(), str_value(data_model_id));

        let rows = self.run(
            "?[owner, name, revision] := *data_models{ id: $id, owner, name, revision }",
            params.clone(),
        )?;
        let row = rows.rows.first().ok_or_else(|| StoreError::MissingDataModel {
            id: data_model_id.to_string(),
        })?;
        let owner = string_at(row, 0, "data model")?;
        let name = string_at(row, 1, "data model")?;
        let revision = int_at(row, 2, "data model")? + 1;

        params.insert("owner".to_string(), str_value(&owner));
        params.insert("name".to_string(), str_value(&name));
        params.insert("sdl_text".to_string(), str_value(sdl_text));
        params.insert("revision".to_string(), DataValue::Num(Num::Int(revision)));
        self.run(
            r#"
            ?[id, owner, name, sdl_text, revision] <- [[$id, $owner, $name, $sdl_text, $revision]]
            :put data_models { id => owner, name, sdl_text, revision }
            "#,
            params,
        )?;

        Ok(revision)
    }

    fn delete_relations(&mut self, data_model_id: &str) -> Result<usize, StoreError> {
        self.remove_ids(
            "?[id] := *sdl_relations{ id, data_model_id: $dm }",
            "sdl_relations",
            data_model_id,
        )
    }

    fn delete_fields(&mut self, data_model_id: &str) -> Result<usize, StoreError> {
        self.remove_ids(
            "?[id] := *sdl_entities{ id: entity_id, data_model_id: $dm }, *sdl_fields{ id, entity_id }",
            "sdl_fields",
            data_model_id,
        )
    }

    fn delete_entities(&mut self, data_model_id: &str) -> Result<usize, StoreError> {
        self.remove_ids(
            "?[id] := *sdl_entities{ id, data_model_id: $dm }",
            "sdl_entities",
            data_model_id,
        )
    }

    fn insert_entity(&mut self, entity: &EntityRecord) -> Result<(), StoreError> {
        let mut params = Params::new();
        params.insert("id".to_string(), str_value(&entity.id));
        params.insert("dm".to_string(), str_value(&entity.data_model_id));
        params.insert("name".to_string(), str_value(&entity.name));
        params.insert("position".to_string(), DataValue::Num(Num::Int(entity.position)));

        self.run(
            r#"
            ?[id, data_model_id, name, position] <- [[$id, $dm, $name, $position]]
            :put sdl_entities { id => data_model_id, name, position }
            "#,
            params,
        )?;
        Ok(())
    }

    fn insert_field(&mut self, field: &FieldRecord) -> Result<(), StoreError> {
        let values = [
            str_value(&field.id),
            str_value(&field.entity_id),
            str_value(&field.name),
            DataValue::Num(Num::Int(field.position)),
            str_value(field.type_kind.as_str()),
            str_value(&field.type_name),
            opt_str_value(field.referenced_field.as_deref()),
            DataValue::List(field.enum_values.iter().map(|v| str_value(v)).collect()),
            DataValue::Bool(field.is_array),
            DataValue::Bool(field.is_primary),
            DataValue::Bool(field.is_unique),
            DataValue::Bool(field.is_index),
            DataValue::Bool(field.is_nullable),
            opt_str_value(field.default_value.as_deref()),
        ];

        let mut params = Params::new();
        params.insert("row".to_string(), DataValue::List(values.to_vec()));

        let script = format!(
            "?[{cols}] <- [$row]\n:put sdl_fields {{ id => {rest} }}",
            cols = FIELD_COLUMNS,
            rest = FIELD_COLUMNS.trim_start_matches("id, ")
        );
        self.run(&script, params)?;
        Ok(())
    }

    fn insert_relation(&mut self, relation: &RelationRecord) -> Result<(), StoreError> {
        let values = [
            str_value(&relation.id),
            str_value(&relation.data_model_id),
            DataValue::Num(Num::Int(relation.position)),
            str_value(&relation.from_entity_id),
            str_value(&relation.from_field_id),
            str_value(&relation.to_entity_id),
            str_value(&relation.to_field_id),
            str_value(relation.cardinality.as_str()),
            DataValue::Bool(relation.is_nullable),
        ];

        let mut params = Params::new();
        params.insert("row".to_string(), DataValue::List(values.to_vec()));

        let script = format!(
            "?[{cols}] <- [$row]\n:put sdl_relations {{ id => {rest} }}",
            cols = RELATION_COLUMNS,
            rest = RELATION_COLUMNS.trim_start_matches("id, ")
        );
        self.run(&script, params)?;
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().map_err(|e| StoreError::TransactionFailed {
            message: format!("{:?}", e),
        })?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for CozoTransaction {
    fn drop(&mut self) {
        if !self.finished {
            debug!("aborting uncommitted cozo transaction");
            let _ = self.tx.abort();
        }
    }
}

// DataValue conversion helpers

fn str_value(s: &str) -> DataValue {
    DataValue::Str(s.into())
}

fn opt_str_value(s: Option<&str>) -> DataValue {
    s.map(str_value).unwrap_or(DataValue::Null)
}

fn extract_string(value: &DataValue) -> Option<String> {
    match value {
        DataValue::Str(s) => Some(s.to_string()),
        _ => None,
    }
}

fn decode_error(record: &'static str, index: usize, expected: &str) -> StoreError {
    StoreError::Decode {
        record,
        message: format!("column {} is not {}", index, expected),
    }
}

fn string_at(row: &[DataValue], index: usize, record: &'static str) -> Result<String, StoreError> {
    row.get(index)
        .and_then(extract_string)
        .ok_or_else(|| decode_error(record, index, "a string"))
}

fn opt_string_at(
    row: &[DataValue],
    index: usize,
    record: &'static str,
) -> Result<Option<String>, StoreError> {
    match row.get(index) {
        Some(DataValue::Null) => Ok(None),
        Some(DataValue::Str(s)) => Ok(Some(s.to_string())),
        _ => Err(decode_error(record, index, "a string or null")),
    }
}

fn int_at(row: &[DataValue], index: usize, record: &'static str) -> Result<i64, StoreError> {
    match row.get(index) {
        Some(DataValue::Num(Num::Int(i))) => Ok(*i),
        Some(DataValue::Num(Num::Float(f))) => Ok(*f as i64),
        _ => Err(decode_error(record, index, "an integer")),
    }
}

fn bool_at(row: &[DataValue], index: usize, record: &'static str) -> Result<bool, StoreError> {
    match row.get(index) {
        Some(DataValue::Bool(b)) => Ok(*b),
        _ => Err(decode_error(record, index, "a bool")),
    }
}

fn string_list_at(
    row: &[DataValue],
    index: usize,
    record: &'static str,
) -> Result<Vec<String>, StoreError> {
    match row.get(index) {
        Some(DataValue::List(items)) => items
            .iter()
            .map(|v| extract_string(v).ok_or_else(|| decode_error(record, index, "a string list")))
            .collect(),
        _ => Err(decode_error(record, index, "a list")),
    }
}

fn decode_field(row: &[DataValue]) -> Result<FieldRecord, StoreError> {
    const R: &str = "field";
    let kind = string_at(row, 4, R)?;
    Ok(FieldRecord {
        id: string_at(row, 0, R)?,
        entity_id: string_at(row, 1, R)?,
        name: string_at(row, 2, R)?,
        position: int_at(row, 3, R)?,
        type_kind: TypeKind::from_name(&kind).ok_or_else(|| StoreError::Decode {
            record: R,
            message: format!("unknown type kind '{}'", kind),
        })?,
        type_name: string_at(row, 5, R)?,
        referenced_field: opt_string_at(row, 6, R)?,
        enum_values: string_list_at(row, 7, R)?,
        is_array: bool_at(row, 8, R)?,
        is_primary: bool_at(row, 9, R)?,
        is_unique: bool_at(row, 10, R)?,
        is_index: bool_at(row, 11, R)?,
        is_nullable: bool_at(row, 12, R)?,
        default_value: opt_string_at(row, 13, R)?,
    })
}

fn decode_relation(row: &[DataValue]) -> Result<RelationRecord, StoreError> {
    const R: &str = "relation";
    let cardinality = string_at(row, 7, R)?;
    Ok(RelationRecord {
        id: string_at(row, 0, R)?,
        data_model_id: string_at(row, 1, R)?,
        position: int_at(row, 2, R)?,
        from_entity_id: string_at(row, 3, R)?,
        from_field_id: string_at(row, 4, R)?,
        to_entity_id: string_at(row, 5, R)?,
        to_field_id: string_at(row, 6, R)?,
        cardinality: Cardinality::from_name(&cardinality).ok_or_else(|| StoreError::Decode {
            record: R,
            message: format!("unknown cardinality '{}'", cardinality),
        })?,
        is_nullable: bool_at(row, 8, R)?,
    })
}

use std::collections::HashMap;
use std::error::Error;

use serde::Serialize;

use super::ShowCmd;
use crate::commands::{Context, Execute};
use crate::sdl::{self, serializer::serialize_field, Relation};
use crate::store::{PersistedSchema, StoreError};
use crate::sync::load_schema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShownEntity {
    pub name: String,
    /// Field lines in canonical SDL form.
    pub fields: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct ShowResult {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub revision: i64,
    pub entities: Vec<ShownEntity>,
    pub relations: Vec<Relation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdl: Option<String>,
}

fn lookup(names: &HashMap<&str, &str>, id: &str) -> Result<String, StoreError> {
    names
        .get(id)
        .map(|name| name.to_string())
        .ok_or_else(|| StoreError::Decode {
            record: "relation",
            message: format!("dangling reference to '{}'", id),
        })
}

/// Resolve stored relation rows back to entity and field names.
fn named_relations(persisted: &PersistedSchema) -> Result<Vec<Relation>, StoreError> {
    let entity_names: HashMap<&str, &str> = persisted
        .entities
        .iter()
        .map(|e| (e.id.as_str(), e.name.as_str()))
        .collect();
    let field_names: HashMap<&str, &str> = persisted
        .fields
        .iter()
        .map(|f| (f.id.as_str(), f.name.as_str()))
        .collect();

    persisted
        .relations
        .iter()
        .map(|r| {
            Ok(Relation {
                from_entity: lookup(&entity_names, &r.from_entity_id)?,
                from_field: lookup(&field_names, &r.from_field_id)?,
                to_entity: lookup(&entity_names, &r.to_entity_id)?,
                to_field: lookup(&field_names, &r.to_field_id)?,
                cardinality: r.cardinality,
                is_nullable: r.is_nullable,
            })
        })
        .collect()
}

impl Execute for ShowCmd {
    type Output = ShowResult;

    fn execute(self, ctx: &Context) -> Result<Self::Output, Box<dyn Error>> {
        let store = ctx.connect()?;
        let loaded = load_schema(store.as_ref(), ctx.principal(), &self.model)?;
        let schema = loaded.persisted.to_schema()?;

        let entities = schema
            .entities
            .iter()
            .map(|entity| ShownEntity {
                name: entity.name.clone(),
                fields: entity.fields.iter().map(serialize_field).collect(),
            })
            .collect();

        Ok(ShowResult {
            id: loaded.model.id,
            name: loaded.model.name,
            owner: loaded.model.owner,
            revision: loaded.model.revision,
            entities,
            relations: named_relations(&loaded.persisted)?,
            sdl: self.sdl.then(|| sdl::serialize(&schema)),
        })
    }
}

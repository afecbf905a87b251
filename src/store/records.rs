//! Row types for the persisted schema projection.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::StoreError;
use crate::sdl::{
    Cardinality, Entity, Field, FieldModifiers, FieldType, ScalarKind, Schema, TypeShape,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataModelRecord {
    pub id: String,
    pub owner: String,
    pub name: String,
    /// SDL source of the last successful replace.
    pub sdl_text: String,
    pub revision: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: String,
    pub data_model_id: String,
    pub name: String,
    pub position: i64,
}

/// How `FieldRecord::type_name` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Scalar,
    Enum,
    Reference,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Enum => "enum",
            Self::Reference => "reference",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "scalar" => Some(Self::Scalar),
            "enum" => Some(Self::Enum),
            "reference" => Some(Self::Reference),
            _ => None,
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub id: String,
    pub entity_id: String,
    pub name: String,
    pub position: i64,
    pub type_kind: TypeKind,
    /// Scalar spelling, target entity name, or `enum`.
    pub type_name: String,
    pub referenced_field: Option<String>,
    pub enum_values: Vec<String>,
    pub is_array: bool,
    pub is_primary: bool,
    pub is_unique: bool,
    pub is_index: bool,
    pub is_nullable: bool,
    pub default_value: Option<String>,
}

impl FieldRecord {
    pub fn from_field(id: String, entity_id: &str, position: usize, field: &Field) -> Self {
        let (type_kind, type_name, referenced_field, enum_values) = match &field.field_type.shape {
            TypeShape::Scalar { scalar } => {
                (TypeKind::Scalar, scalar.as_str().to_string(), None, Vec::new())
            }
            TypeShape::Enum { values } => (TypeKind::Enum, "enum".to_string(), None, values.clone()),
            TypeShape::EntityRef { entity, field } => {
                (TypeKind::Reference, entity.clone(), field.clone(), Vec::new())
            }
        };

        let modifiers = &field.modifiers;
        Self {
            id,
            entity_id: entity_id.to_string(),
            name: field.name.clone(),
            position: position as i64,
            type_kind,
            type_name,
            referenced_field,
            enum_values,
            is_array: field.field_type.is_array,
            is_primary: modifiers.is_primary,
            is_unique: modifiers.is_unique,
            is_index: modifiers.is_index,
            is_nullable: modifiers.is_nullable,
            default_value: modifiers.default_value.clone(),
        }
    }

    /// Rebuild the in-memory field this row was written from.
    pub fn to_field(&self) -> Result<Field, StoreError> {
        let shape = match self.type_kind {
            TypeKind::Scalar => {
                let scalar =
                    ScalarKind::from_name(&self.type_name).ok_or_else(|| StoreError::Decode {
                        record: "field",
                        message: format!("unknown scalar '{}'", self.type_name),
                    })?;
                TypeShape::Scalar { scalar }
            }
            TypeKind::Enum => TypeShape::Enum {
                values: self.enum_values.clone(),
            },
            TypeKind::Reference => TypeShape::EntityRef {
                entity: self.type_name.clone(),
                field: self.referenced_field.clone(),
            },
        };

        Ok(Field {
            name: self.name.clone(),
            field_type: FieldType {
                shape,
                is_array: self.is_array,
            },
            modifiers: FieldModifiers {
                is_primary: self.is_primary,
                is_unique: self.is_unique,
                is_index: self.is_index,
                is_nullable: self.is_nullable,
                default_value: self.default_value.clone(),
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRecord {
    pub id: String,
    pub data_model_id: String,
    pub position: i64,
    pub from_entity_id: String,
    pub from_field_id: String,
    pub to_entity_id: String,
    pub to_field_id: String,
    pub cardinality: Cardinality,
    pub is_nullable: bool,
}

/// A data model's committed entities, fields and relations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSchema {
    pub data_model_id: String,
    pub entities: Vec<EntityRecord>,
    pub fields: Vec<FieldRecord>,
    pub relations: Vec<RelationRecord>,
}

impl PersistedSchema {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.fields.is_empty() && self.relations.is_empty()
    }

    /// Fields of one entity, ordered by position.
    pub fn fields_of<'a>(&'a self, entity_id: &'a str) -> impl Iterator<Item = &'a FieldRecord> + 'a {
        let mut fields: Vec<&FieldRecord> =
            self.fields.iter().filter(|f| f.entity_id == entity_id).collect();
        fields.sort_by_key(|f| f.position);
        fields.into_iter()
    }

    /// Rebuild an in-memory schema, ordered by the stored positions.
    ///
    /// Relations are derived again from the field types rather than read
    /// from `relations`.
    pub fn to_schema(&self) -> Result<Schema, StoreError> {
        let mut entities: Vec<&EntityRecord> = self.entities.iter().collect();
        entities.sort_by_key(|e| e.position);

        let mut schema = Schema::default();
        for record in entities {
            let mut entity = Entity::new(record.name.clone());
            for field in self.fields_of(&record.id) {
                entity.fields.push(field.to_field()?);
            }
            schema.entities.push(entity);
        }

        Ok(schema)
    }
}

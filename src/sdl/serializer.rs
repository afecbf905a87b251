//! Canonical SDL rendering of a schema graph.

use super::model::{Entity, Field, FieldType, Schema, TypeShape};

/// Serialize a schema to canonical SDL text.
///
/// Entity and field order follow the schema. Diagnostics are not rendered.
pub fn serialize(schema: &Schema) -> String {
    let mut output = String::new();

    for (i, entity) in schema.entities.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        serialize_entity(&mut output, entity);
    }

    output
}

fn serialize_entity(output: &mut String, entity: &Entity) {
    output.push_str("entity ");
    output.push_str(&entity.name);
    output.push_str(" {\n");

    for field in &entity.fields {
        output.push_str("  ");
        output.push_str(&serialize_field(field));
        output.push('\n');
    }

    output.push_str("}\n");
}

/// Render one field line without indentation.
pub fn serialize_field(field: &Field) -> String {
    let mut line = format!("{}: {}", field.name, type_expr(&field.field_type));
    let modifiers = &field.modifiers;

    if modifiers.is_primary {
        line.push_str(" @primary");
    }
    if modifiers.is_unique {
        line.push_str(" @unique");
    }
    if modifiers.is_index {
        line.push_str(" @index");
    }
    // Primary fields are never nullable, so the flag is implied there.
    if !modifiers.is_nullable && !modifiers.is_primary {
        line.push_str(" @nullable(false)");
    }
    if let Some(value) = &modifiers.default_value {
        line.push_str(&format!(" @default({})", value));
    }

    line
}

/// Render a type expression such as `enum(a,b)`, `User.email` or `Post[]`.
pub fn type_expr(field_type: &FieldType) -> String {
    let mut expr = match &field_type.shape {
        TypeShape::Scalar { scalar } => scalar.as_str().to_string(),
        TypeShape::Enum { values } => format!("enum({})", values.join(",")),
        TypeShape::EntityRef {
            entity,
            field: Some(field),
        } => format!("{}.{}", entity, field),
        TypeShape::EntityRef {
            entity,
            field: None,
        } => entity.clone(),
    };

    if field_type.is_array {
        expr.push_str("[]");
    }
    expr
}

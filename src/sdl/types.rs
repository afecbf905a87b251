//! Type resolution for field type expressions.

use std::collections::HashSet;

use thiserror::Error;

use super::model::{FieldType, ScalarKind, TypeShape};

/// Classification of a base type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeClass {
    Scalar(ScalarKind),
    Enum(Vec<String>),
    EntityRef(String),
    Unknown,
}

/// Classify `base` against the scalar vocabulary, the `enum(...)` form and the
/// set of entity names registered so far.
///
/// Must only run once every entity header has been seen, so that forward
/// references resolve.
pub fn classify(base: &str, known_entities: &HashSet<String>) -> TypeClass {
    if let Some(scalar) = ScalarKind::from_name(base) {
        return TypeClass::Scalar(scalar);
    }

    if let Some(inner) = base
        .strip_prefix("enum(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let values = if inner.trim().is_empty() {
            Vec::new()
        } else {
            inner.split(',').map(|v| v.trim().to_string()).collect()
        };
        return TypeClass::Enum(values);
    }

    if known_entities.contains(base) {
        return TypeClass::EntityRef(base.to_string());
    }

    TypeClass::Unknown
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeExprError {
    #[error("missing type")]
    Missing,

    #[error("unknown type '{name}'")]
    UnknownType { name: String },

    #[error("enum must declare at least one value")]
    EmptyEnum,

    #[error("enum has an empty value")]
    EmptyEnumValue,

    #[error("enum value '{value}' is declared twice")]
    DuplicateEnumValue { value: String },

    #[error("scalar type '{scalar}' cannot reference field '{field}'")]
    QualifiedScalar { scalar: String, field: String },

    #[error("invalid field reference '{expr}'")]
    InvalidReference { expr: String },
}

/// Parse a full type expression such as `Post.slug[]` or `enum(a,b)`.
pub fn parse_type_expr(
    expr: &str,
    known_entities: &HashSet<String>,
) -> Result<FieldType, TypeExprError> {
    let expr = expr.trim();
    let (body, is_array) = match expr.strip_suffix("[]") {
        Some(body) => (body.trim_end(), true),
        None => (expr, false),
    };

    if body.is_empty() {
        return Err(TypeExprError::Missing);
    }

    // Enum members may contain dots, so the qualifier split happens afterwards.
    let (base, referenced) = if body.starts_with("enum(") {
        (body, None)
    } else {
        split_reference(body)?
    };

    let shape = match classify(base, known_entities) {
        TypeClass::Scalar(scalar) => {
            if let Some(field) = referenced {
                return Err(TypeExprError::QualifiedScalar {
                    scalar: scalar.to_string(),
                    field: field.to_string(),
                });
            }
            TypeShape::Scalar { scalar }
        }
        TypeClass::Enum(values) => {
            validate_enum(&values)?;
            TypeShape::Enum { values }
        }
        TypeClass::EntityRef(entity) => TypeShape::EntityRef {
            entity,
            field: referenced.map(str::to_string),
        },
        TypeClass::Unknown => {
            return Err(TypeExprError::UnknownType {
                name: base.to_string(),
            })
        }
    };

    Ok(FieldType { shape, is_array })
}

fn split_reference(body: &str) -> Result<(&str, Option<&str>), TypeExprError> {
    let mut parts = body.split('.');
    let base = parts.next().unwrap_or_default().trim();
    let field = parts.next().map(str::trim);

    let malformed = parts.next().is_some()
        || base.is_empty()
        || field.is_some_and(|f| f.is_empty());
    if malformed {
        return Err(TypeExprError::InvalidReference {
            expr: body.to_string(),
        });
    }

    Ok((base, field))
}

fn validate_enum(values: &[String]) -> Result<(), TypeExprError> {
    if values.is_empty() {
        return Err(TypeExprError::EmptyEnum);
    }

    let mut seen = HashSet::new();
    for value in values {
        if value.is_empty() {
            return Err(TypeExprError::EmptyEnumValue);
        }
        if !seen.insert(value.as_str()) {
            return Err(TypeExprError::DuplicateEnumValue {
                value: value.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn entities() -> HashSet<String> {
        ["User", "Post"].iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    fn test_classify_scalar(entities: HashSet<String>) {
        assert_eq!(classify("uuid", &entities), TypeClass::Scalar(ScalarKind::Uuid));
    }

    #[rstest]
    fn test_classify_enum(entities: HashSet<String>) {
        assert_eq!(
            classify("enum(a, b)", &entities),
            TypeClass::Enum(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[rstest]
    fn test_classify_entity(entities: HashSet<String>) {
        assert_eq!(classify("Post", &entities), TypeClass::EntityRef("Post".to_string()));
    }

    #[rstest]
    fn test_classify_unknown(entities: HashSet<String>) {
        assert_eq!(classify("Ghost", &entities), TypeClass::Unknown);
    }

    #[rstest]
    fn test_parse_array_reference(entities: HashSet<String>) {
        let parsed = parse_type_expr("Post[]", &entities).unwrap();
        assert_eq!(parsed, FieldType::entity_ref("Post", None).array());
    }

    #[rstest]
    fn test_parse_qualified_reference(entities: HashSet<String>) {
        let parsed = parse_type_expr("User.email", &entities).unwrap();
        assert_eq!(parsed, FieldType::entity_ref("User", Some("email".to_string())));
    }

    #[rstest]
    fn test_parse_enum_with_dotted_values(entities: HashSet<String>) {
        let parsed = parse_type_expr("enum(v1.0, v2.0)", &entities).unwrap();
        assert_eq!(
            parsed,
            FieldType::enumeration(vec!["v1.0".to_string(), "v2.0".to_string()])
        );
    }

    #[rstest]
    #[case("", TypeExprError::Missing)]
    #[case("[]", TypeExprError::Missing)]
    #[case("enum()", TypeExprError::EmptyEnum)]
    #[case("enum(a,,b)", TypeExprError::EmptyEnumValue)]
    #[case("enum(a,a)", TypeExprError::DuplicateEnumValue { value: "a".to_string() })]
    #[case("Ghost", TypeExprError::UnknownType { name: "Ghost".to_string() })]
    #[case("User.a.b", TypeExprError::InvalidReference { expr: "User.a.b".to_string() })]
    #[case("User.", TypeExprError::InvalidReference { expr: "User.".to_string() })]
    #[case(
        "string.id",
        TypeExprError::QualifiedScalar { scalar: "string".to_string(), field: "id".to_string() }
    )]
    fn test_parse_errors(
        entities: HashSet<String>,
        #[case] expr: &str,
        #[case] expected: TypeExprError,
    ) {
        assert_eq!(parse_type_expr(expr, &entities), Err(expected));
    }
}

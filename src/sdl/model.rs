//! In-memory schema graph produced by the parser.
//!
//! Entities own their fields. Relations are never stored: they are derived from
//! entity-reference field types each time [`Schema::relations`] is called.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Built-in scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    String,
    Text,
    Number,
    Int,
    Float,
    Decimal,
    Boolean,
    Datetime,
    Date,
    Time,
    Identifier,
    Json,
    Email,
    Url,
    Uuid,
    Bigint,
    Binary,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 17] = [
        Self::String,
        Self::Text,
        Self::Number,
        Self::Int,
        Self::Float,
        Self::Decimal,
        Self::Boolean,
        Self::Datetime,
        Self::Date,
        Self::Time,
        Self::Identifier,
        Self::Json,
        Self::Email,
        Self::Url,
        Self::Uuid,
        Self::Bigint,
        Self::Binary,
    ];

    /// The spelling used in SDL source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Text => "text",
            Self::Number => "number",
            Self::Int => "int",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Datetime => "datetime",
            Self::Date => "date",
            Self::Time => "time",
            Self::Identifier => "ID",
            Self::Json => "json",
            Self::Email => "email",
            Self::Url => "url",
            Self::Uuid => "uuid",
            Self::Bigint => "bigint",
            Self::Binary => "binary",
        }
    }

    /// Look up a scalar by its SDL spelling. Matching is case-sensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The declared shape of a field's values, without the array marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeShape {
    Scalar { scalar: ScalarKind },
    Enum { values: Vec<String> },
    EntityRef {
        entity: String,
        /// Explicit `Entity.field` qualifier. `None` means the target's identifier field.
        field: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldType {
    pub shape: TypeShape,
    pub is_array: bool,
}

impl FieldType {
    pub fn scalar(scalar: ScalarKind) -> Self {
        Self {
            shape: TypeShape::Scalar { scalar },
            is_array: false,
        }
    }

    pub fn enumeration(values: Vec<String>) -> Self {
        Self {
            shape: TypeShape::Enum { values },
            is_array: false,
        }
    }

    pub fn entity_ref(entity: impl Into<String>, field: Option<String>) -> Self {
        Self {
            shape: TypeShape::EntityRef {
                entity: entity.into(),
                field,
            },
            is_array: false,
        }
    }

    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    /// Target entity name when this type references another entity.
    pub fn referenced_entity(&self) -> Option<&str> {
        match &self.shape {
            TypeShape::EntityRef { entity, .. } => Some(entity),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldModifiers {
    pub is_primary: bool,
    pub is_unique: bool,
    pub is_index: bool,
    pub is_nullable: bool,
    pub default_value: Option<String>,
}

impl Default for FieldModifiers {
    fn default() -> Self {
        Self {
            is_primary: false,
            is_unique: false,
            is_index: false,
            is_nullable: true,
            default_value: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub modifiers: FieldModifiers,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            modifiers: FieldModifiers::default(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: FieldModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub fields: Vec<Field>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Name of the field other entities point at by default.
    ///
    /// First `ID`-typed field, else first `@primary` field, else `id`.
    pub fn identifier_field(&self) -> &str {
        self.fields
            .iter()
            .find(|f| {
                matches!(
                    f.field_type.shape,
                    TypeShape::Scalar {
                        scalar: ScalarKind::Identifier
                    }
                )
            })
            .or_else(|| self.fields.iter().find(|f| f.modifiers.is_primary))
            .map(|f| f.name.as_str())
            .unwrap_or("id")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    #[serde(rename = "one-to-one")]
    OneToOne,
    #[serde(rename = "one-to-many")]
    OneToMany,
}

impl Cardinality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneToOne => "one-to-one",
            Self::OneToMany => "one-to-many",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "one-to-one" => Some(Self::OneToOne),
            "one-to-many" => Some(Self::OneToMany),
            _ => None,
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge implied by one entity-reference field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub from_entity: String,
    pub from_field: String,
    pub to_entity: String,
    pub to_field: String,
    pub cardinality: Cardinality,
    pub is_nullable: bool,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{} ({})",
            self.from_entity, self.from_field, self.to_entity, self.to_field, self.cardinality
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Malformed entity header, field line or modifier.
    Syntax,
    /// Unknown type, unresolvable field reference or bad enum.
    Type,
}

/// A positioned parser error. Lines are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub line: usize,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            kind: DiagnosticKind::Syntax,
            message: message.into(),
        }
    }

    pub fn type_error(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            kind: DiagnosticKind::Type,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            DiagnosticKind::Syntax => "syntax error",
            DiagnosticKind::Type => "type error",
        };
        write!(f, "line {}: {}: {}", self.line, kind, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub entities: Vec<Entity>,
    pub errors: Vec<Diagnostic>,
}

impl Schema {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self {
            entities,
            errors: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn field_count(&self) -> usize {
        self.entities.iter().map(|e| e.fields.len()).sum()
    }

    /// Derive one relation per entity-reference field, in declaration order.
    ///
    /// An unqualified reference to an entity that is not part of this schema still
    /// yields a relation pointing at `id`; the synchronizer drops such relations.
    pub fn relations(&self) -> Vec<Relation> {
        let mut relations = Vec::new();

        for entity in &self.entities {
            for field in &entity.fields {
                let TypeShape::EntityRef {
                    entity: target,
                    field: referenced,
                } = &field.field_type.shape
                else {
                    continue;
                };

                let to_field = match referenced {
                    Some(name) => name.clone(),
                    None => self
                        .entity(target)
                        .map(|e| e.identifier_field().to_string())
                        .unwrap_or_else(|| "id".to_string()),
                };

                let cardinality = if field.field_type.is_array {
                    Cardinality::OneToMany
                } else {
                    Cardinality::OneToOne
                };

                relations.push(Relation {
                    from_entity: entity.name.clone(),
                    from_field: field.name.clone(),
                    to_entity: target.clone(),
                    to_field,
                    cardinality,
                    is_nullable: field.modifiers.is_nullable,
                });
            }
        }

        relations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn user_and_post() -> Schema {
        let mut user = Entity::new("User");
        user.fields.push(Field::new("id", FieldType::scalar(ScalarKind::Identifier)));
        user.fields.push(Field::new("posts", FieldType::entity_ref("Post", None).array()));

        let mut post = Entity::new("Post");
        post.fields.push(Field::new("slug", FieldType::scalar(ScalarKind::String)).with_modifiers(
            FieldModifiers {
                is_primary: true,
                is_nullable: false,
                ..FieldModifiers::default()
            },
        ));
        post.fields.push(Field::new(
            "author",
            FieldType::entity_ref("User", Some("id".to_string())),
        ));

        Schema::new(vec![user, post])
    }

    #[rstest]
    #[case("ID", Some(ScalarKind::Identifier))]
    #[case("datetime", Some(ScalarKind::Datetime))]
    #[case("binary", Some(ScalarKind::Binary))]
    #[case("id", None)]
    #[case("String", None)]
    fn test_scalar_from_name(#[case] name: &str, #[case] expected: Option<ScalarKind>) {
        assert_eq!(ScalarKind::from_name(name), expected);
    }

    #[rstest]
    fn test_scalar_names_round_trip() {
        for kind in ScalarKind::ALL {
            assert_eq!(ScalarKind::from_name(kind.as_str()), Some(kind));
        }
    }

    #[rstest]
    fn test_default_modifiers_are_nullable() {
        let modifiers = FieldModifiers::default();
        assert!(modifiers.is_nullable);
        assert!(!modifiers.is_primary);
        assert_eq!(modifiers.default_value, None);
    }

    #[rstest]
    fn test_identifier_field_prefers_id_type() {
        let schema = user_and_post();
        assert_eq!(schema.entity("User").unwrap().identifier_field(), "id");
    }

    #[rstest]
    fn test_identifier_field_falls_back_to_primary() {
        let schema = user_and_post();
        assert_eq!(schema.entity("Post").unwrap().identifier_field(), "slug");
    }

    #[rstest]
    fn test_identifier_field_defaults_to_id() {
        let mut tag = Entity::new("Tag");
        tag.fields.push(Field::new("label", FieldType::scalar(ScalarKind::String)));
        assert_eq!(tag.identifier_field(), "id");
    }

    #[rstest]
    fn test_relations_are_derived_from_reference_fields() {
        let relations = user_and_post().relations();

        assert_eq!(relations.len(), 2);
        assert_eq!(relations[0].from_entity, "User");
        assert_eq!(relations[0].from_field, "posts");
        assert_eq!(relations[0].to_entity, "Post");
        assert_eq!(relations[0].to_field, "slug");
        assert_eq!(relations[0].cardinality, Cardinality::OneToMany);

        assert_eq!(relations[1].to_field, "id");
        assert_eq!(relations[1].cardinality, Cardinality::OneToOne);
        assert!(relations[1].is_nullable);
    }

    #[rstest]
    fn test_relation_display() {
        let relations = user_and_post().relations();
        assert_eq!(relations[1].to_string(), "Post.author -> User.id (one-to-one)");
    }

    #[rstest]
    fn test_diagnostic_display() {
        let diagnostic = Diagnostic::type_error(4, "unknown type 'Ghost'");
        assert_eq!(diagnostic.to_string(), "line 4: type error: unknown type 'Ghost'");
    }

    #[rstest]
    fn test_cardinality_serializes_with_dashes() {
        let json = serde_json::to_string(&Cardinality::OneToMany).unwrap();
        assert_eq!(json, "\"one-to-many\"");
        assert_eq!(Cardinality::from_name("one-to-one"), Some(Cardinality::OneToOne));
    }
}

//! Two-pass SDL parser.
//!
//! Pass 1 registers every well-formed `entity <Name> {` header so that pass 2
//! can resolve references to entities declared later in the file. Errors are
//! accumulated on the returned [`Schema`]; parsing never stops early.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::lexer::{scan, SourceLine};
use super::model::{Diagnostic, Entity, Field, FieldModifiers, Schema, TypeShape};
use super::types::parse_type_expr;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

static ENTITY_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^entity\s+([A-Za-z_][A-Za-z0-9_]*)\s*\{$").expect("valid header regex")
});

/// Parse SDL source into a schema graph plus diagnostics.
pub fn parse(source: &str) -> Schema {
    Parser::new(source).parse()
}

/// Where pass 2 currently is.
enum Context {
    TopLevel,
    /// Index into `Parser::entities`.
    Entity(usize),
    /// Inside the block of a rejected header; its lines are ignored.
    Skipped,
}

/// Field-qualified reference awaiting validation after pass 2.
struct PendingReference {
    line: usize,
    entity: usize,
    field: String,
    target: String,
    target_field: String,
}

struct Parser<'a> {
    lines: Vec<SourceLine<'a>>,
    entities: Vec<Entity>,
    known: HashSet<String>,
    /// Line indices of headers accepted in pass 1.
    accepted_headers: HashSet<usize>,
    pending: Vec<PendingReference>,
    errors: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: scan(source),
            entities: Vec::new(),
            known: HashSet::new(),
            accepted_headers: HashSet::new(),
            pending: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn parse(mut self) -> Schema {
        self.register_entities();
        self.parse_fields();
        self.validate_references();

        self.errors.sort_by_key(|d| d.line);
        Schema {
            entities: self.entities,
            errors: self.errors,
        }
    }

    /// A line starting with the `entity` keyword, unless a `:` before any `{`
    /// makes it a field named `entity`.
    fn is_header(text: &str) -> bool {
        let head = text.split('{').next().unwrap_or(text);
        if head.contains(':') {
            return false;
        }

        text == "entity"
            || text
                .strip_prefix("entity")
                .is_some_and(|rest| rest.starts_with(char::is_whitespace) || rest.starts_with('{'))
    }

    /// Pass 1: collect entity names.
    fn register_entities(&mut self) {
        for (index, line) in self.lines.iter().enumerate() {
            if !Self::is_header(line.text) {
                continue;
            }

            let Some(captures) = ENTITY_HEADER.captures(line.text) else {
                self.errors.push(Diagnostic::syntax(
                    line.number,
                    format!("malformed entity header '{}', expected 'entity <Name> {{'", line.text),
                ));
                continue;
            };

            let name = captures[1].to_string();
            if !self.known.insert(name.clone()) {
                self.errors.push(Diagnostic::syntax(
                    line.number,
                    format!("duplicate entity '{}'", name),
                ));
                continue;
            }

            self.accepted_headers.insert(index);
            self.entities.push(Entity::new(name));
        }
    }

    /// Pass 2: fields, with every entity name already known.
    fn parse_fields(&mut self) {
        let mut context = Context::TopLevel;
        let mut next_entity = 0usize;

        for index in 0..self.lines.len() {
            let line = self.lines[index].clone();

            if Self::is_header(line.text) {
                context = if self.accepted_headers.contains(&index) {
                    next_entity += 1;
                    Context::Entity(next_entity - 1)
                } else {
                    Context::Skipped
                };
                continue;
            }

            if line.text == "}" {
                if matches!(context, Context::TopLevel) {
                    self.errors
                        .push(Diagnostic::syntax(line.number, "unmatched '}'"));
                }
                context = Context::TopLevel;
                continue;
            }

            match context {
                Context::Skipped => {}
                Context::TopLevel => {
                    self.errors.push(Diagnostic::syntax(
                        line.number,
                        format!("unexpected '{}' outside of an entity", line.text),
                    ));
                }
                Context::Entity(entity) => {
                    if line.text.contains(':') {
                        self.parse_field(entity, &line);
                    } else {
                        self.errors.push(Diagnostic::syntax(
                            line.number,
                            format!("expected field declaration '<name>: <type>', found '{}'", line.text),
                        ));
                    }
                }
            }
        }
    }

    fn parse_field(&mut self, entity: usize, line: &SourceLine<'_>) {
        let Some((name, rest)) = line.text.split_once(':') else {
            return;
        };
        let name = name.trim();

        if !IDENTIFIER.is_match(name) {
            self.errors.push(Diagnostic::syntax(
                line.number,
                format!("invalid field name '{}'", name),
            ));
            return;
        }

        if self.entities[entity].field(name).is_some() {
            self.errors.push(Diagnostic::syntax(
                line.number,
                format!("duplicate field '{}' in entity '{}'", name, self.entities[entity].name),
            ));
            return;
        }

        let (type_expr, modifiers) = match rest.find('@') {
            Some(at) => (&rest[..at], &rest[at..]),
            None => (rest, ""),
        };

        let field_type = match parse_type_expr(type_expr, &self.known) {
            Ok(field_type) => field_type,
            Err(e) => {
                self.errors.push(Diagnostic::type_error(
                    line.number,
                    format!("field '{}': {}", name, e),
                ));
                return;
            }
        };

        let modifiers = self.parse_modifiers(line.number, modifiers);

        if let TypeShape::EntityRef {
            entity: target,
            field: Some(target_field),
        } = &field_type.shape
        {
            self.pending.push(PendingReference {
                line: line.number,
                entity,
                field: name.to_string(),
                target: target.clone(),
                target_field: target_field.clone(),
            });
        }

        self.entities[entity]
            .fields
            .push(Field::new(name, field_type).with_modifiers(modifiers));
    }

    /// Parse `@name`, `@name(value)` and `@name=value` clauses.
    ///
    /// Problems are reported but never reject the field; the modifiers read
    /// up to that point are kept.
    fn parse_modifiers(&mut self, line: usize, text: &str) -> FieldModifiers {
        let mut modifiers = FieldModifiers::default();
        let mut rest = text.trim_start();

        while !rest.is_empty() {
            let Some(after_at) = rest.strip_prefix('@') else {
                self.errors.push(Diagnostic::syntax(
                    line,
                    format!("unexpected '{}' after field type", rest.trim_end()),
                ));
                break;
            };

            let name_len = after_at
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after_at.len());
            let name = &after_at[..name_len];
            let (value, remaining) = match take_modifier_value(&after_at[name_len..]) {
                Ok(parts) => parts,
                Err(message) => {
                    self.errors
                        .push(Diagnostic::syntax(line, format!("@{}: {}", name, message)));
                    break;
                }
            };
            rest = remaining.trim_start();

            self.apply_modifier(line, name, value, &mut modifiers);
        }

        if modifiers.is_primary {
            modifiers.is_nullable = false;
        }
        modifiers
    }

    fn apply_modifier(
        &mut self,
        line: usize,
        name: &str,
        value: Option<&str>,
        modifiers: &mut FieldModifiers,
    ) {
        match (name, value) {
            ("primary", None) => {
                modifiers.is_primary = true;
                modifiers.is_nullable = false;
            }
            ("unique", None) => modifiers.is_unique = true,
            ("index", None) => modifiers.is_index = true,
            ("nullable", None) | ("nullable", Some("true")) => modifiers.is_nullable = true,
            ("nullable", Some("false")) => modifiers.is_nullable = false,
            ("nullable", Some(other)) => self.errors.push(Diagnostic::syntax(
                line,
                format!("@nullable expects true or false, found '{}'", other),
            )),
            ("default", Some(raw)) => modifiers.default_value = Some(raw.to_string()),
            ("default", None) => self
                .errors
                .push(Diagnostic::syntax(line, "@default requires a value")),
            ("primary" | "unique" | "index", Some(_)) => self.errors.push(Diagnostic::syntax(
                line,
                format!("@{} does not take a value", name),
            )),
            _ => self.errors.push(Diagnostic::syntax(
                line,
                format!("unknown modifier '@{}'", name),
            )),
        }
    }

    /// Drop fields whose `Entity.field` qualifier names a missing field.
    ///
    /// Repeats until stable, since a dropped field may itself have been the
    /// target of another qualified reference.
    fn validate_references(&mut self) {
        loop {
            let entities = &self.entities;
            let (kept, dropped): (Vec<_>, Vec<_>) =
                std::mem::take(&mut self.pending)
                    .into_iter()
                    .partition(|reference| {
                        entities
                            .iter()
                            .find(|e| e.name == reference.target)
                            .is_some_and(|e| e.field(&reference.target_field).is_some())
                    });
            self.pending = kept;

            if dropped.is_empty() {
                break;
            }

            for reference in dropped {
                self.entities[reference.entity]
                    .fields
                    .retain(|f| f.name != reference.field);
                self.errors.push(Diagnostic::type_error(
                    reference.line,
                    format!(
                        "field '{}': entity '{}' has no field '{}'",
                        reference.field, reference.target, reference.target_field
                    ),
                ));
            }
        }
    }
}

/// Split an optional modifier value off the text following a modifier name.
fn take_modifier_value(text: &str) -> Result<(Option<&str>, &str), &'static str> {
    if let Some(inner) = text.strip_prefix('(') {
        let mut depth = 1usize;
        for (i, c) in inner.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok((Some(inner[..i].trim()), &inner[i + 1..]));
                    }
                }
                _ => {}
            }
        }
        return Err("missing closing ')'");
    }

    if let Some(value) = text.strip_prefix('=') {
        let end = value.find(char::is_whitespace).unwrap_or(value.len());
        let raw = &value[..end];
        // Values are always rendered back as `@name(value)`.
        if !parentheses_balanced(raw) {
            return Err("unbalanced parentheses in value");
        }
        return Ok((Some(raw), &value[end..]));
    }

    Ok((None, text))
}

fn parentheses_balanced(text: &str) -> bool {
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdl::model::{Cardinality, DiagnosticKind, FieldType, ScalarKind};
    use rstest::rstest;

    const BLOG: &str = "\
// Blog schema
entity User {
  id: ID @primary
  email: email @unique
  role: enum(admin, member) @default(member)
  posts: Post[]
}

entity Post {
  id: ID @primary
  author: User.id @nullable(false)
  title: string @index
  body: text
}
";

    #[rstest]
    fn test_parse_blog_schema() {
        let schema = parse(BLOG);

        assert!(schema.is_valid(), "unexpected errors: {:?}", schema.errors);
        assert_eq!(schema.entities.len(), 2);
        assert_eq!(schema.entities[0].name, "User");
        assert_eq!(schema.entities[0].fields.len(), 4);
        assert_eq!(schema.entities[1].fields.len(), 4);

        let email = schema.entities[0].field("email").unwrap();
        assert_eq!(email.field_type, FieldType::scalar(ScalarKind::Email));
        assert!(email.modifiers.is_unique);

        let author = schema.entities[1].field("author").unwrap();
        assert!(!author.modifiers.is_nullable);
    }

    #[rstest]
    fn test_relations_from_blog_schema() {
        let relations = parse(BLOG).relations();

        assert_eq!(relations.len(), 2);
        assert_eq!(relations[0].to_string(), "User.posts -> Post.id (one-to-many)");
        assert_eq!(relations[1].to_string(), "Post.author -> User.id (one-to-one)");
        assert!(!relations[1].is_nullable);
    }

    #[rstest]
    fn test_forward_reference_on_one_line() {
        let schema = parse("entity A { b: B } entity B { id: ID @primary }");

        assert!(schema.is_valid(), "unexpected errors: {:?}", schema.errors);
        let relations = schema.relations();
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].from_entity, "A");
        assert_eq!(relations[0].from_field, "b");
        assert_eq!(relations[0].to_entity, "B");
        assert_eq!(relations[0].to_field, "id");
        assert_eq!(relations[0].cardinality, Cardinality::OneToOne);
    }

    #[rstest]
    fn test_array_reference_is_one_to_many() {
        let schema = parse("entity A {\n  children: B[]\n}\nentity B {\n  id: ID\n}");
        assert!(schema.is_valid());
        assert_eq!(schema.relations()[0].cardinality, Cardinality::OneToMany);
    }

    #[rstest]
    fn test_enum_with_default() {
        let schema = parse("entity Account {\n  status: enum(active,suspended) @default(active)\n}");
        let status = schema.entities[0].field("status").unwrap();

        assert_eq!(
            status.field_type,
            FieldType::enumeration(vec!["active".to_string(), "suspended".to_string()])
        );
        assert_eq!(status.modifiers.default_value.as_deref(), Some("active"));
    }

    #[rstest]
    fn test_dangling_reference() {
        let schema = parse("entity A {\n  id: ID\n  x: Ghost\n}");

        assert!(!schema.is_valid());
        assert_eq!(schema.errors.len(), 1);
        assert_eq!(schema.errors[0].kind, DiagnosticKind::Type);
        assert_eq!(schema.errors[0].line, 3);
        assert!(schema.errors[0].message.contains("Ghost"));
        assert!(schema.entities[0].field("x").is_none());
        assert_eq!(schema.entities[0].fields.len(), 1);
    }

    #[rstest]
    #[case("@primary @nullable(true)")]
    #[case("@nullable(true) @primary")]
    #[case("@nullable=true @primary")]
    fn test_primary_wins_over_nullable(#[case] modifiers: &str) {
        let source = format!("entity A {{\n  id: ID {}\n}}", modifiers);
        let schema = parse(&source);
        let id = schema.entities[0].field("id").unwrap();

        assert!(schema.is_valid());
        assert!(id.modifiers.is_primary);
        assert!(!id.modifiers.is_nullable);
    }

    #[rstest]
    fn test_duplicate_entity_reports_duplicate_line() {
        let schema = parse("entity A {\n  id: ID\n}\nentity A {\n  name: string\n}");

        assert!(!schema.is_valid());
        assert_eq!(schema.errors.len(), 1);
        assert_eq!(schema.errors[0].line, 4);
        assert!(schema.errors[0].message.contains("duplicate entity 'A'"));
        assert_eq!(schema.entities.len(), 1);
        assert_eq!(schema.entities[0].fields.len(), 1);
    }

    #[rstest]
    fn test_duplicate_field_reports_duplicate_line() {
        let schema = parse("entity A {\n  name: string\n  name: text\n}");

        assert!(!schema.is_valid());
        assert_eq!(schema.errors[0].line, 3);
        assert!(schema.errors[0].message.contains("duplicate field 'name'"));
        assert_eq!(
            schema.entities[0].fields[0].field_type,
            FieldType::scalar(ScalarKind::String)
        );
    }

    #[rstest]
    #[case("entity {")]
    #[case("entity User")]
    #[case("entity 9User {")]
    fn test_malformed_header_is_skipped(#[case] header: &str) {
        let source = format!("{}\n  id: ID\n}}\nentity B {{\n  id: ID\n}}", header);
        let schema = parse(&source);

        assert_eq!(schema.errors.len(), 1, "errors: {:?}", schema.errors);
        assert_eq!(schema.errors[0].line, 1);
        assert_eq!(schema.entities.len(), 1);
        assert_eq!(schema.entities[0].name, "B");
    }

    #[rstest]
    fn test_invalid_field_name_is_skipped() {
        let schema = parse("entity A {\n  first-name: string\n  age: int\n}");

        assert_eq!(schema.errors.len(), 1);
        assert_eq!(schema.errors[0].kind, DiagnosticKind::Syntax);
        assert_eq!(schema.entities[0].fields.len(), 1);
        assert_eq!(schema.entities[0].fields[0].name, "age");
    }

    #[rstest]
    fn test_unknown_modifier_keeps_field() {
        let schema = parse("entity A {\n  code: string @unique @sparkly @index\n}");
        let code = schema.entities[0].field("code").unwrap();

        assert_eq!(schema.errors.len(), 1);
        assert!(schema.errors[0].message.contains("@sparkly"));
        assert!(code.modifiers.is_unique);
        assert!(code.modifiers.is_index);
    }

    #[rstest]
    fn test_invalid_nullable_literal() {
        let schema = parse("entity A {\n  code: string @nullable(maybe)\n}");
        assert_eq!(schema.errors.len(), 1);
        assert!(schema.entities[0].field("code").unwrap().modifiers.is_nullable);
    }

    #[rstest]
    fn test_default_with_nested_parentheses_and_spaces() {
        let schema = parse("entity A {\n  created: datetime @default(now())\n  note: string @default(hello world)\n}");

        assert!(schema.is_valid());
        let created = schema.entities[0].field("created").unwrap();
        assert_eq!(created.modifiers.default_value.as_deref(), Some("now()"));
        let note = schema.entities[0].field("note").unwrap();
        assert_eq!(note.modifiers.default_value.as_deref(), Some("hello world"));
    }

    #[rstest]
    fn test_default_with_equals_form() {
        let schema = parse("entity A {\n  count: int @default=0 @index\n}");
        let count = schema.entities[0].field("count").unwrap();

        assert!(schema.is_valid());
        assert_eq!(count.modifiers.default_value.as_deref(), Some("0"));
        assert!(count.modifiers.is_index);
    }

    #[rstest]
    #[case("entity: string")]
    #[case("entity : string")]
    #[case("entity   :string @index")]
    fn test_field_named_entity(#[case] line: &str) {
        let source = format!("entity A {{\n  id: ID @primary\n  {}\n  title: string\n}}", line);
        let schema = parse(&source);

        assert!(schema.is_valid(), "unexpected errors: {:?}", schema.errors);
        let names: Vec<&str> = schema.entities[0].fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "entity", "title"]);
        assert_eq!(
            schema.entities[0].field("entity").unwrap().field_type,
            FieldType::scalar(ScalarKind::String)
        );
    }

    #[rstest]
    #[case("@default=a)")]
    #[case("@default=(a")]
    #[case("@default=a)(b")]
    fn test_default_equals_form_rejects_unbalanced_parentheses(#[case] modifier: &str) {
        let source = format!("entity A {{\n  note: string {}\n}}", modifier);
        let schema = parse(&source);

        assert_eq!(schema.errors.len(), 1, "errors: {:?}", schema.errors);
        assert_eq!(schema.errors[0].kind, DiagnosticKind::Syntax);
        assert_eq!(schema.errors[0].line, 2);
        assert!(schema.errors[0].message.contains("unbalanced parentheses"));
        let note = schema.entities[0].field("note").unwrap();
        assert_eq!(note.modifiers.default_value, None);
    }

    #[rstest]
    fn test_qualified_reference_to_missing_field() {
        let schema = parse("entity A {\n  owner: B.code\n}\nentity B {\n  id: ID\n}");

        assert_eq!(schema.errors.len(), 1);
        assert_eq!(schema.errors[0].line, 2);
        assert!(schema.errors[0].message.contains("no field 'code'"));
        assert!(schema.entities[0].fields.is_empty());
    }

    #[rstest]
    fn test_qualified_reference_drop_cascades() {
        let source = "entity A {\n  b: B.c_ref\n}\nentity B {\n  c_ref: C.missing\n}\nentity C {\n  id: ID\n}";
        let schema = parse(source);

        assert_eq!(schema.errors.len(), 2);
        assert!(schema.entities[0].fields.is_empty());
        assert!(schema.entities[1].fields.is_empty());
    }

    #[rstest]
    fn test_errors_accumulate_across_lines() {
        let source = "entity A {\n  x: Ghost\n  y: string @bogus\n  z: enum()\n  ok: int\n}\n}";
        let schema = parse(source);

        let lines: Vec<usize> = schema.errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![2, 3, 4, 7]);
        let names: Vec<&str> = schema.entities[0].fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["y", "ok"]);
    }

    #[rstest]
    fn test_text_outside_entity() {
        let schema = parse("name: string\nentity A {\n  id: ID\n}");
        assert_eq!(schema.errors.len(), 1);
        assert_eq!(schema.errors[0].line, 1);
    }

    #[rstest]
    fn test_non_field_line_inside_entity() {
        let schema = parse("entity A {\n  id ID\n}");
        assert_eq!(schema.errors.len(), 1);
        assert!(schema.errors[0].message.contains("expected field declaration"));
    }

    #[rstest]
    fn test_unclosed_entity_closes_at_next_header() {
        let schema = parse("entity A {\n  id: ID\nentity B {\n  a: A\n}");

        assert!(schema.is_valid());
        assert_eq!(schema.entities[0].fields.len(), 1);
        assert_eq!(schema.entities[1].fields.len(), 1);
    }

    #[rstest]
    fn test_empty_source_is_valid() {
        let schema = parse("");
        assert!(schema.is_valid());
        assert!(schema.entities.is_empty());
    }
}

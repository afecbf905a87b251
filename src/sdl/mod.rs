//! Schema definition language: scanning, parsing, type resolution and
//! canonical serialization.
//!
//! ```text
//! entity User {
//!   id: ID @primary
//!   posts: Post[]
//! }
//! ```
//!
//! Parsing and serialization are pure functions; they can run concurrently
//! without coordination.

pub mod lexer;
pub mod model;
pub mod parser;
pub mod serializer;
pub mod types;

pub use model::{
    Cardinality, Diagnostic, DiagnosticKind, Entity, Field, FieldModifiers, FieldType,
    Relation, ScalarKind, Schema, TypeShape,
};
pub use parser::parse;
pub use serializer::serialize;
pub use types::{classify, TypeClass};

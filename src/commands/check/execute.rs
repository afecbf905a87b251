use std::error::Error;

use serde::Serialize;

use super::CheckCmd;
use crate::commands::{read_source, Context, Execute};
use crate::sdl::{self, Diagnostic, Relation};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySummary {
    pub name: String,
    pub fields: usize,
    pub identifier: String,
}

/// Outcome of parsing one SDL file.
#[derive(Debug, Default, Serialize)]
pub struct CheckResult {
    pub file: String,
    pub valid: bool,
    pub entities: Vec<EntitySummary>,
    pub relations: Vec<Relation>,
    pub errors: Vec<Diagnostic>,
}

impl CheckResult {
    pub fn from_source(file: impl Into<String>, source: &str) -> Self {
        let schema = sdl::parse(source);

        let entities = schema
            .entities
            .iter()
            .map(|entity| EntitySummary {
                name: entity.name.clone(),
                fields: entity.fields.len(),
                identifier: entity.identifier_field().to_string(),
            })
            .collect();

        Self {
            file: file.into(),
            valid: schema.is_valid(),
            entities,
            relations: schema.relations(),
            errors: schema.errors,
        }
    }
}

impl Execute for CheckCmd {
    type Output = CheckResult;

    fn execute(self, _ctx: &Context) -> Result<Self::Output, Box<dyn Error>> {
        let source = read_source(&self.file)?;
        Ok(CheckResult::from_source(self.file.display().to_string(), &source))
    }
}

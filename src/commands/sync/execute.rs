use std::error::Error;

use serde::Serialize;

use super::SyncCmd;
use crate::commands::{read_source, Context, Execute};
use crate::output::format_diagnostics;
use crate::store::ClearCounts;
use crate::sync::{save_schema_text, DroppedRelation, SyncError, SyncOutcome};

/// Summary of a committed replace.
#[derive(Debug, Default, Serialize)]
pub struct SyncResult {
    pub data_model_id: String,
    pub revision: i64,
    pub entities: usize,
    pub fields: usize,
    pub relations: usize,
    pub cleared: ClearCounts,
    pub dropped_relations: Vec<DroppedRelation>,
}

impl From<SyncOutcome> for SyncResult {
    fn from(outcome: SyncOutcome) -> Self {
        Self {
            data_model_id: outcome.data_model_id,
            revision: outcome.revision,
            entities: outcome.persisted.entities.len(),
            fields: outcome.persisted.fields.len(),
            relations: outcome.persisted.relations.len(),
            cleared: outcome.cleared,
            dropped_relations: outcome.dropped_relations,
        }
    }
}

impl Execute for SyncCmd {
    type Output = SyncResult;

    fn execute(self, ctx: &Context) -> Result<Self::Output, Box<dyn Error>> {
        let source = read_source(&self.file)?;
        let store = ctx.connect()?;

        match save_schema_text(store.as_ref(), ctx.principal(), &self.model, &source) {
            Ok(outcome) => Ok(outcome.into()),
            Err(SyncError::InvalidSchema { errors }) => Err(format!(
                "{} was not saved\n{}",
                self.file.display(),
                format_diagnostics(&errors)
            )
            .into()),
            Err(e) => Err(e.into()),
        }
    }
}

//! Output formatting for check command results.

use super::execute::CheckResult;
use crate::output::{format_diagnostics, Outputable};

impl Outputable for CheckResult {
    fn to_table(&self) -> String {
        let mut output = String::new();

        let status = if self.valid { "valid" } else { "invalid" };
        output.push_str(&format!("{}: {}\n", self.file, status));

        output.push_str(&format!("\nEntities ({}):\n", self.entities.len()));
        for entity in &self.entities {
            output.push_str(&format!(
                "  {} ({} fields, identifier {})\n",
                entity.name, entity.fields, entity.identifier
            ));
        }

        if !self.relations.is_empty() {
            output.push_str(&format!("\nRelations ({}):\n", self.relations.len()));
            for relation in &self.relations {
                output.push_str(&format!("  {}\n", relation));
            }
        }

        if !self.errors.is_empty() {
            output.push('\n');
            output.push_str(&format_diagnostics(&self.errors));
        }

        output
    }
}

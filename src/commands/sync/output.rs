//! Output formatting for sync command results.

use super::execute::SyncResult;
use crate::output::Outputable;

impl Outputable for SyncResult {
    fn to_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "Data model {} saved (revision {})\n",
            self.data_model_id, self.revision
        ));

        let cleared = &self.cleared;
        if cleared.entities + cleared.fields + cleared.relations > 0 {
            output.push_str(&format!(
                "Replaced {} entities, {} fields, {} relations\n",
                cleared.entities, cleared.fields, cleared.relations
            ));
        }

        output.push_str("\nStored:\n");
        output.push_str(&format!("  Entities:  {:>5}\n", self.entities));
        output.push_str(&format!("  Fields:    {:>5}\n", self.fields));
        output.push_str(&format!("  Relations: {:>5}", self.relations));

        if !self.dropped_relations.is_empty() {
            output.push_str(&format!(
                "\n\nDropped relations ({}):",
                self.dropped_relations.len()
            ));
            for dropped in &self.dropped_relations {
                output.push_str(&format!("\n  {}", dropped));
            }
        }

        output
    }
}

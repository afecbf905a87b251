//! Output formatting for show command results.

use super::execute::ShowResult;
use crate::output::Outputable;

impl Outputable for ShowResult {
    fn to_table(&self) -> String {
        if let Some(sdl) = &self.sdl {
            return sdl.trim_end().to_string();
        }

        let mut output = format!(
            "Data model {} ({}) owned by {}, revision {}\n",
            self.name, self.id, self.owner, self.revision
        );

        if self.entities.is_empty() {
            output.push_str("\nNo schema stored yet.");
            return output;
        }

        for entity in &self.entities {
            output.push_str(&format!("\n{}\n", entity.name));
            for field in &entity.fields {
                output.push_str(&format!("  {}\n", field));
            }
        }

        if !self.relations.is_empty() {
            output.push_str(&format!("\nRelations ({}):\n", self.relations.len()));
            for relation in &self.relations {
                output.push_str(&format!("  {}\n", relation));
            }
        }

        output.trim_end().to_string()
    }
}

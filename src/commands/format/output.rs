//! Output formatting for format command results.

use super::execute::FormatResult;
use crate::output::Outputable;

impl Outputable for FormatResult {
    fn to_table(&self) -> String {
        if self.written {
            format!("Formatted {}", self.file)
        } else if self.changed || self.canonical.is_empty() {
            self.canonical.trim_end().to_string()
        } else {
            format!("{}\n\n{} is already canonical", self.canonical.trim_end(), self.file)
        }
    }
}

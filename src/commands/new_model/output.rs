use super::execute::NewModelResult;
use crate::output::Outputable;

impl Outputable for NewModelResult {
    fn to_table(&self) -> String {
        format!(
            "Created data model '{}' owned by {}\n  id: {}",
            self.name, self.owner, self.id
        )
    }
}

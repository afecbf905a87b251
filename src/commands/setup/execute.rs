use std::error::Error;

use serde::Serialize;

use super::SetupCmd;
use crate::commands::{Context, Execute};
use crate::store::RELATION_NAMES;

/// Status of a store relation (table)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RelationState {
    #[serde(rename = "created")]
    Created,
    #[serde(rename = "exists")]
    AlreadyExists,
    #[serde(rename = "would_create")]
    WouldCreate,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetupRelation {
    pub name: String,
    pub status: RelationState,
}

/// Result of the setup command execution
#[derive(Debug, Serialize)]
pub struct SetupResult {
    pub backend: String,
    pub relations: Vec<SetupRelation>,
    pub created_new: bool,
    pub dry_run: bool,
}

impl Execute for SetupCmd {
    type Output = SetupResult;

    fn execute(self, ctx: &Context) -> Result<Self::Output, Box<dyn Error>> {
        if self.dry_run {
            let relations = RELATION_NAMES
                .iter()
                .map(|name| SetupRelation {
                    name: name.to_string(),
                    status: RelationState::WouldCreate,
                })
                .collect();

            return Ok(SetupResult {
                backend: ctx.db.backend_name().to_string(),
                relations,
                created_new: false,
                dry_run: true,
            });
        }

        let store = ctx.connect()?;
        let relations: Vec<SetupRelation> = store
            .setup()?
            .into_iter()
            .map(|status| SetupRelation {
                name: status.relation,
                status: if status.created {
                    RelationState::Created
                } else {
                    RelationState::AlreadyExists
                },
            })
            .collect();

        let created_new = relations
            .iter()
            .any(|r| r.status == RelationState::Created);

        Ok(SetupResult {
            backend: store.backend_name().to_string(),
            relations,
            created_new,
            dry_run: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sqlite_context;
    use rstest::rstest;

    #[rstest]
    fn test_setup_creates_all_relations() {
        let (_dir, ctx) = sqlite_context(None);
        let result = SetupCmd { dry_run: false }
            .execute(&ctx)
            .expect("Setup should succeed");

        assert_eq!(result.backend, "CozoSqlite");
        assert_eq!(result.relations.len(), 4);
        assert!(result
            .relations
            .iter()
            .all(|r| r.status == RelationState::Created));
        assert!(result.created_new);
    }

    #[rstest]
    fn test_setup_idempotent() {
        let (_dir, ctx) = sqlite_context(None);
        let first = SetupCmd { dry_run: false }.execute(&ctx).unwrap();
        assert!(first.created_new);

        let second = SetupCmd { dry_run: false }.execute(&ctx).unwrap();
        assert_eq!(second.relations.len(), 4);
        assert!(second
            .relations
            .iter()
            .all(|r| r.status == RelationState::AlreadyExists));
        assert!(!second.created_new);
    }

    #[rstest]
    fn test_setup_dry_run_touches_nothing() {
        let (dir, ctx) = sqlite_context(None);
        let result = SetupCmd { dry_run: true }.execute(&ctx).unwrap();

        assert!(result.dry_run);
        assert!(!result.created_new);
        let names: Vec<_> = result.relations.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, RELATION_NAMES);
        assert!(!dir.path().join("schema.sqlite").exists());
    }
}

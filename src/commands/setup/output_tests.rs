//! Output formatting tests for setup command.

#[cfg(test)]
mod tests {
    use super::super::execute::{RelationState, SetupRelation, SetupResult};
    use rstest::{fixture, rstest};

    const CREATED_TABLE_OUTPUT: &str = "\
Store Setup

Schema creation (CozoSqlite):
  ✓ data_models (created)
  ✓ sdl_entities (exists)

Store ready.";

    const DRY_RUN_TABLE_OUTPUT: &str = "\
Store Setup

Schema creation (dry-run):
  → data_models (would create)

No changes made (dry-run mode).";

    #[fixture]
    fn created_result() -> SetupResult {
        SetupResult {
            backend: "CozoSqlite".to_string(),
            relations: vec![
                SetupRelation {
                    name: "data_models".to_string(),
                    status: RelationState::Created,
                },
                SetupRelation {
                    name: "sdl_entities".to_string(),
                    status: RelationState::AlreadyExists,
                },
            ],
            created_new: true,
            dry_run: false,
        }
    }

    #[fixture]
    fn dry_run_result() -> SetupResult {
        SetupResult {
            backend: "CozoMem".to_string(),
            relations: vec![SetupRelation {
                name: "data_models".to_string(),
                status: RelationState::WouldCreate,
            }],
            created_new: false,
            dry_run: true,
        }
    }

    crate::output_table_test! {
        test_name: test_to_table_created,
        fixture: created_result,
        fixture_type: SetupResult,
        expected: CREATED_TABLE_OUTPUT,
    }

    crate::output_table_test! {
        test_name: test_to_table_dry_run,
        fixture: dry_run_result,
        fixture_type: SetupResult,
        expected: DRY_RUN_TABLE_OUTPUT,
    }

    crate::output_json_test! {
        test_name: test_format_json,
        fixture: created_result,
        fixture_type: SetupResult,
        assertions: {
            "created_new": true,
            "dry_run": false,
        },
    }

    crate::output_toon_test! {
        test_name: test_format_toon,
        fixture: created_result,
        fixture_type: SetupResult,
        contains: ["created_new: true", "backend: CozoSqlite"],
    }
}

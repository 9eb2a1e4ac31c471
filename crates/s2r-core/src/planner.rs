//! Reconciliation planning.
//!
//! The decision core: given the routed action, the warehouse's current table
//! state, and the resolved schema, emit the ordered operation list that
//! reconciles reality with intent. Planning is pure; nothing touches the
//! warehouse until the plan is executed.
//!
//! Decision table over `(action, exists, columns_match)`:
//!
//! | action   | exists | match | operations                     | mode     |
//! |----------|--------|-------|--------------------------------|----------|
//! | schema   | any    | n/a   | DROP IF EXISTS, CREATE, COPY   | schema   |
//! | append   | no     | n/a   | CREATE, COPY                   | append   |
//! | append   | yes    | yes   | COPY                           | append   |
//! | append   | yes    | no    | fail (schema mismatch)         | —        |
//! | truncate | no     | n/a   | CREATE, COPY                   | truncate |
//! | truncate | yes    | yes   | TRUNCATE, COPY                 | truncate |
//! | truncate | yes    | no    | fail (schema mismatch)         | —        |
//! | other    | any    | any   | fail (unknown action)          | —        |

use crate::router::{LoadAction, RoutingInfo};
use crate::schema::SchemaDefinition;
use crate::warehouse::TableState;
use crate::{Result, RoutingError, SchemaError};
use serde::Serialize;

/// A single planned warehouse operation. Pure data until rendered to SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// `DROP TABLE IF EXISTS`
    DropIfExists,
    /// `CREATE TABLE` from the resolved schema's columns
    Create,
    /// `TRUNCATE TABLE`
    Truncate,
    /// Bulk-copy the source file into the table
    Copy,
}

/// The reconciliation strategy chosen for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Recreate the table, then load
    Schema,
    /// Add rows to the existing contents
    Append,
    /// Replace the contents, keeping the structure
    Truncate,
}

impl std::fmt::Display for LoadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Schema => "schema",
            Self::Append => "append",
            Self::Truncate => "truncate",
        };
        f.write_str(s)
    }
}

/// An ordered operation sequence plus its load-mode tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadPlan {
    /// Operations in execution order
    pub operations: Vec<Operation>,
    /// The chosen reconciliation strategy
    pub load_mode: LoadMode,
}

/// Ordered, name-exact column comparison.
///
/// Reordering, casing differences, and extra or missing columns all count as
/// mismatch.
fn columns_match(expected: &SchemaDefinition, actual: &[String]) -> bool {
    expected.columns.len() == actual.len()
        && expected
            .columns
            .iter()
            .zip(actual)
            .all(|(e, a)| e.name == *a)
}

/// Plan the operations that reconcile the table with the resolved schema.
///
/// Append and truncate deliberately refuse to auto-migrate: a structural
/// mismatch fails, instructing the caller to run a `schema` action.
pub fn plan(
    routing: &RoutingInfo,
    state: &TableState,
    schema: &SchemaDefinition,
) -> Result<LoadPlan> {
    let plan = match routing.action {
        // Idempotent via drop-then-create regardless of prior state.
        LoadAction::Schema => LoadPlan {
            operations: vec![Operation::DropIfExists, Operation::Create, Operation::Copy],
            load_mode: LoadMode::Schema,
        },

        LoadAction::Append => {
            if !state.exists {
                LoadPlan {
                    operations: vec![Operation::Create, Operation::Copy],
                    load_mode: LoadMode::Append,
                }
            } else if columns_match(schema, &state.columns) {
                LoadPlan {
                    operations: vec![Operation::Copy],
                    load_mode: LoadMode::Append,
                }
            } else {
                return Err(mismatch(routing, state, schema));
            }
        }

        LoadAction::Truncate => {
            if !state.exists {
                LoadPlan {
                    operations: vec![Operation::Create, Operation::Copy],
                    load_mode: LoadMode::Truncate,
                }
            } else if columns_match(schema, &state.columns) {
                LoadPlan {
                    operations: vec![Operation::Truncate, Operation::Copy],
                    load_mode: LoadMode::Truncate,
                }
            } else {
                return Err(mismatch(routing, state, schema));
            }
        }

        LoadAction::Unknown => {
            return Err(RoutingError::UnknownAction {
                action: routing.raw_action.clone(),
            }
            .into())
        }
    };

    Ok(plan)
}

fn mismatch(
    routing: &RoutingInfo,
    state: &TableState,
    schema: &SchemaDefinition,
) -> crate::Error {
    SchemaError::Mismatch {
        table: format!("{}.{}", routing.database_name, routing.table_name),
        expected: schema.columns.iter().map(|c| c.name.clone()).collect(),
        actual: state.columns.clone(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router;
    use crate::schema::ColumnDef;

    fn schema_of(names: &[&str]) -> SchemaDefinition {
        SchemaDefinition {
            schema_version: "test".into(),
            columns: names
                .iter()
                .map(|n| ColumnDef {
                    name: n.to_string(),
                    column_type: "VARCHAR(65535)".into(),
                    nullable: true,
                })
                .collect(),
        }
    }

    fn routing_for(action: &str) -> crate::router::RoutingInfo {
        router::parse(&format!("sales/{action}/orders/file.csv")).unwrap()
    }

    #[test]
    fn test_schema_action_plans_drop_create_copy() {
        for state in [
            TableState::absent(),
            TableState::existing(vec!["anything".into()]),
        ] {
            let plan = plan(&routing_for("schema"), &state, &schema_of(&["id", "amount"])).unwrap();
            assert_eq!(
                plan.operations,
                vec![Operation::DropIfExists, Operation::Create, Operation::Copy]
            );
            assert_eq!(plan.load_mode, LoadMode::Schema);
        }
    }

    #[test]
    fn test_append_missing_table_bootstraps() {
        let plan = plan(
            &routing_for("append"),
            &TableState::absent(),
            &schema_of(&["id", "amount"]),
        )
        .unwrap();
        assert_eq!(plan.operations, vec![Operation::Create, Operation::Copy]);
        assert_eq!(plan.load_mode, LoadMode::Append);
    }

    #[test]
    fn test_append_matching_table_copies_only() {
        let plan = plan(
            &routing_for("append"),
            &TableState::existing(vec!["id".into(), "amount".into()]),
            &schema_of(&["id", "amount"]),
        )
        .unwrap();
        assert_eq!(plan.operations, vec![Operation::Copy]);
    }

    #[test]
    fn test_append_mismatched_table_fails() {
        let err = plan(
            &routing_for("append"),
            &TableState::existing(vec!["id".into(), "total".into()]),
            &schema_of(&["id", "amount"]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Schema(SchemaError::Mismatch { .. })
        ));
    }

    #[test]
    fn test_truncate_missing_table_bootstraps() {
        let plan = plan(
            &routing_for("truncate"),
            &TableState::absent(),
            &schema_of(&["id", "amount"]),
        )
        .unwrap();
        assert_eq!(plan.operations, vec![Operation::Create, Operation::Copy]);
        assert_eq!(plan.load_mode, LoadMode::Truncate);
    }

    #[test]
    fn test_truncate_matching_table_truncates_then_copies() {
        let plan = plan(
            &routing_for("truncate"),
            &TableState::existing(vec!["id".into(), "amount".into()]),
            &schema_of(&["id", "amount"]),
        )
        .unwrap();
        assert_eq!(plan.operations, vec![Operation::Truncate, Operation::Copy]);
        assert_eq!(plan.load_mode, LoadMode::Truncate);
    }

    #[test]
    fn test_truncate_mismatched_table_fails() {
        let err = plan(
            &routing_for("truncate"),
            &TableState::existing(vec!["amount".into(), "id".into()]),
            &schema_of(&["id", "amount"]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Schema(SchemaError::Mismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_action_fails() {
        let err = plan(
            &routing_for("merge"),
            &TableState::absent(),
            &schema_of(&["id"]),
        )
        .unwrap_err();
        match err {
            crate::Error::Routing(RoutingError::UnknownAction { action }) => {
                assert_eq!(action, "merge");
            }
            other => panic!("expected unknown action, got {other}"),
        }
    }

    #[test]
    fn test_column_comparison_is_order_sensitive() {
        let schema = schema_of(&["a", "b"]);
        assert!(columns_match(&schema, &["a".into(), "b".into()]));
        assert!(!columns_match(&schema, &["b".into(), "a".into()]));
    }

    #[test]
    fn test_column_comparison_is_case_sensitive() {
        let schema = schema_of(&["id"]);
        assert!(!columns_match(&schema, &["ID".into()]));
    }

    #[test]
    fn test_column_comparison_rejects_extra_and_missing() {
        let schema = schema_of(&["a", "b"]);
        assert!(!columns_match(&schema, &["a".into()]));
        assert!(!columns_match(&schema, &["a".into(), "b".into(), "c".into()]));
    }
}

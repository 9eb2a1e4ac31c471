//! Warehouse access.
//!
//! [`Warehouse`] abstracts the two operations the engine performs against
//! the columnar warehouse: a catalog probe and transactional statement
//! execution. The concrete implementation speaks the Postgres wire protocol
//! to Redshift; tests substitute a mock.

mod redshift;
pub mod sql;

pub use redshift::RedshiftWarehouse;

use crate::Result;
use async_trait::async_trait;

/// The warehouse's ground truth for a table at probe time.
///
/// Always re-read fresh per invocation; a later invocation must not trust an
/// earlier one's view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableState {
    /// Whether the table exists in the catalog
    pub exists: bool,
    /// Ordered column names, empty when the table does not exist
    pub columns: Vec<String>,
}

impl TableState {
    /// State for a table that is absent from the catalog.
    pub fn absent() -> Self {
        Self {
            exists: false,
            columns: Vec::new(),
        }
    }

    /// State for an existing table with the given ordered columns.
    pub fn existing(columns: Vec<String>) -> Self {
        Self {
            exists: true,
            columns,
        }
    }
}

/// Operations the engine performs against the warehouse.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Query the catalog for a table's existence and ordered column list.
    ///
    /// Tolerates the table not existing: returns [`TableState::absent`]
    /// rather than raising.
    async fn probe(&self, schema: &str, table: &str) -> Result<TableState>;

    /// Execute the statements in order inside one transaction.
    ///
    /// Commits only when every statement succeeds; any failure leaves the
    /// transaction uncommitted and propagates the underlying error.
    async fn execute(&self, statements: &[String]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_state() {
        let state = TableState::absent();
        assert!(!state.exists);
        assert!(state.columns.is_empty());
    }

    #[test]
    fn test_existing_state() {
        let state = TableState::existing(vec!["id".into(), "amount".into()]);
        assert!(state.exists);
        assert_eq!(state.columns, vec!["id", "amount"]);
    }
}

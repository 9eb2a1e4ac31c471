//! Load outcome reporting.
//!
//! The terminal artifact of an invocation: a structured record handed to the
//! audit collaborator. Assembly is pure; persistence belongs to the audit
//! store writer behind [`AuditSink`].

use crate::planner::LoadMode;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// Success or failure of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    /// File fully loaded and committed
    Success,
    /// Invocation failed; nothing was committed beyond any prior state
    Failed,
}

/// Structured result record for one processed file.
#[derive(Debug, Clone, Serialize)]
pub struct LoadOutcome {
    /// The object key that triggered the invocation
    pub object_key: String,

    /// When ingestion of the file started
    pub landed_at: DateTime<Utc>,

    /// When the load transaction committed; absent on failure
    pub loaded_at: Option<DateTime<Utc>>,

    /// Source file size in bytes
    pub file_size: u64,

    /// Fully qualified target table (`<schema>.<table>`)
    pub full_table_name: String,

    /// Resolved schema version, or "unknown" under inference
    pub schema_version: String,

    /// Whether the table existed before this invocation
    pub table_existed_before: bool,

    /// The chosen load mode; absent when failure preceded planning
    pub load_mode: Option<LoadMode>,

    /// Success/failure flag
    pub status: LoadStatus,

    /// Derived `<database>.<schema>.<table>` prefix for monitoring filters
    pub table_prefix: String,
}

impl LoadOutcome {
    /// Derive the monitoring table prefix.
    pub fn table_prefix(database: &str, schema: &str, table: &str) -> String {
        format!("{database}.{schema}.{table}")
    }
}

/// The audit store writer's interface.
///
/// The engine produces [`LoadOutcome`] records; persisting them (a key-value
/// upsert in the monitoring store) is this collaborator's responsibility.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record one outcome.
    async fn record(&self, outcome: &LoadOutcome) -> Result<()>;
}

/// Audit sink that emits outcomes as structured log events.
///
/// Stands in for the external audit writer in local runs and tests.
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, outcome: &LoadOutcome) -> Result<()> {
        info!(
            key = %outcome.object_key,
            table = %outcome.full_table_name,
            table_prefix = %outcome.table_prefix,
            status = ?outcome.status,
            load_mode = ?outcome.load_mode,
            schema_version = %outcome.schema_version,
            file_size = outcome.file_size,
            table_existed_before = outcome.table_existed_before,
            "Load outcome recorded"
        );
        Ok(())
    }
}

//! SQL rendering for planned operations.
//!
//! Turns a [`LoadPlan`](crate::planner::LoadPlan) into concrete Redshift
//! statements. Identifiers are always quoted so column names with spaces or
//! reserved words survive; string literals are escaped.

use crate::planner::{LoadPlan, Operation};
use crate::schema::SchemaDefinition;

/// Renders planned operations into executable SQL.
#[derive(Debug, Clone)]
pub struct SqlRenderer {
    /// Warehouse schema receiving loaded tables
    warehouse_schema: String,
    /// IAM role the warehouse assumes for COPY
    iam_role_arn: String,
    /// Bucket holding the source files
    bucket: String,
}

impl SqlRenderer {
    /// Create a renderer for the given warehouse schema and COPY identity.
    pub fn new(warehouse_schema: String, iam_role_arn: String, bucket: String) -> Self {
        Self {
            warehouse_schema,
            iam_role_arn,
            bucket,
        }
    }

    /// Fully qualified, quoted table name.
    pub fn qualified_table(&self, table: &str) -> String {
        format!(
            "{}.{}",
            quote_ident(&self.warehouse_schema),
            quote_ident(table)
        )
    }

    /// Render every operation of a plan, in order.
    pub fn render(
        &self,
        plan: &LoadPlan,
        table: &str,
        schema: &SchemaDefinition,
        object_key: &str,
    ) -> Vec<String> {
        plan.operations
            .iter()
            .map(|op| match op {
                Operation::DropIfExists => self.drop_if_exists(table),
                Operation::Create => self.create_table(table, schema),
                Operation::Truncate => self.truncate_table(table),
                Operation::Copy => self.copy_from(table, object_key),
            })
            .collect()
    }

    fn drop_if_exists(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {};", self.qualified_table(table))
    }

    fn truncate_table(&self, table: &str) -> String {
        format!("TRUNCATE TABLE {};", self.qualified_table(table))
    }

    fn create_table(&self, table: &str, schema: &SchemaDefinition) -> String {
        let columns: Vec<String> = schema
            .columns
            .iter()
            .map(|c| {
                let mut def = format!("{} {}", quote_ident(&c.name), c.column_type);
                if !c.nullable {
                    def.push_str(" NOT NULL");
                }
                def
            })
            .collect();

        format!(
            "CREATE TABLE {} ({});",
            self.qualified_table(table),
            columns.join(", ")
        )
    }

    /// Bulk-copy statement.
    ///
    /// Authenticates via the configured IAM role, expects comma-delimited
    /// UTF-8 text, and always skips exactly one header row.
    fn copy_from(&self, table: &str, object_key: &str) -> String {
        format!(
            "COPY {} FROM '{}' IAM_ROLE '{}' FORMAT AS CSV IGNOREHEADER 1;",
            self.qualified_table(table),
            quote_literal(&format!("s3://{}/{}", self.bucket, object_key)),
            quote_literal(&self.iam_role_arn),
        )
    }
}

/// Quote an identifier, doubling any embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Escape a string literal's embedded single quotes.
fn quote_literal(s: &str) -> String {
    s.replace('\'', "''")
}

//! Header-inference schema resolution.

use crate::config::ResolutionStrategy;
use crate::router::RoutingInfo;
use crate::storage::ObjectReader;
use crate::Result;
use async_trait::async_trait;
use tracing::debug;

use super::{read_header, ColumnDef, SchemaDefinition, SchemaResolver, UNKNOWN_SCHEMA_VERSION};

/// Resolver that treats the incoming file's header row as the schema.
///
/// Every column is assigned the configured wide-text type and is nullable.
/// No registry is consulted; the reported schema version is "unknown".
pub struct InferenceResolver {
    default_column_type: String,
    header_scan_bytes: usize,
}

impl InferenceResolver {
    /// Create a resolver with the given inferred-column type.
    pub fn new(default_column_type: String, header_scan_bytes: usize) -> Self {
        Self {
            default_column_type,
            header_scan_bytes,
        }
    }
}

#[async_trait]
impl SchemaResolver for InferenceResolver {
    async fn resolve(
        &self,
        routing: &RoutingInfo,
        files: &dyn ObjectReader,
    ) -> Result<SchemaDefinition> {
        let header = read_header(files, &routing.object_key, self.header_scan_bytes).await?;

        debug!(
            table = %routing.table_name,
            columns = header.len(),
            "Inferred schema from file header"
        );

        let columns = header
            .into_iter()
            .map(|name| ColumnDef {
                name,
                column_type: self.default_column_type.clone(),
                nullable: true,
            })
            .collect();

        Ok(SchemaDefinition {
            schema_version: UNKNOWN_SCHEMA_VERSION.to_string(),
            columns,
        })
    }

    fn strategy(&self) -> ResolutionStrategy {
        ResolutionStrategy::Inference
    }
}

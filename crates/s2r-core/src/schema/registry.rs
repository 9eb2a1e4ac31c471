//! Registry-backed schema resolution.

use crate::config::ResolutionStrategy;
use crate::router::{LoadAction, RoutingInfo};
use crate::storage::ObjectReader;
use crate::{Result, SchemaError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{read_header, SchemaDefinition, SchemaResolver};

/// Resolver backed by the versioned schema registry.
///
/// Schema documents live under `<database>/schema/<table>/<version-id>`;
/// version identifiers are timestamp-ordered strings, so the newest document
/// is the lexicographically greatest key. For append and truncate actions the
/// incoming file's header is compared column-for-column against the document
/// before any warehouse connection is opened.
pub struct RegistryResolver {
    registry: Arc<dyn ObjectReader>,
    header_scan_bytes: usize,
}

impl RegistryResolver {
    /// Create a resolver over the given registry bucket.
    pub fn new(registry: Arc<dyn ObjectReader>, header_scan_bytes: usize) -> Self {
        Self {
            registry,
            header_scan_bytes,
        }
    }

    /// Registry namespace for a routed table.
    fn registry_prefix(routing: &RoutingInfo) -> String {
        format!("{}/schema/{}", routing.database_name, routing.table_name)
    }

    async fn latest_document(&self, routing: &RoutingInfo) -> Result<SchemaDefinition> {
        let prefix = Self::registry_prefix(routing);
        let mut keys = self.registry.list_keys(&prefix).await?;

        // A schema-action data file shares the registry namespace when the
        // registry bucket is the data bucket; it must never be selected as a
        // schema document.
        keys.retain(|k| k != &routing.object_key);

        let latest = keys
            .into_iter()
            .max()
            .ok_or_else(|| SchemaError::NotFound {
                prefix: prefix.clone(),
            })?;

        debug!(
            table = %routing.table_name,
            document = %latest,
            "Selected newest schema document"
        );

        let body = self.registry.fetch(&latest).await?;
        let schema: SchemaDefinition =
            serde_json::from_slice(&body).map_err(|e| SchemaError::InvalidDocument {
                key: latest.clone(),
                message: e.to_string(),
            })?;

        if schema.columns.is_empty() {
            return Err(SchemaError::InvalidDocument {
                key: latest,
                message: "schema document declares no columns".into(),
            }
            .into());
        }

        Ok(schema)
    }

    /// Compare the incoming file's header against the declared columns.
    ///
    /// Ordered and name-exact: reordering, casing differences, and extra or
    /// missing columns all count as mismatch.
    async fn validate_header(
        &self,
        routing: &RoutingInfo,
        schema: &SchemaDefinition,
        files: &dyn ObjectReader,
    ) -> Result<()> {
        let header = read_header(files, &routing.object_key, self.header_scan_bytes).await?;
        let expected: Vec<String> = schema.columns.iter().map(|c| c.name.clone()).collect();

        if header != expected {
            return Err(SchemaError::Mismatch {
                table: format!("{}.{}", routing.database_name, routing.table_name),
                expected,
                actual: header,
            }
            .into());
        }

        Ok(())
    }
}

#[async_trait]
impl SchemaResolver for RegistryResolver {
    async fn resolve(
        &self,
        routing: &RoutingInfo,
        files: &dyn ObjectReader,
    ) -> Result<SchemaDefinition> {
        let schema = self.latest_document(routing).await?;

        // Schema actions recreate the table from the document alone; only
        // append and truncate must prove the file matches the declaration.
        if matches!(routing.action, LoadAction::Append | LoadAction::Truncate) {
            self.validate_header(routing, &schema, files).await?;
        }

        Ok(schema)
    }

    fn strategy(&self) -> ResolutionStrategy {
        ResolutionStrategy::Registry
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::FakeStore;
    use super::*;
    use crate::router;

    const ORDERS_V1: &str = r#"{
        "schema_version": "20240101T000000",
        "columns": [
            {"name": "id", "type": "BIGINT", "nullable": false},
            {"name": "amount", "type": "DECIMAL(18,2)"}
        ]
    }"#;

    const ORDERS_V2: &str = r#"{
        "schema_version": "20240301T120000",
        "columns": [
            {"name": "id", "type": "BIGINT", "nullable": false},
            {"name": "amount", "type": "DECIMAL(18,2)"},
            {"name": "region", "type": "VARCHAR(32)"}
        ]
    }"#;

    fn registry_store() -> Arc<FakeStore> {
        Arc::new(FakeStore::new(&[
            ("sales/schema/orders/20240101T000000.json", ORDERS_V1),
            ("sales/schema/orders/20240301T120000.json", ORDERS_V2),
        ]))
    }

    fn resolver(registry: Arc<FakeStore>) -> RegistryResolver {
        RegistryResolver::new(registry, 65536)
    }

    #[tokio::test]
    async fn test_selects_lexicographically_greatest_version() {
        let files = FakeStore::new(&[(
            "sales/append/orders/file.csv",
            "id,amount,region\n1,2.00,eu\n",
        )]);
        let routing = router::parse("sales/append/orders/file.csv").unwrap();

        let schema = resolver(registry_store())
            .resolve(&routing, &files)
            .await
            .unwrap();

        assert_eq!(schema.schema_version, "20240301T120000");
        assert_eq!(schema.column_names(), vec!["id", "amount", "region"]);
        assert_eq!(schema.columns[0].column_type, "BIGINT");
        assert!(!schema.columns[0].nullable);
        assert!(schema.columns[1].nullable);
    }

    #[tokio::test]
    async fn test_empty_namespace_fails_not_found() {
        let files = FakeStore::new(&[("sales/append/users/file.csv", "id\n")]);
        let routing = router::parse("sales/append/users/file.csv").unwrap();

        let err = resolver(registry_store())
            .resolve(&routing, &files)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Schema(SchemaError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_append_header_mismatch_fails() {
        let files = FakeStore::new(&[("sales/append/orders/file.csv", "id,total\n1,2.00\n")]);
        let routing = router::parse("sales/append/orders/file.csv").unwrap();

        let err = resolver(registry_store())
            .resolve(&routing, &files)
            .await
            .unwrap_err();
        match err {
            crate::Error::Schema(SchemaError::Mismatch {
                expected, actual, ..
            }) => {
                assert_eq!(expected, vec!["id", "amount", "region"]);
                assert_eq!(actual, vec!["id", "total"]);
            }
            other => panic!("expected schema mismatch, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_header_comparison_is_order_sensitive() {
        let files = FakeStore::new(&[(
            "sales/append/orders/file.csv",
            "amount,id,region\n2.00,1,eu\n",
        )]);
        let routing = router::parse("sales/append/orders/file.csv").unwrap();

        let err = resolver(registry_store())
            .resolve(&routing, &files)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Schema(SchemaError::Mismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_schema_action_skips_header_validation() {
        // The file header diverges from the document; a schema action still
        // resolves because the table will be recreated from the document.
        let files = FakeStore::new(&[("sales/schema/orders/file.csv", "anything,else\n")]);
        let routing = router::parse("sales/schema/orders/file.csv").unwrap();

        let schema = resolver(registry_store())
            .resolve(&routing, &files)
            .await
            .unwrap();
        assert_eq!(schema.schema_version, "20240301T120000");
    }

    #[tokio::test]
    async fn test_incoming_file_is_never_a_schema_document() {
        // Data file dropped under the registry namespace sorts after every
        // version document but must not be selected.
        let registry = Arc::new(FakeStore::new(&[
            ("sales/schema/orders/20240101T000000.json", ORDERS_V1),
            ("sales/schema/orders/zz-file.csv", "id,amount\n1,2\n"),
        ]));
        let files = FakeStore::new(&[("sales/schema/orders/zz-file.csv", "id,amount\n1,2\n")]);
        let routing = router::parse("sales/schema/orders/zz-file.csv").unwrap();

        let schema = resolver(registry).resolve(&routing, &files).await.unwrap();
        assert_eq!(schema.schema_version, "20240101T000000");
    }

    #[tokio::test]
    async fn test_invalid_document_fails() {
        let registry = Arc::new(FakeStore::new(&[(
            "sales/schema/orders/20240101T000000.json",
            "not json",
        )]));
        let files = FakeStore::new(&[("sales/schema/orders/file.csv", "id\n")]);
        let routing = router::parse("sales/schema/orders/file.csv").unwrap();

        let err = resolver(registry)
            .resolve(&routing, &files)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Schema(SchemaError::InvalidDocument { .. })
        ));
    }
}

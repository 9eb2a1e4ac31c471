//! Schema resolution.
//!
//! Two interchangeable strategies produce the expected ordered column list
//! for a table, selected once at configuration time:
//!
//! - [`RegistryResolver`] — newest declarative schema document from the
//!   versioned registry namespace
//! - [`InferenceResolver`] — the incoming file's header row is the schema,
//!   every column typed with the configured wide-text default
//!
//! Both expose the same contract through [`SchemaResolver`].

mod inference;
mod registry;

pub use inference::InferenceResolver;
pub use registry::RegistryResolver;

use crate::config::{Config, ResolutionStrategy};
use crate::router::RoutingInfo;
use crate::storage::ObjectReader;
use crate::{Result, SchemaError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Schema version reported when no declarative document is involved.
pub const UNKNOWN_SCHEMA_VERSION: &str = "unknown";

/// A single column definition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ColumnDef {
    /// Column name
    pub name: String,

    /// Warehouse column type
    #[serde(rename = "type")]
    pub column_type: String,

    /// Whether NULLs are permitted
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

/// Expected schema for a table: an ordered column list plus a version label.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SchemaDefinition {
    /// Version identifier of the schema document, or "unknown" when inferred
    pub schema_version: String,

    /// Ordered column definitions
    pub columns: Vec<ColumnDef>,
}

impl SchemaDefinition {
    /// Ordered column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Strategy interface for producing the expected schema of a table.
#[async_trait]
pub trait SchemaResolver: Send + Sync {
    /// Resolve the expected schema for the routed table.
    ///
    /// `files` grants access to the incoming data file; strategies that need
    /// the header row read it through this, never through a warehouse
    /// connection.
    async fn resolve(
        &self,
        routing: &RoutingInfo,
        files: &dyn ObjectReader,
    ) -> Result<SchemaDefinition>;

    /// The strategy this resolver implements.
    fn strategy(&self) -> ResolutionStrategy;
}

/// Construct the configured resolver.
///
/// `registry` is the object reader for the schema registry bucket; it is only
/// consulted by the registry strategy.
pub fn resolver_from_config(
    config: &Config,
    registry: Arc<dyn ObjectReader>,
) -> Arc<dyn SchemaResolver> {
    match config.resolution.strategy {
        ResolutionStrategy::Registry => Arc::new(RegistryResolver::new(
            registry,
            config.resolution.header_scan_bytes,
        )),
        ResolutionStrategy::Inference => Arc::new(InferenceResolver::new(
            config.resolution.default_column_type.clone(),
            config.resolution.header_scan_bytes,
        )),
    }
}

/// Read and parse the header row of a delimited file.
///
/// Scans at most `scan_bytes` leading bytes; the header must fit within that
/// window. Column names are trimmed but otherwise taken verbatim.
pub(crate) async fn read_header(
    files: &dyn ObjectReader,
    key: &str,
    scan_bytes: usize,
) -> Result<Vec<String>> {
    let bytes = files.fetch_leading(key, scan_bytes).await?;

    let line_end = match bytes.iter().position(|&b| b == b'\n') {
        Some(pos) => pos,
        // A full window with no newline means the header row may continue
        // past it; truncating here would fabricate a cut-off column name.
        None if bytes.len() >= scan_bytes => {
            return Err(SchemaError::HeaderParse {
                key: key.to_string(),
                message: format!("header row exceeds the {scan_bytes}-byte scan window"),
            }
            .into())
        }
        None => bytes.len(),
    };
    let mut line = &bytes[..line_end];
    if let [rest @ .., b'\r'] = line {
        line = rest;
    }

    if line.is_empty() {
        return Err(SchemaError::EmptyHeader {
            key: key.to_string(),
        }
        .into());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(line);

    let record = match reader.records().next() {
        Some(Ok(record)) => record,
        Some(Err(e)) => {
            return Err(SchemaError::HeaderParse {
                key: key.to_string(),
                message: e.to_string(),
            }
            .into())
        }
        None => {
            return Err(SchemaError::EmptyHeader {
                key: key.to_string(),
            }
            .into())
        }
    };

    Ok(record.iter().map(|c| c.trim().to_string()).collect())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use bytes::Bytes;
    use std::collections::BTreeMap;

    /// In-memory [`ObjectReader`] for resolver tests.
    pub struct FakeStore {
        objects: BTreeMap<String, Bytes>,
    }

    impl FakeStore {
        pub fn new(objects: &[(&str, &str)]) -> Self {
            Self {
                objects: objects
                    .iter()
                    .map(|(k, v)| (k.to_string(), Bytes::from(v.as_bytes().to_vec())))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl ObjectReader for FakeStore {
        async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
            Ok(self
                .objects
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect())
        }

        async fn fetch(&self, key: &str) -> Result<Bytes> {
            self.objects
                .get(key)
                .cloned()
                .ok_or_else(|| crate::Error::Storage(format!("not found: {key}")))
        }

        async fn fetch_leading(&self, key: &str, max_len: usize) -> Result<Bytes> {
            let bytes = self.fetch(key).await?;
            Ok(bytes.slice(..bytes.len().min(max_len)))
        }

        async fn size(&self, key: &str) -> Result<u64> {
            Ok(self.fetch(key).await?.len() as u64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::FakeStore;
    use super::*;

    #[tokio::test]
    async fn test_read_header_plain() {
        let store = FakeStore::new(&[("db/append/t/f.csv", "id,amount\n1,2\n")]);
        let header = read_header(&store, "db/append/t/f.csv", 65536).await.unwrap();
        assert_eq!(header, vec!["id", "amount"]);
    }

    #[tokio::test]
    async fn test_read_header_crlf() {
        let store = FakeStore::new(&[("db/append/t/f.csv", "id,amount\r\n1,2\r\n")]);
        let header = read_header(&store, "db/append/t/f.csv", 65536).await.unwrap();
        assert_eq!(header, vec!["id", "amount"]);
    }

    #[tokio::test]
    async fn test_read_header_quoted_names() {
        let store = FakeStore::new(&[("db/append/t/f.csv", "\"order id\",amount\n")]);
        let header = read_header(&store, "db/append/t/f.csv", 65536).await.unwrap();
        assert_eq!(header, vec!["order id", "amount"]);
    }

    #[tokio::test]
    async fn test_read_header_no_trailing_newline() {
        let store = FakeStore::new(&[("db/append/t/f.csv", "id,amount")]);
        let header = read_header(&store, "db/append/t/f.csv", 65536).await.unwrap();
        assert_eq!(header, vec!["id", "amount"]);
    }

    #[tokio::test]
    async fn test_read_header_longer_than_scan_window_fails() {
        let store = FakeStore::new(&[("db/append/t/f.csv", "id,amount\n1,2\n")]);
        let err = read_header(&store, "db/append/t/f.csv", 8).await.unwrap_err();
        match err {
            crate::Error::Schema(SchemaError::HeaderParse { message, .. }) => {
                assert!(message.contains("scan window"));
            }
            other => panic!("expected header parse error, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_read_header_fits_scan_window_exactly() {
        // Newline inside the window; the remainder of the file being cut off
        // is irrelevant.
        let store = FakeStore::new(&[("db/append/t/f.csv", "id,amount\n1,2\n")]);
        let header = read_header(&store, "db/append/t/f.csv", 10).await.unwrap();
        assert_eq!(header, vec!["id", "amount"]);
    }

    #[tokio::test]
    async fn test_read_header_empty_file() {
        let store = FakeStore::new(&[("db/append/t/f.csv", "")]);
        let err = read_header(&store, "db/append/t/f.csv", 65536)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Schema(SchemaError::EmptyHeader { .. })
        ));
    }

    #[test]
    fn test_column_def_nullable_default() {
        let col: ColumnDef = serde_json::from_str(r#"{"name":"id","type":"BIGINT"}"#).unwrap();
        assert!(col.nullable);
    }

    #[test]
    fn test_column_names_ordered() {
        let schema = SchemaDefinition {
            schema_version: "20240101T000000".into(),
            columns: vec![
                ColumnDef {
                    name: "b".into(),
                    column_type: "VARCHAR(65535)".into(),
                    nullable: true,
                },
                ColumnDef {
                    name: "a".into(),
                    column_type: "VARCHAR(65535)".into(),
                    nullable: true,
                },
            ],
        };
        assert_eq!(schema.column_names(), vec!["b", "a"]);
    }
}

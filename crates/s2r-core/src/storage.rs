//! Object store access.
//!
//! Wraps the `object_store` crate behind a small read-only trait so schema
//! resolution and the engine can be exercised against the in-memory backend
//! in tests. The engine never writes to the object store.

use crate::{Error, Result};
use crate::config::StorageConfig;
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as StorePath;
use object_store::ObjectStore;
use std::sync::Arc;

/// Read-only object store operations the engine depends on.
#[async_trait]
pub trait ObjectReader: Send + Sync {
    /// List all object keys under a prefix.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Fetch an object's full contents.
    async fn fetch(&self, key: &str) -> Result<Bytes>;

    /// Fetch up to `max_len` leading bytes of an object.
    async fn fetch_leading(&self, key: &str, max_len: usize) -> Result<Bytes>;

    /// Object size in bytes.
    async fn size(&self, key: &str) -> Result<u64>;
}

/// [`ObjectReader`] backed by any `object_store` implementation.
pub struct StoreReader {
    store: Arc<dyn ObjectStore>,
}

impl StoreReader {
    /// Wrap an existing object store.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Build an S3-backed reader for the given bucket.
    ///
    /// Credentials come from the ambient environment (instance profile,
    /// environment variables); they are never carried in configuration.
    pub fn s3(bucket: &str, config: &StorageConfig) -> Result<Self> {
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);

        if let Some(region) = &config.aws_region {
            builder = builder.with_region(region.clone());
        }
        if let Some(endpoint) = &config.s3_endpoint {
            builder = builder.with_endpoint(endpoint.clone()).with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| Error::Storage(format!("Failed to build S3 client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
        })
    }
}

#[async_trait]
impl ObjectReader for StoreReader {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = StorePath::from(prefix);
        let metas: Vec<_> = self
            .store
            .list(Some(&prefix))
            .try_collect()
            .await
            .map_err(Error::from)?;
        Ok(metas.into_iter().map(|m| m.location.to_string()).collect())
    }

    async fn fetch(&self, key: &str) -> Result<Bytes> {
        let path = StorePath::from(key);
        let result = self.store.get(&path).await?;
        Ok(result.bytes().await?)
    }

    async fn fetch_leading(&self, key: &str, max_len: usize) -> Result<Bytes> {
        let path = StorePath::from(key);
        let meta = self.store.head(&path).await?;
        let end = meta.size.min(max_len);
        if end == 0 {
            return Ok(Bytes::new());
        }
        Ok(self.store.get_range(&path, 0..end).await?)
    }

    async fn size(&self, key: &str) -> Result<u64> {
        let path = StorePath::from(key);
        let meta = self.store.head(&path).await?;
        Ok(meta.size as u64)
    }
}

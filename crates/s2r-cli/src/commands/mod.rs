//! CLI command implementations.

pub mod ingest;
pub mod plan;

use anyhow::Result;
use s2r_core::storage::{ObjectReader, StoreReader};
use s2r_core::warehouse::RedshiftWarehouse;
use s2r_core::Config;
use std::sync::Arc;

/// Build the object readers for the data and registry buckets.
///
/// Returns one reader when both point at the same bucket.
pub(crate) fn build_stores(
    config: &Config,
) -> Result<(Arc<dyn ObjectReader>, Arc<dyn ObjectReader>)> {
    let files: Arc<dyn ObjectReader> =
        Arc::new(StoreReader::s3(&config.storage.bucket, &config.storage)?);

    let registry: Arc<dyn ObjectReader> =
        if config.storage.registry_bucket() == config.storage.bucket {
            files.clone()
        } else {
            Arc::new(StoreReader::s3(
                config.storage.registry_bucket(),
                &config.storage,
            )?)
        };

    Ok((files, registry))
}

/// Connect to the warehouse.
pub(crate) async fn connect_warehouse(config: &Config) -> Result<Arc<RedshiftWarehouse>> {
    Ok(Arc::new(RedshiftWarehouse::connect(&config.warehouse).await?))
}

//! Ingest command implementation.

use anyhow::Result;
use s2r_core::outcome::TracingAuditSink;
use s2r_core::{Config, IngestionEngine, LoadRequest};
use std::sync::Arc;
use tracing::info;

/// Load one object into the warehouse end-to-end.
pub async fn run(config: Config, key: &str, file_size: Option<u64>) -> Result<()> {
    config.validate()?;

    let (files, registry) = super::build_stores(&config)?;
    let warehouse = super::connect_warehouse(&config).await?;

    let file_size = match file_size {
        Some(size) => size,
        None => files.size(key).await?,
    };

    let engine = IngestionEngine::new(
        &config,
        files,
        registry,
        warehouse,
        Some(Arc::new(TracingAuditSink)),
    );

    let request = LoadRequest {
        container_id: config.storage.bucket.clone(),
        object_key: key.to_string(),
        retrieved_file_size: file_size,
    };

    let outcome = engine.process(&request).await?;

    info!(
        table = %outcome.full_table_name,
        load_mode = ?outcome.load_mode,
        "Ingestion complete"
    );
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(())
}

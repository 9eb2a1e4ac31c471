//! Plan command implementation.

use anyhow::Result;
use s2r_core::{Config, IngestionEngine, LoadRequest};

/// Print the operations and SQL a load would run, without executing them.
///
/// Still probes the warehouse catalog (read-only); the plan depends on the
/// table's current state.
pub async fn run(config: Config, key: &str) -> Result<()> {
    config.validate()?;

    let (files, registry) = super::build_stores(&config)?;
    let warehouse = super::connect_warehouse(&config).await?;

    let file_size = files.size(key).await.unwrap_or(0);

    let engine = IngestionEngine::new(&config, files, registry, warehouse, None);

    let request = LoadRequest {
        container_id: config.storage.bucket.clone(),
        object_key: key.to_string(),
        retrieved_file_size: file_size,
    };

    let (plan, statements) = engine.dry_run(&request).await?;

    println!("Load mode: {}", plan.load_mode);
    println!("Planned statements:");
    for (i, statement) in statements.iter().enumerate() {
        println!("  {}. {}", i + 1, statement);
    }

    Ok(())
}

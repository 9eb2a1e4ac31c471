//! Redshift warehouse client.
//!
//! Redshift speaks the Postgres wire protocol, so the client is a thin layer
//! over a Postgres connection pool. The probe reads the catalog through
//! `information_schema`; execution runs all planned statements inside one
//! transaction.

use crate::config::WarehouseConfig;
use crate::{Result, WarehouseError};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;
use tracing::debug;

use super::{TableState, Warehouse};

/// Ordered column lookup for a table. Empty result means the table is absent.
const PROBE_QUERY: &str = "SELECT column_name \
     FROM information_schema.columns \
     WHERE table_schema = $1 AND table_name = $2 \
     ORDER BY ordinal_position";

/// [`Warehouse`] implementation over a Redshift cluster.
pub struct RedshiftWarehouse {
    pool: PgPool,
}

impl RedshiftWarehouse {
    /// Connect to the cluster described by the configuration.
    pub async fn connect(config: &WarehouseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .connect(&config.connection_url())
            .await
            .map_err(|e| WarehouseError::Connection(e.to_string()))?;

        debug!(host = %config.host, database = %config.database, "Connected to warehouse");

        Ok(Self { pool })
    }
}

#[async_trait]
impl Warehouse for RedshiftWarehouse {
    async fn probe(&self, schema: &str, table: &str) -> Result<TableState> {
        let rows = sqlx::query(PROBE_QUERY)
            .bind(schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| WarehouseError::Probe {
                table: format!("{schema}.{table}"),
                message: e.to_string(),
            })?;

        if rows.is_empty() {
            return Ok(TableState::absent());
        }

        let columns = rows
            .iter()
            .map(|row| row.get::<String, _>(0))
            .collect::<Vec<_>>();

        Ok(TableState::existing(columns))
    }

    async fn execute(&self, statements: &[String]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| WarehouseError::Connection(e.to_string()))?;

        for statement in statements {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| WarehouseError::Execution {
                    statement: statement.clone(),
                    message: e.to_string(),
                })?;
            debug!(statement = %statement, "Executed statement");
        }

        tx.commit().await.map_err(|e| WarehouseError::Execution {
            statement: "COMMIT".into(),
            message: e.to_string(),
        })?;

        Ok(())
    }
}

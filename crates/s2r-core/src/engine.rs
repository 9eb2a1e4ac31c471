//! Ingestion engine orchestration.
//!
//! Wires the components into the strictly sequential per-file flow:
//! route the key, resolve the expected schema, probe the warehouse, plan the
//! reconciliation, execute it in one transaction, and report the outcome.
//!
//! Invocations for different files are independent and may run concurrently.
//! Two invocations targeting the same table are NOT mutually excluded; the
//! warehouse transaction is the only safety net. Callers must serialize
//! same-table updates externally when concurrent uploads are possible.

use crate::config::Config;
use crate::outcome::{AuditSink, LoadOutcome, LoadStatus};
use crate::planner::{self, LoadPlan};
use crate::router::{self, RoutingInfo};
use crate::schema::{self, SchemaResolver, UNKNOWN_SCHEMA_VERSION};
use crate::storage::ObjectReader;
use crate::warehouse::sql::SqlRenderer;
use crate::warehouse::Warehouse;
use crate::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

/// One file to ingest, constructed from the trigger event. Immutable.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// Bucket the event fired for
    pub container_id: String,
    /// Object key of the landed file
    pub object_key: String,
    /// File size reported by the trigger, in bytes
    pub retrieved_file_size: u64,
}

/// The ingestion action engine.
pub struct IngestionEngine {
    warehouse_schema: String,
    renderer: SqlRenderer,
    resolver: Arc<dyn SchemaResolver>,
    files: Arc<dyn ObjectReader>,
    warehouse: Arc<dyn Warehouse>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl IngestionEngine {
    /// Assemble an engine from configuration and its collaborators.
    ///
    /// `files` reads incoming data files; `registry` reads schema documents
    /// (the same reader when both live in one bucket).
    pub fn new(
        config: &Config,
        files: Arc<dyn ObjectReader>,
        registry: Arc<dyn ObjectReader>,
        warehouse: Arc<dyn Warehouse>,
        audit: Option<Arc<dyn AuditSink>>,
    ) -> Self {
        let renderer = SqlRenderer::new(
            config.warehouse.schema.clone(),
            config.warehouse.iam_role_arn.clone(),
            config.storage.bucket.clone(),
        );
        let resolver = schema::resolver_from_config(config, registry);

        Self {
            warehouse_schema: config.warehouse.schema.clone(),
            renderer,
            resolver,
            files,
            warehouse,
            audit,
        }
    }

    /// Process one file end-to-end.
    ///
    /// No step is retried; a failed invocation is safe to re-drive (`schema`
    /// and `truncate` are idempotent; re-running `append` after a partial
    /// success can duplicate rows, a documented limitation).
    pub async fn process(&self, request: &LoadRequest) -> Result<LoadOutcome> {
        let landed_at = Utc::now();

        match self.try_process(request, landed_at).await {
            Ok(outcome) => {
                // The load already committed; a failed audit write must not
                // surface as an invocation error, or the caller may re-drive
                // an append and duplicate rows.
                if let Some(sink) = &self.audit {
                    if let Err(audit_err) = sink.record(&outcome).await {
                        warn!(
                            key = %request.object_key,
                            error = %audit_err,
                            "Failed to record success outcome"
                        );
                    }
                }
                Ok(outcome)
            }
            Err(e) => {
                let outcome = self.failure_outcome(request, landed_at);
                if let Some(sink) = &self.audit {
                    if let Err(audit_err) = sink.record(&outcome).await {
                        warn!(
                            key = %request.object_key,
                            error = %audit_err,
                            "Failed to record failure outcome"
                        );
                    }
                }
                Err(e)
            }
        }
    }

    /// Resolve, probe, and plan without executing anything.
    ///
    /// Returns the plan and the exact statements execution would run.
    pub async fn dry_run(&self, request: &LoadRequest) -> Result<(LoadPlan, Vec<String>)> {
        let routing = self.route(&request.object_key)?;
        let schema = self.resolve_schema(&routing).await?;
        let state = self.probe(&routing).await?;
        let plan = self.plan(&routing, &state, &schema)?;
        let statements =
            self.renderer
                .render(&plan, &routing.table_name, &schema, &routing.object_key);
        Ok((plan, statements))
    }

    async fn try_process(
        &self,
        request: &LoadRequest,
        landed_at: DateTime<Utc>,
    ) -> Result<LoadOutcome> {
        let routing = self.route(&request.object_key)?;

        info!(
            key = %routing.object_key,
            action = %routing.action,
            table = %routing.table_name,
            file_size = request.retrieved_file_size,
            "Processing file"
        );

        let schema = self.resolve_schema(&routing).await?;
        let state = self.probe(&routing).await?;
        let table_existed_before = state.exists;

        let plan = self.plan(&routing, &state, &schema)?;
        let statements =
            self.renderer
                .render(&plan, &routing.table_name, &schema, &routing.object_key);

        self.warehouse.execute(&statements).await.map_err(|e| {
            self.log_failure(&routing, &e, "Load execution failed");
            e
        })?;

        let loaded_at = Utc::now();
        let full_table_name = format!("{}.{}", self.warehouse_schema, routing.table_name);

        info!(
            key = %routing.object_key,
            table = %full_table_name,
            load_mode = %plan.load_mode,
            schema_version = %schema.schema_version,
            "Load committed"
        );

        Ok(LoadOutcome {
            object_key: routing.object_key.clone(),
            landed_at,
            loaded_at: Some(loaded_at),
            file_size: request.retrieved_file_size,
            full_table_name,
            schema_version: schema.schema_version,
            table_existed_before,
            load_mode: Some(plan.load_mode),
            status: LoadStatus::Success,
            table_prefix: LoadOutcome::table_prefix(
                &routing.database_name,
                &self.warehouse_schema,
                &routing.table_name,
            ),
        })
    }

    fn route(&self, object_key: &str) -> Result<RoutingInfo> {
        router::parse(object_key).map_err(|e| {
            error!(key = %object_key, error = %e, "Key routing failed");
            e
        })
    }

    async fn resolve_schema(&self, routing: &RoutingInfo) -> Result<crate::schema::SchemaDefinition> {
        self.resolver
            .resolve(routing, self.files.as_ref())
            .await
            .map_err(|e| {
                self.log_failure(routing, &e, "Schema resolution failed");
                e
            })
    }

    async fn probe(&self, routing: &RoutingInfo) -> Result<crate::warehouse::TableState> {
        self.warehouse
            .probe(&self.warehouse_schema, &routing.table_name)
            .await
            .map_err(|e| {
                self.log_failure(routing, &e, "Table state probe failed");
                e
            })
    }

    fn plan(
        &self,
        routing: &RoutingInfo,
        state: &crate::warehouse::TableState,
        schema: &crate::schema::SchemaDefinition,
    ) -> Result<LoadPlan> {
        planner::plan(routing, state, schema).map_err(|e| {
            self.log_failure(routing, &e, "Reconciliation planning failed");
            e
        })
    }

    fn log_failure(&self, routing: &RoutingInfo, error: &crate::Error, message: &'static str) {
        error!(
            key = %routing.object_key,
            action = %routing.action,
            table = %routing.table_name,
            error = %error,
            "{message}"
        );
    }

    fn failure_outcome(&self, request: &LoadRequest, landed_at: DateTime<Utc>) -> LoadOutcome {
        // Best-effort table attribution; routing may itself have failed.
        let routing = router::parse(&request.object_key).ok();
        let (full_table_name, table_prefix) = match &routing {
            Some(r) => (
                format!("{}.{}", self.warehouse_schema, r.table_name),
                LoadOutcome::table_prefix(&r.database_name, &self.warehouse_schema, &r.table_name),
            ),
            None => (String::new(), String::new()),
        };

        LoadOutcome {
            object_key: request.object_key.clone(),
            landed_at,
            loaded_at: None,
            file_size: request.retrieved_file_size,
            full_table_name,
            schema_version: UNKNOWN_SCHEMA_VERSION.to_string(),
            table_existed_before: false,
            load_mode: None,
            status: LoadStatus::Failed,
            table_prefix,
        }
    }
}

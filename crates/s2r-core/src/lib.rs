//! S2R Core - S3 to Redshift ingestion action engine.
//!
//! This library loads delimited files dropped into an object store into a
//! columnar warehouse, choosing one of three load strategies from routing
//! information embedded in the object key:
//!
//! - `append` - add rows to the table
//! - `truncate` - replace the table's contents
//! - `schema` - recreate the table from the resolved schema
//!
//! The engine resolves the expected schema (declarative registry or header
//! inference), probes the warehouse catalog, plans the minimal DDL/DML
//! sequence, and executes it in one transaction.

pub mod config;
pub mod engine;
pub mod error;
pub mod outcome;
pub mod planner;
pub mod router;
pub mod schema;
pub mod storage;
pub mod warehouse;

// Re-export commonly used types
pub use config::Config;
pub use engine::{IngestionEngine, LoadRequest};
pub use error::{Error, Result, RoutingError, SchemaError, WarehouseError};
pub use outcome::{AuditSink, LoadOutcome, LoadStatus};
pub use planner::{LoadMode, LoadPlan};

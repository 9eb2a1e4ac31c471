//! Error types for the s2r core library.
//!
//! Uses hierarchical domain-specific errors following the thiserror pattern.
//! None of these are retried internally; every error propagates to the
//! invocation boundary as the terminal outcome of that invocation.

use thiserror::Error;

/// Result type alias for s2r operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for s2r.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Object key routing error
    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    /// Schema resolution or validation error
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Warehouse DDL/DML error
    #[error("Warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),

    /// Object store error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Object key routing errors.
#[derive(Error, Debug)]
pub enum RoutingError {
    /// Key has fewer than the required number of path segments
    #[error("Malformed key {key:?}: expected at least 4 segments (database/action/table/file), found {segments}")]
    MalformedKey { key: String, segments: usize },

    /// Action segment did not match any supported load action.
    ///
    /// Raised by the planner, not the router: the router defers unrecognized
    /// actions so the full routing context is available when failing.
    #[error("Unknown action {action:?}: expected append, truncate, or schema")]
    UnknownAction { action: String },
}

/// Schema resolution and validation errors.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Registry namespace has no schema documents
    #[error("No schema document found under {prefix}")]
    NotFound { prefix: String },

    /// Schema document could not be parsed
    #[error("Invalid schema document {key}: {message}")]
    InvalidDocument { key: String, message: String },

    /// Incoming file has no header row
    #[error("File {key} has no header row")]
    EmptyHeader { key: String },

    /// Header row could not be parsed as delimited text
    #[error("Failed to parse header row of {key}: {message}")]
    HeaderParse { key: String, message: String },

    /// Column lists diverge (order-sensitive, name-exact).
    ///
    /// Append and truncate refuse to reconcile structure; a `schema` action
    /// is required to recreate the table.
    #[error("Schema mismatch for {table}: expected columns {expected:?}, found {actual:?}; run a schema action to recreate the table")]
    Mismatch {
        table: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },
}

/// Warehouse connection and execution errors.
#[derive(Error, Debug)]
pub enum WarehouseError {
    /// Connection to the warehouse failed
    #[error("Warehouse connection failed: {0}")]
    Connection(String),

    /// A statement failed; the enclosing transaction was not committed
    #[error("Statement execution failed: {message} (statement: {statement})")]
    Execution { statement: String, message: String },

    /// Catalog probe failed
    #[error("Table state probe failed for {table}: {message}")]
    Probe { table: String, message: String },
}

// Conversion implementations for external error types

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<object_store::Error> for Error {
    fn from(err: object_store::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

//! Object key routing.
//!
//! Inbound keys follow `<database>/<action>/<table>/<file...>`. The router
//! extracts the segments and case-normalizes the action; it does not reject
//! unrecognized actions, the planner does, so the failure carries full
//! routing context.

use crate::{Result, RoutingError};
use serde::{Deserialize, Serialize};

/// Minimum number of path segments in a routable key.
const MIN_SEGMENTS: usize = 4;

/// Load action embedded in the object key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadAction {
    /// Add rows to the table
    Append,
    /// Replace the table's contents, keeping its structure
    Truncate,
    /// Recreate the table from the resolved schema
    Schema,
    /// Unrecognized action segment, rejected by the planner
    #[serde(other)]
    Unknown,
}

impl LoadAction {
    fn parse(segment: &str) -> (Self, String) {
        let normalized = segment.to_ascii_lowercase();
        let action = match normalized.as_str() {
            "append" => Self::Append,
            "truncate" => Self::Truncate,
            "schema" => Self::Schema,
            _ => Self::Unknown,
        };
        (action, normalized)
    }
}

impl std::fmt::Display for LoadAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Append => "append",
            Self::Truncate => "truncate",
            Self::Schema => "schema",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Routing information derived from an object key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingInfo {
    /// The original object key, verbatim
    pub object_key: String,
    /// Database segment (first)
    pub database_name: String,
    /// Parsed load action (second segment, lower-cased)
    pub action: LoadAction,
    /// Raw lower-cased action segment, kept for error reporting
    pub raw_action: String,
    /// Table segment (third)
    pub table_name: String,
    /// Remaining segments joined back into the file path
    pub file_name: String,
}

/// Parse an object key into routing information.
///
/// Fails when fewer than four path segments are present. Empty segments
/// (leading, trailing, or doubled separators) do not count.
pub fn parse(object_key: &str) -> Result<RoutingInfo> {
    let segments: Vec<&str> = object_key.split('/').filter(|s| !s.is_empty()).collect();

    if segments.len() < MIN_SEGMENTS {
        return Err(RoutingError::MalformedKey {
            key: object_key.to_string(),
            segments: segments.len(),
        }
        .into());
    }

    let (action, raw_action) = LoadAction::parse(segments[1]);

    Ok(RoutingInfo {
        object_key: object_key.to_string(),
        database_name: segments[0].to_string(),
        action,
        raw_action,
        table_name: segments[2].to_string(),
        file_name: segments[3..].join("/"),
    })
}

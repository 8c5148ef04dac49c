use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored benchmark item, as read from the record store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Serialized JSON payload; holds a nested `system_info` object
    pub data: String,
}

impl RawRecord {
    pub fn new(timestamp: i64, data: impl Into<String>) -> Self {
        Self {
            timestamp,
            data: data.into(),
        }
    }
}

/// Opaque cursor returned by a paginated query.
///
/// Callers hand it back verbatim; only store adapters build or read one.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuationToken(serde_json::Value);

impl ContinuationToken {
    /// For `QueryPort` implementations wrapping their store's resume key.
    pub fn from_store_key(key: serde_json::Value) -> Self {
        Self(key)
    }

    /// For `QueryPort` implementations sending the resume key back.
    pub fn into_store_key(self) -> serde_json::Value {
        self.0
    }
}

/// Range query scoped to one partition of a sorted secondary index
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub partition_value: String,
    pub start: Option<ContinuationToken>,
}

/// One page of a range query, in index order
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    pub items: Vec<RawRecord>,
    pub next: Option<ContinuationToken>,
}

/// Object listing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    pub key: String,
    pub size: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
}

/// Position in a paged object listing; `Start` requests the first page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListCursor {
    Start,
    Offset(u64),
}

#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    /// `None` when the store reported no contents for this page
    pub contents: Option<Vec<ObjectDescriptor>>,
    /// Full prefixes of sub-folders seen on this page, listed separately
    pub folders: Vec<String>,
    pub next: Option<ListCursor>,
}

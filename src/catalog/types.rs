//! Catalog document types

use crate::error::{Error, Result};
use crate::schema::JsonSchema;
use crate::types::ReplicationMethod;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The catalog document: every discoverable stream, in order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Stream entries
    pub streams: Vec<CatalogEntry>,
}

/// One stream in the catalog
///
/// `selected` and `fields` are caller-supplied selection annotations;
/// discovery output leaves them unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stream name
    pub stream: String,

    /// JSON schema of the stream's records
    pub schema: JsonSchema,

    /// Primary key fields
    pub key_properties: Vec<String>,

    /// Replication strategy
    pub replication_method: ReplicationMethod,

    /// Bookmark field (incremental streams only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark_field: Option<String>,

    /// Whether the caller selected this stream for sync.
    /// A stream with no annotation is excluded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,

    /// Fields to emit. Absent means all fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
}

impl Catalog {
    /// Parse a catalog document from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::invalid_catalog(format!("failed to parse catalog: {e}")))
    }

    /// Load a catalog document from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::invalid_catalog(format!(
                "failed to read catalog file {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_json(&contents)
    }

    /// Find an entry by stream name
    pub fn get_entry(&self, stream: &str) -> Option<&CatalogEntry> {
        self.streams.iter().find(|e| e.stream == stream)
    }

    /// Serialize as pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

//! Pagination types

use serde_json::Value;

/// One fetched batch of raw records
///
/// Transient: owned by the paginator's caller only until consumed.
/// Record order is exactly the order the source returned.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number this batch came from
    pub number: u32,
    /// Raw records in source order
    pub records: Vec<Value>,
    /// Next page number, or `None` when this is the final page
    pub next: Option<u32>,
}

impl Page {
    /// Whether more pages follow this one
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// Number of records in this page
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the page carried no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

//! Page-number pagination over a fetch function
//!
//! The KPA API paginates with a `page` body parameter and reports
//! `{"paging": {"last_page": N}}` in each response. The paginator owns
//! that protocol: callers supply a [`PageFetcher`] for the transport
//! and consume decoded [`Page`]s until `next_page` returns `None`.
//!
//! Retry is deliberately not this layer's job; fetch failures surface
//! to the caller unmodified. A structurally invalid page fails with
//! `MalformedResponse`, which is terminal for the stream (retrying a
//! parse failure cannot help).

use super::types::Page;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

/// Fetches one raw page of an endpoint's results
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the decoded JSON body for the given 1-based page number
    async fn fetch_page(&self, page: u32) -> Result<Value>;
}

/// Finite, non-restartable producer of [`Page`]s
pub struct Paginator<'a> {
    fetcher: &'a dyn PageFetcher,
    endpoint: String,
    records_path: String,
    next: Option<u32>,
    pages_fetched: u32,
    max_pages: u32,
}

impl<'a> Paginator<'a> {
    /// Create a paginator starting at page 1.
    ///
    /// `records_path` names the response field holding the page's
    /// record array. `max_pages` is a safety valve against a remote
    /// paging bug that never terminates.
    pub fn new(
        fetcher: &'a dyn PageFetcher,
        endpoint: impl Into<String>,
        records_path: impl Into<String>,
        max_pages: u32,
    ) -> Self {
        Self {
            fetcher,
            endpoint: endpoint.into(),
            records_path: records_path.into(),
            next: Some(1),
            pages_fetched: 0,
            max_pages,
        }
    }

    /// Whether the sequence has terminated
    pub fn is_exhausted(&self) -> bool {
        self.next.is_none()
    }

    /// Pages fetched so far
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Produce the next page, or `None` once the sequence is exhausted.
    ///
    /// After exhaustion this returns `None` without any further fetch
    /// calls.
    pub async fn next_page(&mut self) -> Result<Option<Page>> {
        let Some(page_number) = self.next else {
            return Ok(None);
        };

        if self.pages_fetched >= self.max_pages {
            warn!(
                endpoint = self.endpoint,
                max_pages = self.max_pages,
                "Stopping pagination at the configured page limit"
            );
            self.next = None;
            return Ok(None);
        }

        let body = self.fetcher.fetch_page(page_number).await?;
        self.pages_fetched += 1;

        let records = self.decode_records(&body)?;
        let next = next_page_number(&body, page_number);

        debug!(
            endpoint = self.endpoint,
            page = page_number,
            records = records.len(),
            has_next = next.is_some(),
            "Fetched page"
        );

        self.next = next;
        Ok(Some(Page {
            number: page_number,
            records,
            next,
        }))
    }

    /// Pull the record array out of a page body, preserving order.
    fn decode_records(&self, body: &Value) -> Result<Vec<Value>> {
        let field = body.get(&self.records_path).ok_or_else(|| {
            Error::malformed(
                &self.endpoint,
                format!("page body has no '{}' field", self.records_path),
            )
        })?;

        let records = field.as_array().ok_or_else(|| {
            Error::malformed(
                &self.endpoint,
                format!("'{}' field is not an array", self.records_path),
            )
        })?;

        Ok(records.clone())
    }
}

/// Compute the next page number from the response's paging envelope.
///
/// A response with no `paging.last_page` is a single page.
fn next_page_number(body: &Value, current: u32) -> Option<u32> {
    let last_page = body
        .get("paging")
        .and_then(|p| p.get("last_page"))
        .and_then(Value::as_u64)?;

    let next = u64::from(current) + 1;
    if next <= last_page {
        Some(next as u32)
    } else {
        None
    }
}

//! Sync engine
//!
//! The top-level driver of a sync run. For each selected stream it
//! emits the schema, pulls pages through the paginator (each fetch
//! already rate-limited and retried by the client), validates and
//! projects records, folds incremental bookmark values into the
//! bookmark store, and checkpoints state after every page.
//!
//! Per-stream state machine:
//! `INIT -> SCHEMA_EMITTED -> EXTRACTING -> CHECKPOINTING (loop) -> COMPLETE`,
//! with `FAILED` reachable from extraction. A failed stream emits no
//! further STATE messages; whether sibling streams still run is the
//! configured failure policy.

mod types;

pub use types::{SyncStats, SyncSummary};

use crate::catalog::SelectedStream;
use crate::config::{FailurePolicy, TapConfig};
use crate::http::ApiClient;
use crate::messages::{Message, MessageWriter};
use crate::pagination::Paginator;
use crate::schema::validate_record;
use crate::state::{BookmarkStore, State};
use crate::streams::{bookmark_to_millis, EndpointFetcher, StreamDescriptor};
use serde_json::Value;
use std::collections::BTreeSet;
use std::io::Write;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Orchestrates extraction across the selected streams
pub struct SyncEngine<'a, W: Write> {
    client: &'a ApiClient,
    config: &'a TapConfig,
    writer: MessageWriter<W>,
    bookmarks: BookmarkStore,
    stats: SyncStats,
}

impl<'a, W: Write> SyncEngine<'a, W> {
    /// Create an engine seeded with the caller's prior state
    /// (or `State::new()` for a first run).
    pub fn new(
        client: &'a ApiClient,
        config: &'a TapConfig,
        writer: MessageWriter<W>,
        initial_state: State,
    ) -> Self {
        Self {
            client,
            config,
            writer,
            bookmarks: BookmarkStore::new(initial_state),
            stats: SyncStats::new(),
        }
    }

    /// Run every selected stream, honoring the configured failure
    /// policy, and return the run summary.
    pub async fn sync_all(&mut self, streams: &[SelectedStream]) -> SyncSummary {
        let started = Instant::now();
        let mut failures = Vec::new();

        for stream in streams {
            let name = stream.descriptor.name.clone();
            match self.sync_stream(stream).await {
                Ok(()) => {}
                Err(e) => {
                    error!(stream = name, "Stream failed: {e}");
                    self.stats.add_failed_stream();
                    failures.push((name, e));
                    if self.config.on_stream_failure == FailurePolicy::Abort {
                        warn!("Aborting run after stream failure per configuration");
                        break;
                    }
                }
            }
        }

        self.stats.set_duration(started.elapsed().as_millis() as u64);
        info!(
            records = self.stats.records_synced,
            skipped = self.stats.records_skipped,
            pages = self.stats.pages_fetched,
            streams = self.stats.streams_synced,
            failed = self.stats.streams_failed,
            duration_ms = self.stats.duration_ms,
            "Sync run finished"
        );

        SyncSummary {
            stats: self.stats.clone(),
            failures,
        }
    }

    /// Run statistics so far
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Consume the engine, returning the message writer
    pub fn into_writer(self) -> MessageWriter<W> {
        self.writer
    }

    /// Extract one stream end to end.
    async fn sync_stream(&mut self, stream: &SelectedStream) -> crate::error::Result<()> {
        let descriptor = &stream.descriptor;
        let name = descriptor.name.as_str();

        info!(
            stream = name,
            replication = %descriptor.replication.method(),
            "Starting stream"
        );

        // INIT -> SCHEMA_EMITTED: the schema precedes every record.
        let schema = match &stream.fields {
            Some(fields) => descriptor.schema.project(fields),
            None => descriptor.schema.clone(),
        };
        self.writer
            .write(&Message::schema(name, schema, descriptor.key_properties.clone()))
            .map_err(|e| e.for_stream(name))?;

        // SCHEMA_EMITTED -> EXTRACTING: full-table starts from the
        // beginning; incremental starts from the stored bookmark or the
        // configured start date.
        let floor = self.starting_floor(descriptor);
        let fetcher = EndpointFetcher::new(self.client, descriptor, floor);
        let mut paginator = Paginator::new(
            &fetcher,
            descriptor.endpoint.clone(),
            descriptor.records_path.clone(),
            self.config.max_pages_per_stream,
        );

        loop {
            let Some(page) = paginator
                .next_page()
                .await
                .map_err(|e| e.for_stream(name))?
            else {
                break;
            };

            for record in &page.records {
                // A single malformed record is skipped and counted, never
                // the whole stream.
                if let Err(violation) = validate_record(&descriptor.schema, record) {
                    self.stats.add_skipped();
                    warn!(
                        stream = name,
                        page = page.number,
                        "Skipping record that failed schema validation: {violation}"
                    );
                    continue;
                }

                let projected = project_record(record, stream.fields.as_ref());
                self.writer
                    .write(&Message::record(name, projected))
                    .map_err(|e| e.for_stream(name))?;
                self.stats.add_record();

                // Bookmark advances only after the record is emitted.
                if let Some(bookmark_field) = descriptor.bookmark_field() {
                    match record.get(bookmark_field) {
                        Some(value) if !value.is_null() => {
                            self.bookmarks.set(name, bookmark_field, value.clone());
                        }
                        _ => debug!(
                            stream = name,
                            bookmark_field, "Record carries no bookmark value"
                        ),
                    }
                }
            }

            self.stats.add_page();

            // EXTRACTING -> CHECKPOINTING: snapshot after each page.
            // The final page's snapshot is the COMPLETE-state message
            // emitted below.
            if page.has_next() {
                self.writer
                    .write(&Message::state(self.bookmarks.snapshot()))
                    .map_err(|e| e.for_stream(name))?;
            }
        }

        // -> COMPLETE
        self.writer
            .write(&Message::state(self.bookmarks.snapshot()))
            .map_err(|e| e.for_stream(name))?;
        self.stats.add_stream();

        info!(stream = name, "Stream complete");
        Ok(())
    }

    /// The incremental floor for a stream's first request, as epoch
    /// milliseconds. Full-table streams have none.
    fn starting_floor(&self, descriptor: &StreamDescriptor) -> Option<i64> {
        let bookmark_field = descriptor.bookmark_field()?;

        let stored = self
            .bookmarks
            .value(&descriptor.name, bookmark_field)
            .and_then(bookmark_to_millis);

        stored.or_else(|| self.config.start_timestamp_millis())
    }
}

/// Project a record to the resolved field set.
///
/// The field set already includes forced key properties, so projection
/// can never strip a record's identity.
fn project_record(record: &Value, fields: Option<&BTreeSet<String>>) -> Value {
    let Some(fields) = fields else {
        return record.clone();
    };
    let Some(object) = record.as_object() else {
        return record.clone();
    };

    Value::Object(
        object
            .iter()
            .filter(|(name, _)| fields.contains(*name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect(),
    )
}

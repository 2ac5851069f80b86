//! Bookmark store
//!
//! In-memory incremental state for a sync run, passed explicitly
//! through the sync engine's call chain (never a process-wide
//! singleton). The store enforces the monotonic-max invariant: a
//! bookmark never decreases within a run.

use super::types::{Bookmark, State};
use serde_json::Value;
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Mutable per-run view over a [`State`] document
#[derive(Debug, Clone, Default)]
pub struct BookmarkStore {
    state: State,
}

impl BookmarkStore {
    /// Create a store seeded with a prior state document
    /// (or `State::new()` for a first run).
    pub fn new(state: State) -> Self {
        Self { state }
    }

    /// Get the bookmark map for a stream
    pub fn get(&self, stream: &str) -> Option<&Bookmark> {
        self.state.get_bookmark(stream)
    }

    /// Get a single bookmark value
    pub fn value(&self, stream: &str, field: &str) -> Option<&Value> {
        self.state.bookmark_value(stream, field)
    }

    /// Advance a bookmark with monotonic-max semantics.
    ///
    /// A value lower than the stored one is ignored (and logged at
    /// debug): a decreasing value typically means an out-of-order page,
    /// which is not worth aborting a stream over. Returns whether the
    /// stored value was updated.
    pub fn set(&mut self, stream: &str, field: &str, value: Value) -> bool {
        match self.state.bookmark_value(stream, field) {
            Some(current) => match compare_bookmark_values(current, &value) {
                Some(Ordering::Less) => {
                    self.state.set_bookmark(stream, field, value);
                    true
                }
                Some(Ordering::Equal | Ordering::Greater) => {
                    debug!(
                        stream,
                        field,
                        current = %current,
                        offered = %value,
                        "Ignoring non-increasing bookmark value"
                    );
                    false
                }
                None => {
                    // Incomparable (type changed mid-stream). Take the new
                    // value so extraction can still make progress.
                    warn!(
                        stream,
                        field,
                        current = %current,
                        offered = %value,
                        "Bookmark values are not comparable; replacing"
                    );
                    self.state.set_bookmark(stream, field, value);
                    true
                }
            },
            None => {
                self.state.set_bookmark(stream, field, value);
                true
            }
        }
    }

    /// Snapshot the current state document for a STATE message
    pub fn snapshot(&self) -> State {
        self.state.clone()
    }

    /// Consume the store, returning the final state document
    pub fn into_state(self) -> State {
        self.state
    }
}

/// Compare two bookmark values as scalars.
///
/// Numbers compare numerically, strings lexicographically (ISO-8601
/// timestamps order correctly this way). Mixed or non-scalar types are
/// incomparable.
fn compare_bookmark_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64().partial_cmp(&y.as_f64()),
        (Value::String(x), Value::String(y)) => Some(x.as_str().cmp(y.as_str())),
        _ => None,
    }
}

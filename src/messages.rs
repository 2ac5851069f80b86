//! Output message types and writer
//!
//! The tap's contract with downstream loaders is an ordered sequence of
//! newline-delimited JSON messages on stdout: a SCHEMA message before any
//! RECORD for the same stream, RECORD messages in source order, and
//! STATE messages at checkpoint boundaries. All emission flows through a
//! single [`MessageWriter`] so the ordering invariant holds by
//! construction.

use crate::error::Result;
use crate::schema::JsonSchema;
use crate::state::State;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;

/// A single output message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Schema declaration for a stream
    #[serde(rename = "SCHEMA")]
    Schema {
        /// Stream name
        stream: String,
        /// JSON schema of emitted records
        schema: JsonSchema,
        /// Primary key fields
        key_properties: Vec<String>,
    },

    /// One extracted record
    #[serde(rename = "RECORD")]
    Record {
        /// Stream name
        stream: String,
        /// The record payload
        record: Value,
    },

    /// Snapshot of all bookmarks
    #[serde(rename = "STATE")]
    State {
        /// The full state document
        value: State,
    },
}

impl Message {
    /// Create a schema message
    pub fn schema(stream: impl Into<String>, schema: JsonSchema, key_properties: Vec<String>) -> Self {
        Self::Schema {
            stream: stream.into(),
            schema,
            key_properties,
        }
    }

    /// Create a record message
    pub fn record(stream: impl Into<String>, record: Value) -> Self {
        Self::Record {
            stream: stream.into(),
            record,
        }
    }

    /// Create a state message
    pub fn state(value: State) -> Self {
        Self::State { value }
    }
}

/// Serializing writer for the output message sequence
///
/// One instance per run; the sync engine borrows it mutably, which
/// serializes emission even if stream extraction is ever parallelized.
#[derive(Debug)]
pub struct MessageWriter<W: Write> {
    out: W,
    records_written: u64,
    states_written: u64,
}

impl<W: Write> MessageWriter<W> {
    /// Create a writer over any output sink
    pub fn new(out: W) -> Self {
        Self {
            out,
            records_written: 0,
            states_written: 0,
        }
    }

    /// Emit a single message as one JSON line
    pub fn write(&mut self, message: &Message) -> Result<()> {
        serde_json::to_writer(&mut self.out, message)?;
        self.out.write_all(b"\n")?;
        match message {
            Message::Record { .. } => self.records_written += 1,
            Message::State { .. } => {
                self.states_written += 1;
                // State marks a checkpoint; make it observable immediately
                self.out.flush()?;
            }
            Message::Schema { .. } => {}
        }
        Ok(())
    }

    /// Records emitted so far
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// State snapshots emitted so far
    pub fn states_written(&self) -> u64 {
        self.states_written
    }

    /// Flush the underlying sink
    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    /// Consume the writer, returning the sink
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaProperty;
    use serde_json::json;

    fn write_all(messages: &[Message]) -> Vec<Value> {
        let mut writer = MessageWriter::new(Vec::new());
        for message in messages {
            writer.write(message).unwrap();
        }
        let out = writer.into_inner();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_schema_message_shape() {
        let schema = JsonSchema::with_properties([("id", SchemaProperty::string())]);
        let lines = write_all(&[Message::schema("users", schema, vec!["id".to_string()])]);

        assert_eq!(lines[0]["type"], "SCHEMA");
        assert_eq!(lines[0]["stream"], "users");
        assert_eq!(lines[0]["key_properties"], json!(["id"]));
        assert_eq!(lines[0]["schema"]["type"], "object");
    }

    #[test]
    fn test_record_message_shape() {
        let lines = write_all(&[Message::record("users", json!({"id": "u1"}))]);

        assert_eq!(lines[0]["type"], "RECORD");
        assert_eq!(lines[0]["stream"], "users");
        assert_eq!(lines[0]["record"]["id"], "u1");
    }

    #[test]
    fn test_state_message_shape() {
        let mut state = State::new();
        state.set_bookmark("users", "updated_at", json!("2020-02-02"));
        let lines = write_all(&[Message::state(state)]);

        assert_eq!(lines[0]["type"], "STATE");
        assert_eq!(
            lines[0]["value"]["bookmarks"]["users"]["updated_at"],
            "2020-02-02"
        );
    }

    #[test]
    fn test_writer_counts() {
        let schema = JsonSchema::new();
        let mut writer = MessageWriter::new(Vec::new());
        writer
            .write(&Message::schema("users", schema, vec![]))
            .unwrap();
        writer
            .write(&Message::record("users", json!({"id": 1})))
            .unwrap();
        writer
            .write(&Message::record("users", json!({"id": 2})))
            .unwrap();
        writer.write(&Message::state(State::new())).unwrap();

        assert_eq!(writer.records_written(), 2);
        assert_eq!(writer.states_written(), 1);
    }

    #[test]
    fn test_messages_are_newline_delimited() {
        let mut writer = MessageWriter::new(Vec::new());
        writer
            .write(&Message::record("users", json!({"id": 1})))
            .unwrap();
        writer
            .write(&Message::record("users", json!({"id": 2})))
            .unwrap();
        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(out.lines().count(), 2);
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn test_message_roundtrip() {
        let message = Message::record("roles", json!({"id": "r1", "name": "Admin"}));
        let json = serde_json::to_string(&message).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(message, back);
    }
}

//! Stream descriptor types

use crate::error::{Error, Result};
use crate::schema::JsonSchema;
use crate::types::{JsonObject, ReplicationMethod};

/// Replication strategy for a stream
///
/// A closed set of tagged variants; the engine dispatches on the tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replication {
    /// Re-extract everything each run
    FullTable,
    /// Extract records whose bookmark field is past the stored bookmark
    Incremental {
        /// Record field tracked as the bookmark
        bookmark_field: String,
        /// Request body parameter carrying the bookmark floor
        /// (epoch milliseconds)
        request_param: String,
    },
}

impl Replication {
    /// The wire-format replication method tag
    pub fn method(&self) -> ReplicationMethod {
        match self {
            Replication::FullTable => ReplicationMethod::FullTable,
            Replication::Incremental { .. } => ReplicationMethod::Incremental,
        }
    }

    /// The bookmark field, for incremental streams
    pub fn bookmark_field(&self) -> Option<&str> {
        match self {
            Replication::FullTable => None,
            Replication::Incremental { bookmark_field, .. } => Some(bookmark_field),
        }
    }
}

/// Declarative definition of one extractable entity
///
/// Immutable after construction; one instance per logical entity.
#[derive(Debug, Clone)]
pub struct StreamDescriptor {
    /// Unique stream name
    pub name: String,
    /// JSON schema of the stream's records
    pub schema: JsonSchema,
    /// Primary key fields, in order
    pub key_properties: Vec<String>,
    /// Replication strategy
    pub replication: Replication,
    /// API endpoint path (e.g. `"users.list"`)
    pub endpoint: String,
    /// Response field holding the record array (e.g. `"users"`)
    pub records_path: String,
    /// Extra request body parameters (e.g. `form_id`)
    pub body: JsonObject,
}

impl StreamDescriptor {
    /// Construct a descriptor, enforcing its structural invariants:
    /// every key property must be in the schema, and an incremental
    /// stream's bookmark field must be in the schema.
    pub fn new(
        name: impl Into<String>,
        schema: JsonSchema,
        key_properties: Vec<String>,
        replication: Replication,
        endpoint: impl Into<String>,
        records_path: impl Into<String>,
        body: JsonObject,
    ) -> Result<Self> {
        let name = name.into();

        for key in &key_properties {
            if !schema.has_property(key) {
                return Err(Error::invalid_catalog(format!(
                    "stream '{name}' declares key property '{key}' that is not in its schema"
                )));
            }
        }

        if let Replication::Incremental { bookmark_field, .. } = &replication {
            if !schema.has_property(bookmark_field) {
                return Err(Error::invalid_catalog(format!(
                    "stream '{name}' declares bookmark field '{bookmark_field}' that is not in its schema"
                )));
            }
        }

        Ok(Self {
            name,
            schema,
            key_properties,
            replication,
            endpoint: endpoint.into(),
            records_path: records_path.into(),
            body,
        })
    }

    /// Whether this stream replicates incrementally
    pub fn is_incremental(&self) -> bool {
        matches!(self.replication, Replication::Incremental { .. })
    }

    /// The bookmark field, for incremental streams
    pub fn bookmark_field(&self) -> Option<&str> {
        self.replication.bookmark_field()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaProperty;

    fn schema() -> JsonSchema {
        JsonSchema::with_properties([
            ("id", SchemaProperty::integer().required()),
            ("updated", SchemaProperty::integer()),
        ])
    }

    #[test]
    fn test_valid_incremental_descriptor() {
        let descriptor = StreamDescriptor::new(
            "responses",
            schema(),
            vec!["id".to_string()],
            Replication::Incremental {
                bookmark_field: "updated".to_string(),
                request_param: "updated_after".to_string(),
            },
            "responses.list",
            "responses",
            JsonObject::new(),
        )
        .unwrap();

        assert!(descriptor.is_incremental());
        assert_eq!(descriptor.bookmark_field(), Some("updated"));
        assert_eq!(
            descriptor.replication.method(),
            crate::types::ReplicationMethod::Incremental
        );
    }

    #[test]
    fn test_bookmark_field_must_be_in_schema() {
        let err = StreamDescriptor::new(
            "responses",
            schema(),
            vec!["id".to_string()],
            Replication::Incremental {
                bookmark_field: "modified_at".to_string(),
                request_param: "updated_after".to_string(),
            },
            "responses.list",
            "responses",
            JsonObject::new(),
        )
        .unwrap_err();

        assert!(matches!(err, Error::InvalidCatalog { .. }));
    }

    #[test]
    fn test_key_property_must_be_in_schema() {
        let err = StreamDescriptor::new(
            "responses",
            schema(),
            vec!["uuid".to_string()],
            Replication::FullTable,
            "responses.list",
            "responses",
            JsonObject::new(),
        )
        .unwrap_err();

        assert!(matches!(err, Error::InvalidCatalog { .. }));
    }

    #[test]
    fn test_full_table_has_no_bookmark() {
        let descriptor = StreamDescriptor::new(
            "roles",
            schema(),
            vec!["id".to_string()],
            Replication::FullTable,
            "roles.list",
            "roles",
            JsonObject::new(),
        )
        .unwrap();

        assert!(!descriptor.is_incremental());
        assert!(descriptor.bookmark_field().is_none());
    }
}

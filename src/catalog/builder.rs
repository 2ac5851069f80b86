//! Discovery and selection resolution
//!
//! Discovery enumerates the built-in streams (no network) and
//! introspects the form roster for dynamic per-form response streams —
//! the single `forms.list` call is the only fetching discovery does.
//! Selection resolution intersects the descriptor set with the caller's
//! annotated catalog to produce the working set for a run.

use super::types::{Catalog, CatalogEntry};
use crate::error::{Error, Result};
use crate::http::ApiClient;
use crate::streams::{built_in_streams, form_responses_stream, StreamDescriptor};
use crate::types::JsonObject;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// A stream chosen for extraction, with its resolved field set
#[derive(Debug, Clone)]
pub struct SelectedStream {
    /// The stream's descriptor
    pub descriptor: StreamDescriptor,
    /// Fields to emit; `None` means every schema field
    pub fields: Option<BTreeSet<String>>,
}

impl SelectedStream {
    /// Select a descriptor with every field emitted
    pub fn all_fields(descriptor: StreamDescriptor) -> Self {
        Self {
            descriptor,
            fields: None,
        }
    }
}

/// Enumerate every extractable stream.
///
/// Built-in streams are static; per-form response streams come from one
/// `forms.list` introspection call.
pub async fn discover_streams(client: &ApiClient) -> Result<Vec<StreamDescriptor>> {
    let mut streams = built_in_streams();

    let body = client.call("forms.list", JsonObject::new()).await?;
    let forms = body
        .get("forms")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::malformed("forms.list", "response has no 'forms' array"))?;

    for form in forms {
        let id = form.get("id").and_then(Value::as_i64).ok_or_else(|| {
            Error::malformed("forms.list", format!("form entry has no numeric id: {form}"))
        })?;
        let name = form.get("name").and_then(Value::as_str).ok_or_else(|| {
            Error::malformed("forms.list", format!("form entry has no name: {form}"))
        })?;

        streams.push(form_responses_stream(id, name)?);
    }

    info!(
        built_in = built_in_streams().len(),
        forms = forms.len(),
        "Discovered streams"
    );

    Ok(streams)
}

/// Produce the catalog document for a descriptor set
pub fn build_catalog(streams: &[StreamDescriptor]) -> Catalog {
    Catalog {
        streams: streams
            .iter()
            .map(|descriptor| CatalogEntry {
                stream: descriptor.name.clone(),
                schema: descriptor.schema.clone(),
                key_properties: descriptor.key_properties.clone(),
                replication_method: descriptor.replication.method(),
                bookmark_field: descriptor.bookmark_field().map(ToString::to_string),
                selected: None,
                fields: None,
            })
            .collect(),
    }
}

/// Intersect descriptors with the caller's selection annotations.
///
/// Rules:
/// - a stream with no `selected: true` annotation is excluded
/// - a selected stream must exist in the descriptor set
/// - every listed field must exist in the stream's schema
/// - an incremental stream's bookmark field must not be deselected
///   (dropping it silently would break resumability)
/// - key properties are force-retained even when left out of the list
pub fn resolve_selection(
    descriptors: &[StreamDescriptor],
    catalog: &Catalog,
) -> Result<Vec<SelectedStream>> {
    let mut selected = Vec::new();

    for entry in &catalog.streams {
        if entry.selected != Some(true) {
            debug!(stream = entry.stream, "Stream not selected, skipping");
            continue;
        }

        let descriptor = descriptors
            .iter()
            .find(|d| d.name == entry.stream)
            .ok_or_else(|| Error::StreamNotFound {
                stream: entry.stream.clone(),
            })?;

        let fields = match &entry.fields {
            None => None,
            Some(listed) => Some(resolve_fields(descriptor, listed)?),
        };

        selected.push(SelectedStream {
            descriptor: descriptor.clone(),
            fields,
        });
    }

    Ok(selected)
}

fn resolve_fields(
    descriptor: &StreamDescriptor,
    listed: &[String],
) -> Result<BTreeSet<String>> {
    for field in listed {
        if !descriptor.schema.has_property(field) {
            return Err(Error::invalid_catalog(format!(
                "stream '{}' selects field '{field}' that is not in its schema",
                descriptor.name
            )));
        }
    }

    let mut fields: BTreeSet<String> = listed.iter().cloned().collect();

    if let Some(bookmark) = descriptor.bookmark_field() {
        if !fields.contains(bookmark) {
            return Err(Error::invalid_catalog(format!(
                "stream '{}' deselects its bookmark field '{bookmark}'; \
                 incremental resumability requires it",
                descriptor.name
            )));
        }
    }

    for key in &descriptor.key_properties {
        if fields.insert(key.clone()) {
            debug!(
                stream = descriptor.name,
                key, "Key property was deselected; retaining it anyway"
            );
        }
    }

    Ok(fields)
}

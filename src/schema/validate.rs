//! Record validation against stream schemas
//!
//! Validation is deliberately permissive in the directions real APIs
//! drift: undeclared fields pass (schemas allow additional properties),
//! and absent fields pass. A declared field present with the wrong type
//! is a violation.

use super::types::{JsonSchema, JsonType, SchemaProperty};
use serde_json::Value;

/// Validate a raw record against a stream schema.
///
/// Returns a human-readable description of the first violation found,
/// or `Ok(())` if the record conforms.
pub fn validate_record(schema: &JsonSchema, record: &Value) -> Result<(), String> {
    let Some(object) = record.as_object() else {
        return Err(format!("record is not a JSON object: {record}"));
    };

    for (name, property) in &schema.properties {
        if let Some(value) = object.get(name) {
            check_value(name, property, value)?;
        }
    }

    Ok(())
}

fn check_value(field: &str, property: &SchemaProperty, value: &Value) -> Result<(), String> {
    if value.is_null() {
        if property.is_nullable() {
            return Ok(());
        }
        return Err(format!("field '{field}' is null but not nullable"));
    }

    let matched = property.json_type.types().iter().any(|t| matches_type(*t, value));
    if !matched {
        return Err(format!(
            "field '{field}' has type {} but schema expects {:?}",
            value_type_name(value),
            property
                .json_type
                .types()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
        ));
    }

    // Recurse into containers
    if let (Some(items), Some(elements)) = (&property.items, value.as_array()) {
        for (index, element) in elements.iter().enumerate() {
            check_value(&format!("{field}[{index}]"), items, element)?;
        }
    }
    if let (Some(nested), Some(object)) = (&property.properties, value.as_object()) {
        for (name, nested_property) in nested {
            if let Some(nested_value) = object.get(name) {
                check_value(&format!("{field}.{name}"), nested_property, nested_value)?;
            }
        }
    }

    Ok(())
}

fn matches_type(expected: JsonType, value: &Value) -> bool {
    match expected {
        JsonType::String => value.is_string(),
        JsonType::Integer => value.is_i64() || value.is_u64(),
        JsonType::Number => value.is_number(),
        JsonType::Boolean => value.is_boolean(),
        JsonType::Object => value.is_object(),
        JsonType::Array => value.is_array(),
        JsonType::Null => value.is_null(),
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

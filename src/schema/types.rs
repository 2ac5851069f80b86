//! Schema types

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// JSON Schema type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Null,
}

impl std::fmt::Display for JsonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsonType::String => write!(f, "string"),
            JsonType::Number => write!(f, "number"),
            JsonType::Integer => write!(f, "integer"),
            JsonType::Boolean => write!(f, "boolean"),
            JsonType::Object => write!(f, "object"),
            JsonType::Array => write!(f, "array"),
            JsonType::Null => write!(f, "null"),
        }
    }
}

/// JSON type can be a single type or array of types (for nullable)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonTypeOrArray {
    Single(JsonType),
    Multiple(Vec<JsonType>),
}

impl JsonTypeOrArray {
    /// Create a single type
    pub fn single(t: JsonType) -> Self {
        JsonTypeOrArray::Single(t)
    }

    /// Create a nullable type
    pub fn nullable(t: JsonType) -> Self {
        if t == JsonType::Null {
            JsonTypeOrArray::Single(JsonType::Null)
        } else {
            JsonTypeOrArray::Multiple(vec![t, JsonType::Null])
        }
    }

    /// Check if this type admits null
    pub fn is_nullable(&self) -> bool {
        match self {
            JsonTypeOrArray::Single(t) => *t == JsonType::Null,
            JsonTypeOrArray::Multiple(types) => types.contains(&JsonType::Null),
        }
    }

    /// All admitted types
    pub fn types(&self) -> Vec<JsonType> {
        match self {
            JsonTypeOrArray::Single(t) => vec![*t],
            JsonTypeOrArray::Multiple(types) => types.clone(),
        }
    }
}

/// JSON Schema property definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaProperty {
    /// Property type(s)
    #[serde(rename = "type")]
    pub json_type: JsonTypeOrArray,

    /// Format hint (e.g., "date-time")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Nested properties (for objects)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, SchemaProperty>>,

    /// Additional properties allowed (for objects)
    #[serde(
        rename = "additionalProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<bool>,

    /// Array items schema
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaProperty>>,
}

impl SchemaProperty {
    /// Create a new property with the given type
    pub fn new(json_type: JsonType) -> Self {
        Self {
            json_type: JsonTypeOrArray::single(json_type),
            format: None,
            properties: None,
            additional_properties: None,
            items: None,
        }
    }

    /// Create a nullable property
    pub fn nullable(json_type: JsonType) -> Self {
        Self {
            json_type: JsonTypeOrArray::nullable(json_type),
            ..Self::new(json_type)
        }
    }

    /// Nullable string property
    pub fn string() -> Self {
        Self::nullable(JsonType::String)
    }

    /// Nullable integer property
    pub fn integer() -> Self {
        Self::nullable(JsonType::Integer)
    }

    /// Nullable number property
    pub fn number() -> Self {
        Self::nullable(JsonType::Number)
    }

    /// Nullable boolean property
    pub fn boolean() -> Self {
        Self::nullable(JsonType::Boolean)
    }

    /// Nullable date-time string property
    pub fn date_time() -> Self {
        Self::nullable(JsonType::String).with_format("date-time")
    }

    /// Create an object property with nested properties
    pub fn object(properties: BTreeMap<String, SchemaProperty>) -> Self {
        Self {
            json_type: JsonTypeOrArray::single(JsonType::Object),
            format: None,
            properties: Some(properties),
            additional_properties: Some(true),
            items: None,
        }
    }

    /// Create an array property with item schema
    pub fn array(items: SchemaProperty) -> Self {
        Self {
            json_type: JsonTypeOrArray::nullable(JsonType::Array),
            format: None,
            properties: None,
            additional_properties: None,
            items: Some(Box::new(items)),
        }
    }

    /// Set format hint
    #[must_use]
    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    /// Make this property non-nullable
    #[must_use]
    pub fn required(mut self) -> Self {
        let types: Vec<JsonType> = self
            .json_type
            .types()
            .into_iter()
            .filter(|t| *t != JsonType::Null)
            .collect();
        self.json_type = match types.len() {
            1 => JsonTypeOrArray::Single(types[0]),
            _ => JsonTypeOrArray::Multiple(types),
        };
        self
    }

    /// Check if nullable
    pub fn is_nullable(&self) -> bool {
        self.json_type.is_nullable()
    }
}

/// Full JSON Schema document for a stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSchema {
    /// Schema type (always "object" for a stream)
    #[serde(rename = "type")]
    pub json_type: JsonType,

    /// Object properties
    #[serde(default)]
    pub properties: BTreeMap<String, SchemaProperty>,

    /// Allow additional properties
    #[serde(rename = "additionalProperties", default = "default_true")]
    pub additional_properties: bool,
}

fn default_true() -> bool {
    true
}

impl Default for JsonSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonSchema {
    /// Create a new empty object schema
    pub fn new() -> Self {
        Self {
            json_type: JsonType::Object,
            properties: BTreeMap::new(),
            additional_properties: true,
        }
    }

    /// Build a schema from an iterator of named properties
    pub fn with_properties<I, S>(properties: I) -> Self
    where
        I: IntoIterator<Item = (S, SchemaProperty)>,
        S: Into<String>,
    {
        Self {
            json_type: JsonType::Object,
            properties: properties
                .into_iter()
                .map(|(name, prop)| (name.into(), prop))
                .collect(),
            additional_properties: true,
        }
    }

    /// Add a property
    pub fn add_property(&mut self, name: &str, property: SchemaProperty) {
        self.properties.insert(name.to_string(), property);
    }

    /// Get a property
    pub fn get_property(&self, name: &str) -> Option<&SchemaProperty> {
        self.properties.get(name)
    }

    /// Check whether a property is declared
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Declared property names
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Restrict the schema to the given field set
    pub fn project(&self, fields: &BTreeSet<String>) -> JsonSchema {
        Self {
            json_type: self.json_type,
            properties: self
                .properties
                .iter()
                .filter(|(name, _)| fields.contains(*name))
                .map(|(name, prop)| (name.clone(), prop.clone()))
                .collect(),
            additional_properties: self.additional_properties,
        }
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullable_type_serialization() {
        let prop = SchemaProperty::string();
        let json = serde_json::to_value(&prop).unwrap();
        assert_eq!(json["type"], serde_json::json!(["string", "null"]));
    }

    #[test]
    fn test_required_strips_null() {
        let prop = SchemaProperty::string().required();
        let json = serde_json::to_value(&prop).unwrap();
        assert_eq!(json["type"], serde_json::json!("string"));
        assert!(!prop.is_nullable());
    }

    #[test]
    fn test_date_time_format() {
        let prop = SchemaProperty::date_time();
        let json = serde_json::to_value(&prop).unwrap();
        assert_eq!(json["format"], "date-time");
    }

    #[test]
    fn test_schema_roundtrip() {
        let schema = JsonSchema::with_properties([
            ("id", SchemaProperty::string().required()),
            ("name", SchemaProperty::string()),
            ("clients_id", SchemaProperty::array(SchemaProperty::string())),
        ]);

        let json = serde_json::to_string(&schema).unwrap();
        let back: JsonSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(schema, back);
        assert!(back.has_property("clients_id"));
    }

    #[test]
    fn test_project_keeps_only_selected() {
        let schema = JsonSchema::with_properties([
            ("id", SchemaProperty::string()),
            ("name", SchemaProperty::string()),
            ("email", SchemaProperty::string()),
        ]);

        let fields: BTreeSet<String> = ["id", "email"].iter().map(ToString::to_string).collect();
        let projected = schema.project(&fields);

        assert!(projected.has_property("id"));
        assert!(projected.has_property("email"));
        assert!(!projected.has_property("name"));
    }

    #[test]
    fn test_object_property_nesting() {
        let creator = SchemaProperty::object(
            [
                ("id".to_string(), SchemaProperty::string()),
                ("firstname".to_string(), SchemaProperty::string()),
            ]
            .into_iter()
            .collect(),
        );
        let json = serde_json::to_value(&creator).unwrap();
        assert_eq!(json["properties"]["firstname"]["type"][0], "string");
        assert_eq!(json["additionalProperties"], true);
    }
}

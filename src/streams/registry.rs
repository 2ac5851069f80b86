//! Built-in stream definitions
//!
//! Static descriptors for the fixed API entities, plus the constructor
//! for per-form response streams discovered at runtime.

use super::descriptor::{Replication, StreamDescriptor};
use crate::error::Result;
use crate::schema::{JsonSchema, JsonType, SchemaProperty};
use crate::types::JsonObject;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w]+").expect("valid regex"));

/// Clean a form name into a stream name: spaces become underscores and
/// anything outside `\w` is stripped.
pub fn sanitize_form_name(name: &str) -> String {
    NON_WORD.replace_all(&name.replace(' ', "_"), "").to_string()
}

/// The statically known streams
pub fn built_in_streams() -> Vec<StreamDescriptor> {
    vec![roles(), users(), lines_of_business()]
}

fn roles() -> StreamDescriptor {
    let schema = JsonSchema::with_properties([
        ("id", SchemaProperty::string().required()),
        ("name", SchemaProperty::string()),
    ]);

    StreamDescriptor::new(
        "roles",
        schema,
        vec!["id".to_string()],
        Replication::FullTable,
        "roles.list",
        "roles",
        JsonObject::new(),
    )
    .expect("static stream definition is valid")
}

fn users() -> StreamDescriptor {
    let creator = SchemaProperty::object(
        [
            ("firstname".to_string(), SchemaProperty::string()),
            ("lastname".to_string(), SchemaProperty::string()),
            ("id".to_string(), SchemaProperty::string()),
        ]
        .into_iter()
        .collect(),
    );

    let schema = JsonSchema::with_properties([
        ("id", SchemaProperty::string().required()),
        ("created", SchemaProperty::integer()),
        ("registered_on", SchemaProperty::integer()),
        ("supervisor_id", SchemaProperty::string()),
        ("mentor_id", SchemaProperty::string()),
        ("hse_id", SchemaProperty::string()),
        ("manager_id", SchemaProperty::string()),
        ("clients_id", SchemaProperty::array(SchemaProperty::string())),
        ("firstname", SchemaProperty::string()),
        ("lastname", SchemaProperty::string()),
        ("employeeNumber", SchemaProperty::string()),
        ("email", SchemaProperty::string().with_format("email")),
        ("username", SchemaProperty::string()),
        ("cellPhone", SchemaProperty::string()),
        ("hireDate", SchemaProperty::integer()),
        ("sseDate", SchemaProperty::integer()),
        ("terminationDate", SchemaProperty::integer()),
        ("emergencyContact", SchemaProperty::string()),
        ("isDriver", SchemaProperty::boolean()),
        ("isRegulatedDriver", SchemaProperty::boolean()),
        ("role_id", SchemaProperty::string()),
        ("metavalues", SchemaProperty::nullable(JsonType::Object)),
        ("creator_id", creator),
        (
            "fieldOffice_id",
            SchemaProperty::array(SchemaProperty::string()),
        ),
        (
            "lineOfBusiness_id",
            SchemaProperty::array(SchemaProperty::string()),
        ),
        ("lastWebAccess", SchemaProperty::integer()),
        ("lastMobileAccess", SchemaProperty::integer()),
    ]);

    StreamDescriptor::new(
        "users",
        schema,
        vec!["id".to_string()],
        Replication::FullTable,
        "users.list",
        "users",
        JsonObject::new(),
    )
    .expect("static stream definition is valid")
}

fn lines_of_business() -> StreamDescriptor {
    let schema = JsonSchema::with_properties([
        ("id", SchemaProperty::string().required()),
        ("name", SchemaProperty::string()),
        ("code", SchemaProperty::string()),
        ("created", SchemaProperty::integer()),
    ]);

    StreamDescriptor::new(
        "lines_of_business",
        schema,
        vec!["id".to_string()],
        Replication::FullTable,
        "linesofbusiness.list",
        "linesofbusiness",
        JsonObject::new(),
    )
    .expect("static stream definition is valid")
}

/// Build the response stream for one discovered form.
///
/// Timestamps are epoch milliseconds as the API returns them.
pub fn form_responses_stream(form_id: i64, form_name: &str) -> Result<StreamDescriptor> {
    let stream_name = format!("{}_responses", sanitize_form_name(form_name));

    let schema = JsonSchema::with_properties([
        ("id", SchemaProperty::integer().required()),
        ("created", SchemaProperty::integer()),
        ("updated", SchemaProperty::integer()),
        ("form_id", SchemaProperty::integer()),
    ]);

    let mut body = JsonObject::new();
    body.insert("form_id".to_string(), json!(form_id));

    StreamDescriptor::new(
        stream_name,
        schema,
        vec!["id".to_string()],
        Replication::Incremental {
            bookmark_field: "updated".to_string(),
            request_param: "updated_after".to_string(),
        },
        "responses.list",
        "responses",
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_built_in_streams() {
        let streams = built_in_streams();
        let names: Vec<&str> = streams.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["roles", "users", "lines_of_business"]);

        for stream in &streams {
            assert!(!stream.is_incremental());
            assert_eq!(stream.key_properties, vec!["id".to_string()]);
        }
    }

    #[test]
    fn test_users_schema_covers_api_fields() {
        let users = built_in_streams().remove(1);
        assert_eq!(users.endpoint, "users.list");
        assert_eq!(users.records_path, "users");
        for field in ["email", "clients_id", "creator_id", "lastWebAccess"] {
            assert!(users.schema.has_property(field), "missing {field}");
        }
    }

    #[test_case("Incident Report", "Incident_Report"; "spaces become underscores")]
    #[test_case("Near-Miss (Draft)", "NearMiss_Draft"; "punctuation stripped")]
    #[test_case("Safety 2024!", "Safety_2024"; "trailing punctuation stripped")]
    #[test_case("plain", "plain"; "already clean")]
    fn test_sanitize_form_name(input: &str, expected: &str) {
        assert_eq!(sanitize_form_name(input), expected);
    }

    #[test]
    fn test_form_responses_stream() {
        let stream = form_responses_stream(42, "Incident Report").unwrap();

        assert_eq!(stream.name, "Incident_Report_responses");
        assert_eq!(stream.endpoint, "responses.list");
        assert_eq!(stream.records_path, "responses");
        assert_eq!(stream.bookmark_field(), Some("updated"));
        assert_eq!(stream.body.get("form_id"), Some(&serde_json::json!(42)));
    }
}

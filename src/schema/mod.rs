//! JSON schema trees and record validation
//!
//! Stream schemas are JSON-schema-like type trees, emitted verbatim in
//! SCHEMA messages and used to validate raw records before emission.

mod types;
mod validate;

pub use types::{JsonSchema, JsonType, JsonTypeOrArray, SchemaProperty};
pub use validate::validate_record;

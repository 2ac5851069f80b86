//! Stream descriptors and their fetchers
//!
//! A [`StreamDescriptor`] is the declarative definition of one
//! extractable entity: schema, key, replication strategy, and the
//! endpoint parameters needed to fetch it. The set of descriptors is
//! closed: built-in streams are static, and per-form response streams
//! are constructed from the form roster at discovery time.

mod descriptor;
mod fetch;
mod registry;

pub use descriptor::{Replication, StreamDescriptor};
pub use fetch::{bookmark_to_millis, EndpointFetcher};
pub use registry::{built_in_streams, form_responses_stream, sanitize_form_name};

//! Error types for tap-kpa
//!
//! This module defines the error hierarchy for the entire tap.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! The taxonomy follows the propagation rules of the sync engine:
//! configuration and catalog errors abort the run before any output,
//! fetch errors are classified transient/fatal per call, malformed
//! responses abort a single stream, and schema validation failures are
//! contained at record level.

use std::time::Duration;

use thiserror::Error;

/// The main error type for tap-kpa
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    // ============================================================================
    // Catalog Errors
    // ============================================================================
    #[error("Invalid catalog: {message}")]
    InvalidCatalog { message: String },

    #[error("Stream '{stream}' not found in catalog")]
    StreamNotFound { stream: String },

    // ============================================================================
    // Fetch Errors
    // ============================================================================
    #[error("Transient failure calling '{endpoint}': {message}")]
    TransientFetch {
        endpoint: String,
        message: String,
        /// Source-provided retry-after hint, when present
        retry_after: Option<Duration>,
    },

    #[error("Fatal failure calling '{endpoint}' (status {status:?}): {message}")]
    FatalFetch {
        endpoint: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Retries exhausted after {attempts} attempt(s) calling '{endpoint}': {message}")]
    RetriesExhausted {
        endpoint: String,
        attempts: u32,
        message: String,
    },

    #[error("Malformed response from '{endpoint}': {message}")]
    MalformedResponse { endpoint: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Record Errors
    // ============================================================================
    #[error("Record in stream '{stream}' failed schema validation: {message}")]
    SchemaValidation { stream: String, message: String },

    // ============================================================================
    // State Errors
    // ============================================================================
    #[error("State error: {message}")]
    State { message: String },

    // ============================================================================
    // Stream-Level Wrapper
    // ============================================================================
    /// A stream-scoped failure, carrying the stream name for diagnosis.
    #[error("Stream '{stream}' failed: {source}")]
    Stream {
        stream: String,
        #[source]
        source: Box<Error>,
    },

    // ============================================================================
    // I/O and Parsing
    // ============================================================================
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid catalog error
    pub fn invalid_catalog(message: impl Into<String>) -> Self {
        Self::InvalidCatalog {
            message: message.into(),
        }
    }

    /// Create a transient fetch error
    pub fn transient(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransientFetch {
            endpoint: endpoint.into(),
            message: message.into(),
            retry_after: None,
        }
    }

    /// Create a transient fetch error with a retry-after hint
    pub fn transient_with_hint(
        endpoint: impl Into<String>,
        message: impl Into<String>,
        retry_after: Duration,
    ) -> Self {
        Self::TransientFetch {
            endpoint: endpoint.into(),
            message: message.into(),
            retry_after: Some(retry_after),
        }
    }

    /// Create a fatal fetch error
    pub fn fatal(
        endpoint: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::FatalFetch {
            endpoint: endpoint.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a malformed response error
    pub fn malformed(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a schema validation error
    pub fn schema_validation(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaValidation {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Wrap this error with the name of the stream it occurred in
    pub fn for_stream(self, stream: impl Into<String>) -> Self {
        match self {
            // Already stream-scoped, keep the innermost attribution
            already @ Self::Stream { .. } => already,
            other => Self::Stream {
                stream: stream.into(),
                source: Box::new(other),
            },
        }
    }

    /// Check if this error is retryable
    ///
    /// Only transient fetch failures and transport-level timeouts or
    /// connection errors are retryable. Parse failures, fatal API
    /// responses, and malformed pages never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::TransientFetch { .. } => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Stream { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

/// Result type alias for tap-kpa
pub type Result<T> = std::result::Result<T, Error>;

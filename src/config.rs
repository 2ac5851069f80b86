//! Tap configuration
//!
//! Loads and validates the configuration object the rest of the tap
//! borrows for the duration of a run. Config comes from a JSON file;
//! `TAP_KPA_ACCESS_TOKEN` and `TAP_KPA_START_DATE` environment
//! variables override the file, matching the original connector's
//! ENV-based surface.

use crate::error::{Error, Result};
use crate::types::OptionStringExt;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default base URL of the KPA EHS API
pub const DEFAULT_BASE_URL: &str = "https://api.kpaehs.com/v1";

/// What to do with remaining streams after one fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Run remaining streams, report the failure, exit non-zero
    #[default]
    Continue,
    /// Stop the run at the first stream failure
    Abort,
}

/// Validated tap configuration
///
/// Immutable once loaded; owned by the caller and borrowed by the sync
/// engine for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapConfig {
    /// Token used to authenticate against the API
    pub access_token: String,

    /// Earliest record date to sync (RFC 3339 or `YYYY-MM-DD`)
    #[serde(default)]
    pub start_date: Option<String>,

    /// Records requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Override the User-Agent header
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Base URL override (primarily for testing against a mock server)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,

    /// Maximum retry attempts for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Client-side request rate limit
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,

    /// Safety valve against a remote paging loop that never terminates
    #[serde(default = "default_max_pages")]
    pub max_pages_per_stream: u32,

    /// Policy for sibling streams after a stream-level failure
    #[serde(default)]
    pub on_stream_failure: FailurePolicy,
}

fn default_page_size() -> u32 {
    100
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    5
}

fn default_rps() -> u32 {
    10
}

fn default_max_pages() -> u32 {
    10_000
}

impl TapConfig {
    /// Load configuration from a JSON file, then apply environment
    /// variable overrides and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::config(format!(
                "Failed to read config file {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_json(&contents)
    }

    /// Parse configuration from a JSON string, then apply environment
    /// variable overrides and validate.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: TapConfig = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Failed to parse config: {e}")))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(token) = std::env::var("TAP_KPA_ACCESS_TOKEN").ok().none_if_empty() {
            self.access_token = token;
        }
        if let Some(start) = std::env::var("TAP_KPA_START_DATE").ok().none_if_empty() {
            self.start_date = Some(start);
        }
    }

    /// Validate the configuration, failing before any sync work begins.
    pub fn validate(&self) -> Result<()> {
        if self.access_token.is_empty() {
            return Err(Error::missing_field("access_token"));
        }
        if self.page_size == 0 {
            return Err(Error::invalid_config("page_size", "must be at least 1"));
        }
        if self.max_pages_per_stream == 0 {
            return Err(Error::invalid_config(
                "max_pages_per_stream",
                "must be at least 1",
            ));
        }
        if let Some(start) = &self.start_date {
            parse_start_date(start)
                .ok_or_else(|| Error::invalid_config("start_date", format!("'{start}' is not an RFC 3339 datetime or YYYY-MM-DD date")))?;
        }
        Ok(())
    }

    /// The configured start date as epoch milliseconds, if set.
    pub fn start_timestamp_millis(&self) -> Option<i64> {
        self.start_date
            .as_deref()
            .and_then(parse_start_date)
            .map(|dt| dt.timestamp_millis())
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Parse an RFC 3339 datetime or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_start_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

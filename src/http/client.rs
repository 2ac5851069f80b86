//! Authenticated API client
//!
//! All KPA endpoints are `POST` with a JSON body; the access token is a
//! body field, not a header. [`ApiClient`] is the tap's "authenticated
//! fetcher" collaborator: it owns the connection pool, injects the
//! token, applies the rate limiter, and drives each call through the
//! retry policy. Callers receive either a decoded JSON body or a
//! classified error.

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use super::retry::{classify_response, classify_transport_error, FetchOutcome, RetryPolicy};
use crate::config::TapConfig;
use crate::error::Result;
use crate::types::JsonObject;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// HTTP client bound to one configuration's credentials
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: String,
    page_size: u32,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Build a client from validated configuration.
    pub fn new(config: &TapConfig) -> Result<Self> {
        // Parse up front so a config typo fails before any sync work.
        Url::parse(&config.base_url)?;

        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("tap-kpa/{}", env!("CARGO_PKG_VERSION")));

        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.access_token.clone(),
            page_size: config.page_size,
            limiter: RateLimiter::new(&RateLimiterConfig::per_second(
                config.requests_per_second,
            )),
            retry: RetryPolicy::with_max_attempts(config.max_retries),
        })
    }

    /// Configured page size, used as the request `limit`
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Full URL for an endpoint path
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Call an endpoint with the given body parameters.
    ///
    /// The access token is merged into the body; transient failures are
    /// retried per the policy; the decoded JSON body is returned.
    pub async fn call(&self, endpoint: &str, body: JsonObject) -> Result<Value> {
        let url = self.endpoint_url(endpoint);
        let mut payload = body;
        payload.insert("token".to_string(), Value::String(self.token.clone()));
        let payload = Value::Object(payload);

        self.retry
            .run(endpoint, || self.attempt(endpoint, &url, &payload))
            .await
    }

    /// One authenticated request, classified into a fetch outcome.
    async fn attempt(&self, endpoint: &str, url: &str, payload: &Value) -> FetchOutcome {
        self.limiter.wait().await;
        debug!(endpoint, "POST {url}");

        let response = match self.http.post(url).json(payload).send().await {
            Ok(response) => response,
            Err(e) => return classify_transport_error(endpoint, &e),
        };

        let status = response.status();
        let retry_after = parse_retry_after(&response);

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return classify_transport_error(endpoint, &e),
        };

        classify_response(endpoint, status, retry_after, &body)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

/// Extract the `Retry-After` header as a delay, when present
fn parse_retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}

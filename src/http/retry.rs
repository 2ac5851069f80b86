//! Retry policy and failure classification
//!
//! Retry decisions are made over an explicit [`FetchOutcome`] value
//! rather than by inspecting error types in control flow: every remote
//! call is classified exactly once into success, retryable failure, or
//! fatal failure, and [`RetryPolicy::run`] is a pure loop over those
//! outcomes.
//!
//! Classification rules for this API:
//! - timeouts, connection errors, HTTP 5xx, and HTTP 429 are transient
//! - HTTP 200 with `{"ok": false, "error": "rate_limit_exceeded"}` is the
//!   API's in-band rate limit signal and is also transient
//! - any other 4xx, and any other `{"ok": false}` body, is fatal
//! - a 2xx body that is not JSON is malformed, which is fatal for the
//!   call (retrying a parse failure cannot help)

use crate::error::{Error, Result};
use rand::Rng;
use reqwest::StatusCode;
use serde_json::Value;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Wait applied when the API reports its in-band rate limit signal
/// without a retry-after hint.
const RATE_LIMIT_BODY_DELAY: Duration = Duration::from_secs(120);

/// Outcome of a single remote call, classified for the retry loop
#[derive(Debug)]
pub enum FetchOutcome {
    /// The call succeeded with a decoded JSON body
    Success(Value),
    /// The call failed in a way that may succeed on retry
    Retryable {
        /// The underlying failure
        cause: Error,
        /// Source-provided delay hint, overriding computed backoff
        retry_after: Option<Duration>,
    },
    /// The call failed and retrying cannot help
    Fatal(Error),
}

/// Bounded exponential backoff with jitter
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first)
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_backoff: Duration,
    /// Upper bound for any single delay
    pub max_backoff: Duration,
    /// Upper bound for total time spent waiting across attempts
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            max_elapsed: Duration::from_secs(600),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given attempt budget
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Compute the backoff delay after a given (1-based) attempt.
    ///
    /// Exponential doubling from `initial_backoff`, with ±50% jitter,
    /// capped at `max_backoff`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        let base = self
            .initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff);

        let jitter = rand::thread_rng().gen_range(0.5..=1.5);
        base.mul_f64(jitter).min(self.max_backoff)
    }

    /// Drive a remote call to completion.
    ///
    /// Retries retryable outcomes until `max_attempts` or `max_elapsed`
    /// is exhausted; the last transient failure is then surfaced as a
    /// terminal [`Error::RetriesExhausted`]. Fatal outcomes propagate
    /// immediately.
    pub async fn run<F, Fut>(&self, endpoint: &str, mut call: F) -> Result<Value>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = FetchOutcome>,
    {
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match call().await {
                FetchOutcome::Success(value) => {
                    if attempt > 1 {
                        debug!(endpoint, attempt, "Call succeeded after retries");
                    }
                    return Ok(value);
                }
                FetchOutcome::Fatal(cause) => return Err(cause),
                FetchOutcome::Retryable { cause, retry_after } => {
                    if attempt >= self.max_attempts {
                        return Err(Error::RetriesExhausted {
                            endpoint: endpoint.to_string(),
                            attempts: attempt,
                            message: cause.to_string(),
                        });
                    }

                    let delay = retry_after.unwrap_or_else(|| self.backoff(attempt));
                    if started.elapsed() + delay > self.max_elapsed {
                        return Err(Error::RetriesExhausted {
                            endpoint: endpoint.to_string(),
                            attempts: attempt,
                            message: format!("{cause} (retry budget of {:?} spent)", self.max_elapsed),
                        });
                    }

                    let delay_ms = delay.as_millis() as u64;
                    warn!(
                        endpoint,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms,
                        "Transient failure, will retry: {cause}"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Classify an HTTP response into a fetch outcome.
///
/// `retry_after` is the parsed `Retry-After` header, when present.
pub fn classify_response(
    endpoint: &str,
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
) -> FetchOutcome {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return FetchOutcome::Retryable {
            cause: Error::transient(endpoint, format!("rate limited (429): {body}")),
            retry_after,
        };
    }

    if status.is_server_error() {
        return FetchOutcome::Retryable {
            cause: Error::transient(endpoint, format!("server error ({status}): {body}")),
            retry_after,
        };
    }

    if status.is_client_error() {
        return FetchOutcome::Fatal(Error::fatal(
            endpoint,
            Some(status.as_u16()),
            body.to_string(),
        ));
    }

    let json: Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(e) => {
            return FetchOutcome::Fatal(Error::malformed(
                endpoint,
                format!("response body is not JSON: {e}"),
            ));
        }
    };

    // The API reports some failures with HTTP 200 and an "ok" flag.
    if json.get("ok").and_then(Value::as_bool) == Some(false) {
        let api_error = json
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");

        if api_error == "rate_limit_exceeded" {
            return FetchOutcome::Retryable {
                cause: Error::transient(endpoint, "rate limit exceeded"),
                retry_after: Some(retry_after.unwrap_or(RATE_LIMIT_BODY_DELAY)),
            };
        }

        return FetchOutcome::Fatal(Error::fatal(
            endpoint,
            Some(status.as_u16()),
            format!("API error: {api_error}"),
        ));
    }

    FetchOutcome::Success(json)
}

/// Classify a transport-level failure into a fetch outcome.
///
/// Timeouts, connection failures, and interrupted body reads may
/// succeed on retry; anything else (TLS setup, request building) is
/// fatal.
pub fn classify_transport_error(endpoint: &str, error: &reqwest::Error) -> FetchOutcome {
    if error.is_timeout() || error.is_connect() || error.is_body() {
        return FetchOutcome::Retryable {
            cause: Error::transient(endpoint, error.to_string()),
            retry_after: None,
        };
    }
    FetchOutcome::Fatal(Error::fatal(endpoint, None, error.to_string()))
}

//! HTTP layer for the KPA EHS API
//!
//! Provides the authenticated API client with retry, rate limiting, and
//! backoff.
//!
//! # Features
//!
//! - **Authenticated calls**: the access token travels in the request
//!   body, as the API expects
//! - **Retry policy**: explicit transient/fatal classification with
//!   exponential backoff and jitter
//! - **Rate limiting**: token bucket rate limiter using governor

mod client;
mod rate_limit;
mod retry;

pub use client::ApiClient;
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use retry::{classify_response, classify_transport_error, FetchOutcome, RetryPolicy};

#[cfg(test)]
mod tests;

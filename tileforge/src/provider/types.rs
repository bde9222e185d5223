//! Core types for the imagery provider API.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::retry::RateLimitPolicy;

/// Provider-assigned scene identifier.
pub type SceneId = String;

/// HTTP status signalling a rate limit.
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Default catalog search endpoint.
pub const DEFAULT_SEARCH_URL: &str = "https://api.planet.com/data/v1/quick-search";

/// Default order submission endpoint.
pub const DEFAULT_ORDERS_URL: &str = "https://api.planet.com/compute/ops/orders/v2";

/// Default number of requests kept in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Connection settings shared by the search and order clients.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub api_key: Option<String>,
    pub search_url: String,
    pub orders_url: String,
    /// Maximum concurrent in-flight requests.
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub rate_limit: RateLimitPolicy,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            search_url: DEFAULT_SEARCH_URL.to_string(),
            orders_url: DEFAULT_ORDERS_URL.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            timeout_secs: super::http::DEFAULT_TIMEOUT_SECS,
            rate_limit: RateLimitPolicy::default(),
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("search_url", &self.search_url)
            .field("orders_url", &self.orders_url)
            .field("concurrency", &self.concurrency)
            .field("timeout_secs", &self.timeout_secs)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

/// Errors raised while talking to the provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure (connection, timeout, body read)
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Non-success, non-rate-limit status
    #[error("Request to {url} failed with HTTP {status}: {body}")]
    RequestFailed {
        status: u16,
        url: String,
        body: String,
    },

    /// Response body could not be interpreted
    #[error("Invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    /// A configured retry cap was reached while rate limited
    #[error("Still rate limited by {url} after {retries} retries")]
    RateLimitExhausted { url: String, retries: u32 },

    /// Request payload could not be serialized
    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A received HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Raw `Retry-After` header, when present.
    pub retry_after: Option<String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.into(),
        }
    }

    pub fn with_retry_after(mut self, value: impl Into<String>) -> Self {
        self.retry_after = Some(value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == STATUS_TOO_MANY_REQUESTS
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        serde_json::from_slice(&self.body).map_err(|e| ProviderError::InvalidResponse {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    /// Body as lossy UTF-8, shortened for error messages.
    pub fn body_snippet(&self) -> String {
        const MAX: usize = 512;
        let text = String::from_utf8_lossy(&self.body);
        match text.char_indices().nth(MAX) {
            Some((idx, _)) => format!("{}...", &text[..idx]),
            None => text.into_owned(),
        }
    }
}

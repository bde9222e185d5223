//! Rate-limit backoff for provider requests.
//!
//! A 429 response suspends only the awaiting task for the server-declared
//! `Retry-After` delay and then resubmits the identical request. Any other
//! non-success status is fatal and is never retried.
//!
//! # Example
//!
//! ```ignore
//! use tileforge::provider::{send_with_backoff, RateLimitPolicy};
//!
//! let response = send_with_backoff(&RateLimitPolicy::default(), url, || {
//!     client.post_json(url, &body)
//! })
//! .await?;
//! ```

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use super::types::{HttpResponse, ProviderError};

/// Delay used when a 429 carries no parseable `Retry-After` header.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// How many rate-limit retries a request may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateLimitPolicy {
    /// Maximum number of retries after a 429; `None` retries forever.
    pub max_retries: Option<u32>,
}

impl RateLimitPolicy {
    /// Policy that keeps retrying for as long as the server asks.
    pub fn unbounded() -> Self {
        Self { max_retries: None }
    }

    /// Policy that gives up after `max_retries` rate-limited retries.
    pub fn capped(max_retries: u32) -> Self {
        Self {
            max_retries: Some(max_retries),
        }
    }

    /// Whether another retry is allowed after `retries` have been made.
    pub fn allows(&self, retries: u32) -> bool {
        self.max_retries.map_or(true, |max| retries < max)
    }
}

/// Parses a `Retry-After` header given in whole seconds.
///
/// HTTP-date values and garbage fall back to [`DEFAULT_RETRY_AFTER_SECS`].
pub fn parse_retry_after(value: Option<&str>) -> Duration {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && (0.0..=86_400.0).contains(secs))
        .map(Duration::from_secs_f64)
        .unwrap_or(Duration::from_secs(DEFAULT_RETRY_AFTER_SECS))
}

/// Sends a request, sleeping and resubmitting while it is rate limited.
///
/// # Arguments
///
/// * `policy` - Retry cap for 429 responses
/// * `url` - Request URL, used in logs and errors
/// * `send` - Produces a fresh attempt of the identical request
///
/// # Returns
///
/// The first successful response. A non-success, non-429 status yields
/// [`ProviderError::RequestFailed`]; exceeding the retry cap yields
/// [`ProviderError::RateLimitExhausted`]. Transport errors are returned
/// as-is.
pub async fn send_with_backoff<F, Fut>(
    policy: &RateLimitPolicy,
    url: &str,
    mut send: F,
) -> Result<HttpResponse, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<HttpResponse, ProviderError>>,
{
    let mut retries: u32 = 0;
    loop {
        let response = send().await?;

        if response.is_success() {
            return Ok(response);
        }

        if response.is_rate_limited() {
            if !policy.allows(retries) {
                error!(url = url, retries = retries, "Rate limit retries exhausted");
                return Err(ProviderError::RateLimitExhausted {
                    url: url.to_string(),
                    retries,
                });
            }
            let delay = parse_retry_after(response.retry_after.as_deref());
            retries += 1;
            warn!(
                url = url,
                retry = retries,
                delay_ms = delay.as_millis() as u64,
                "Rate limited, retrying after delay"
            );
            tokio::time::sleep(delay).await;
            continue;
        }

        error!(url = url, status = response.status, "Request failed");
        return Err(ProviderError::RequestFailed {
            status: response.status,
            url: url.to_string(),
            body: response.body_snippet(),
        });
    }
}

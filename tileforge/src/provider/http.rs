//! HTTP client abstraction for testability
//!
//! The search and order clients talk to the provider through the
//! [`AsyncHttpClient`] trait so tests can script responses. Unlike a
//! typical client, non-success statuses are returned as responses rather
//! than errors: the callers decide what a 429 or a 400 means.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use tracing::{debug, trace, warn};

use super::types::{HttpResponse, ProviderError};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Async HTTP operations used by the provider clients.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an HTTP GET request.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to request
    ///
    /// # Returns
    ///
    /// The response (any status) or a transport error.
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, ProviderError>> + Send;

    /// Performs an HTTP POST request with a JSON body.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to request
    /// * `body` - Request payload
    ///
    /// # Returns
    ///
    /// The response (any status) or a transport error.
    fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> impl Future<Output = Result<HttpResponse, ProviderError>> + Send;
}

/// Async HTTP client implementation using reqwest.
///
/// Authenticates with HTTP basic auth, the API key as user name and an
/// empty password.
#[derive(Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl std::fmt::Debug for AsyncReqwestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncReqwestClient")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AsyncReqwestClient {
    /// Creates a client with the default timeout.
    pub fn new(api_key: Option<String>) -> Result<Self, ProviderError> {
        Self::with_timeout(api_key, DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a client with a custom timeout.
    pub fn with_timeout(api_key: Option<String>, timeout_secs: u64) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                ProviderError::HttpError(format!("Failed to create async HTTP client: {}", e))
            })?;

        Ok(Self { client, api_key })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.basic_auth(key, Some("")),
            None => request,
        }
    }

    async fn execute(
        &self,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<HttpResponse, ProviderError> {
        let response = match self.authorize(request).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(
                    url = url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(ProviderError::HttpError(format!("Request failed: {}", e)));
            }
        };

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        debug!(url = url, status = status, "HTTP response received");

        let body = response
            .bytes()
            .await
            .map_err(|e| ProviderError::HttpError(format!("Failed to read response: {}", e)))?;
        trace!(url = url, bytes = body.len(), "HTTP response body read");

        Ok(HttpResponse {
            status,
            retry_after,
            body,
        })
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, ProviderError> {
        trace!(url = url, "HTTP GET request starting");
        self.execute(url, self.client.get(url)).await
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<HttpResponse, ProviderError> {
        trace!(url = url, "HTTP POST request starting");
        let payload = serde_json::to_vec(body)?;
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload);
        self.execute(url, request).await
    }
}

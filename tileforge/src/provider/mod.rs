//! Imagery provider API clients
//!
//! Search the provider catalog for scenes and submit fulfillment orders.
//! Both clients share one contract for rate limiting: a 429 suspends the
//! awaiting task for the `Retry-After` delay and resubmits the identical
//! request; every other failure status is fatal.
//!
//! ```ignore
//! use tileforge::provider::{
//!     AsyncReqwestClient, PaginatedSearchClient, RateLimitPolicy, SearchConfig,
//!     SearchRequestBuilder,
//! };
//!
//! let http = AsyncReqwestClient::new(api_key)?;
//! let search = PaginatedSearchClient::new(&http, DEFAULT_SEARCH_URL, RateLimitPolicy::default());
//! for request in SearchRequestBuilder::new(SearchConfig::default()).build(&features, &interval) {
//!     let scene_ids = search.search(&request).await?;
//! }
//! ```

mod http;
mod order;
mod retry;
mod search;
mod types;

pub use http::{AsyncHttpClient, AsyncReqwestClient, DEFAULT_TIMEOUT_SECS};
pub use order::{
    CloudStorageTarget, Delivery, DeliveryMode, Notifications, OrderConfig, OrderProduct,
    OrderRequest, OrderRequestBuilder, OrderSubmissionClient, PreparedOrder, SubmittedOrder,
    DEFAULT_ARCHIVE_FILENAME, DEFAULT_MAX_ORDER_SIZE, DEFAULT_PATH_PREFIX, DEFAULT_PRODUCT_BUNDLE,
};
pub use retry::{parse_retry_after, send_with_backoff, RateLimitPolicy, DEFAULT_RETRY_AFTER_SECS};
pub use search::{
    DateRangeConfig, Filter, PaginatedSearchClient, RangeConfig, SearchConfig, SearchRequest,
    SearchRequestBuilder, DEFAULT_ASSET_NAMES, DEFAULT_ITEM_TYPES, DOWNLOAD_PERMISSION,
};
pub use types::{
    ApiConfig, HttpResponse, ProviderError, SceneId, DEFAULT_CONCURRENCY, DEFAULT_ORDERS_URL,
    DEFAULT_SEARCH_URL, STATUS_TOO_MANY_REQUESTS,
};

#[cfg(test)]
pub use http::tests::{RecordedRequest, ScriptedHttpClient};

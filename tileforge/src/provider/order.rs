//! Order payload building and submission.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

use super::http::AsyncHttpClient;
use super::retry::{send_with_backoff, RateLimitPolicy};
use crate::geometry::FeatureSet;
use crate::manifest::OrderManifestEntry;

/// Default maximum number of scenes per order.
pub const DEFAULT_MAX_ORDER_SIZE: usize = 500;

/// Default delivery path prefix inside the bucket.
pub const DEFAULT_PATH_PREFIX: &str = "assets";

/// Default archive name for single-archive delivery.
pub const DEFAULT_ARCHIVE_FILENAME: &str = "zipped";

/// Default product bundle.
pub const DEFAULT_PRODUCT_BUNDLE: &str = "analytic_sr";

const REDACTED: &str = "<redacted>";

/// How the provider packages delivered files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Every item in one named archive.
    SingleArchive { archive_filename: String },
    /// One set of files per item.
    PerItem,
}

impl Default for DeliveryMode {
    fn default() -> Self {
        DeliveryMode::PerItem
    }
}

/// Order settings.
#[derive(Clone, PartialEq)]
pub struct OrderConfig {
    /// Destination bucket for deliveries.
    pub bucket: String,
    /// Object-store credentials string handed to the provider.
    pub credentials: String,
    pub path_prefix: String,
    pub delivery: DeliveryMode,
    pub item_type: String,
    pub product_bundle: String,
    pub email_on_completion: bool,
    pub subscription_id: u64,
    /// Maximum scenes per order.
    pub max_order_size: usize,
    /// Build payloads without submitting them.
    pub dry_run: bool,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            credentials: String::new(),
            path_prefix: DEFAULT_PATH_PREFIX.to_string(),
            delivery: DeliveryMode::default(),
            item_type: super::search::DEFAULT_ITEM_TYPES[0].to_string(),
            product_bundle: DEFAULT_PRODUCT_BUNDLE.to_string(),
            email_on_completion: false,
            subscription_id: 0,
            max_order_size: DEFAULT_MAX_ORDER_SIZE,
            dry_run: false,
        }
    }
}

impl std::fmt::Debug for OrderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderConfig")
            .field("bucket", &self.bucket)
            .field("credentials", &REDACTED)
            .field("path_prefix", &self.path_prefix)
            .field("delivery", &self.delivery)
            .field("item_type", &self.item_type)
            .field("product_bundle", &self.product_bundle)
            .field("email_on_completion", &self.email_on_completion)
            .field("subscription_id", &self.subscription_id)
            .field("max_order_size", &self.max_order_size)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderProduct {
    pub item_ids: Vec<String>,
    pub item_type: String,
    pub product_bundle: String,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudStorageTarget {
    pub bucket: String,
    pub credentials: String,
    pub path_prefix: String,
}

impl std::fmt::Debug for CloudStorageTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudStorageTarget")
            .field("bucket", &self.bucket)
            .field("credentials", &REDACTED)
            .field("path_prefix", &self.path_prefix)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub single_archive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_filename: Option<String>,
    pub google_cloud_storage: CloudStorageTarget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notifications {
    pub email: bool,
}

/// Body of one order submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub name: String,
    pub subscription_id: u64,
    pub products: Vec<OrderProduct>,
    pub delivery: Delivery,
    pub notifications: Notifications,
    pub order_type: String,
}

impl OrderRequest {
    /// Copy of the payload that is safe to persist or log.
    pub fn redacted(&self) -> Self {
        let mut request = self.clone();
        request.delivery.google_cloud_storage.credentials = REDACTED.to_string();
        request
    }
}

/// An order ready to submit, carrying its target collection along.
#[derive(Debug, Clone)]
pub struct PreparedOrder {
    pub order_uid: String,
    pub geojson: FeatureSet,
    pub request: OrderRequest,
}

/// A submitted order with the provider's reply.
#[derive(Debug, Clone)]
pub struct SubmittedOrder {
    pub order_uid: String,
    pub geojson: FeatureSet,
    pub response: Value,
}

/// Turns manifest entries into order payloads.
#[derive(Debug, Clone)]
pub struct OrderRequestBuilder {
    config: OrderConfig,
}

impl OrderRequestBuilder {
    pub fn new(config: OrderConfig) -> Self {
        Self { config }
    }

    /// Delivery block for the configured mode. Only this part of the
    /// payload depends on the mode.
    fn delivery(&self) -> Delivery {
        let (single_archive, archive_filename) = match &self.config.delivery {
            DeliveryMode::SingleArchive { archive_filename } => {
                (true, Some(archive_filename.clone()))
            }
            DeliveryMode::PerItem => (false, None),
        };
        Delivery {
            single_archive,
            archive_filename,
            google_cloud_storage: CloudStorageTarget {
                bucket: self.config.bucket.clone(),
                credentials: self.config.credentials.clone(),
                path_prefix: self.config.path_prefix.clone(),
            },
        }
    }

    /// Builds the payload for one batch of scenes. The order is named
    /// after its uid.
    pub fn build_request(&self, order_uid: &str, scene_ids: &[String]) -> OrderRequest {
        OrderRequest {
            name: order_uid.to_string(),
            subscription_id: self.config.subscription_id,
            products: vec![OrderProduct {
                item_ids: scene_ids.to_vec(),
                item_type: self.config.item_type.clone(),
                product_bundle: self.config.product_bundle.clone(),
            }],
            delivery: self.delivery(),
            notifications: Notifications {
                email: self.config.email_on_completion,
            },
            order_type: "full".to_string(),
        }
    }

    /// Prepares a manifest entry for submission.
    pub fn prepare(&self, order_uid: String, entry: OrderManifestEntry) -> PreparedOrder {
        let request = self.build_request(&order_uid, &entry.asset_ids);
        PreparedOrder {
            order_uid,
            geojson: entry.geojson,
            request,
        }
    }
}

/// Submits orders with rate-limit backoff.
pub struct OrderSubmissionClient<'a, C: AsyncHttpClient> {
    client: &'a C,
    url: String,
    policy: RateLimitPolicy,
}

impl<'a, C: AsyncHttpClient> OrderSubmissionClient<'a, C> {
    pub fn new(client: &'a C, url: impl Into<String>, policy: RateLimitPolicy) -> Self {
        Self {
            client,
            url: url.into(),
            policy,
        }
    }

    /// Submits one order and returns the provider's JSON reply.
    pub async fn submit(&self, order: PreparedOrder) -> Result<SubmittedOrder, super::ProviderError> {
        let body = serde_json::to_value(&order.request)?;
        let url = self.url.as_str();
        debug!(
            order_uid = %order.order_uid,
            scenes = order.request.products.iter().map(|p| p.item_ids.len()).sum::<usize>(),
            "Submitting order"
        );

        let result = send_with_backoff(&self.policy, url, || self.client.post_json(url, &body))
            .await
            .and_then(|response| response.json::<Value>(url));

        match result {
            Ok(response) => {
                info!(order_uid = %order.order_uid, "Order submitted");
                Ok(SubmittedOrder {
                    order_uid: order.order_uid,
                    geojson: order.geojson,
                    response,
                })
            }
            Err(e) => {
                error!(order_uid = %order.order_uid, error = %e, "Order submission failed");
                Err(e)
            }
        }
    }
}

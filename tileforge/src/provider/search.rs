//! Catalog search: request building and paginated execution.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::http::AsyncHttpClient;
use super::retry::{send_with_backoff, RateLimitPolicy};
use super::types::{ProviderError, SceneId};
use crate::geometry::{FeatureSet, Geometry};
use crate::targets::Interval;

/// Permission every returned scene must grant.
pub const DOWNLOAD_PERMISSION: &str = "assets.analytic:download";

/// Default item types searched.
pub const DEFAULT_ITEM_TYPES: [&str; 1] = ["PSScene4Band"];

/// Default assets every scene must carry.
pub const DEFAULT_ASSET_NAMES: [&str; 2] = ["analytic_sr", "udm"];

/// Search filter settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub item_types: Vec<String>,
    pub asset_names: Vec<String>,
    /// Maximum cloud cover fraction (0.0 - 1.0).
    pub max_cloud_cover: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            item_types: DEFAULT_ITEM_TYPES.iter().map(|s| s.to_string()).collect(),
            asset_names: DEFAULT_ASSET_NAMES.iter().map(|s| s.to_string()).collect(),
            max_cloud_cover: 1.0,
        }
    }
}

/// Numeric range bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<f64>,
}

/// Timestamp range bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRangeConfig {
    pub gte: String,
    pub lte: String,
}

/// Provider search filter tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Filter {
    AndFilter {
        config: Vec<Filter>,
    },
    RangeFilter {
        field_name: String,
        config: RangeConfig,
    },
    PermissionFilter {
        config: Vec<String>,
    },
    AssetFilter {
        config: Vec<String>,
    },
    GeometryFilter {
        field_name: String,
        config: Geometry,
    },
    DateRangeFilter {
        field_name: String,
        config: DateRangeConfig,
    },
}

/// Body of one search call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub item_types: Vec<String>,
    pub filter: Filter,
}

/// Builds one search request per feature geometry.
#[derive(Debug, Clone)]
pub struct SearchRequestBuilder {
    config: SearchConfig,
}

impl SearchRequestBuilder {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    /// Filters shared by every request: cloud cover, permission, assets.
    fn base_filters(&self) -> Vec<Filter> {
        let assets = self
            .config
            .asset_names
            .iter()
            .map(|name| Filter::AssetFilter {
                config: vec![name.clone()],
            })
            .collect();

        vec![
            Filter::RangeFilter {
                field_name: "cloud_cover".to_string(),
                config: RangeConfig {
                    gte: None,
                    lte: Some(self.config.max_cloud_cover),
                },
            },
            Filter::PermissionFilter {
                config: vec![DOWNLOAD_PERMISSION.to_string()],
            },
            Filter::AndFilter { config: assets },
        ]
    }

    /// Builds the request for a single geometry.
    pub fn build_one(&self, geometry: &Geometry, interval: &Interval) -> SearchRequest {
        let mut filters = self.base_filters();
        filters.push(Filter::GeometryFilter {
            field_name: "geometry".to_string(),
            config: geometry.clone(),
        });
        filters.push(Filter::DateRangeFilter {
            field_name: "acquired".to_string(),
            config: DateRangeConfig {
                gte: interval.start_timestamp(),
                lte: interval.end_timestamp(),
            },
        });

        SearchRequest {
            item_types: self.config.item_types.clone(),
            filter: Filter::AndFilter { config: filters },
        }
    }

    /// Builds one request per feature, skipping features without geometry.
    pub fn build(&self, features: &FeatureSet, interval: &Interval) -> Vec<SearchRequest> {
        features
            .features
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .map(|g| self.build_one(g, interval))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    features: Vec<PageItem>,
    #[serde(default, rename = "_links")]
    links: PageLinks,
}

#[derive(Debug, Deserialize)]
struct PageItem {
    id: SceneId,
}

#[derive(Debug, Default, Deserialize)]
struct PageLinks {
    #[serde(default, rename = "_next")]
    next: Option<String>,
}

/// Executes searches and follows `_links._next` until exhausted.
pub struct PaginatedSearchClient<'a, C: AsyncHttpClient> {
    client: &'a C,
    url: String,
    policy: RateLimitPolicy,
}

impl<'a, C: AsyncHttpClient> PaginatedSearchClient<'a, C> {
    pub fn new(client: &'a C, url: impl Into<String>, policy: RateLimitPolicy) -> Self {
        Self {
            client,
            url: url.into(),
            policy,
        }
    }

    /// Runs one search and returns every scene id across all pages, in
    /// page order.
    ///
    /// The first page is fetched with rate-limit backoff and any other
    /// failure is returned. A failed follow-up page ends pagination and
    /// keeps the ids gathered so far.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SceneId>, ProviderError> {
        let body = serde_json::to_value(request)?;
        let url = self.url.as_str();

        let response =
            send_with_backoff(&self.policy, url, || self.client.post_json(url, &body)).await?;
        let page: SearchPage = response.json(url)?;

        let mut ids: Vec<SceneId> = page.features.into_iter().map(|item| item.id).collect();
        let mut next = page.links.next;
        let mut pages = 1usize;

        while let Some(next_url) = next.take() {
            match self.fetch_page(&next_url).await {
                Ok(page) => {
                    pages += 1;
                    ids.extend(page.features.into_iter().map(|item| item.id));
                    next = page.links.next;
                }
                Err(e) => {
                    warn!(url = %next_url, error = %e, collected = ids.len(), "Pagination stopped early");
                    break;
                }
            }
        }

        debug!(pages = pages, scenes = ids.len(), "Search complete");
        if ids.is_empty() {
            info!("Search matched no scenes");
        }
        Ok(ids)
    }

    async fn fetch_page(&self, url: &str) -> Result<SearchPage, ProviderError> {
        let response = self.client.get(url).await?;
        if !response.is_success() {
            return Err(ProviderError::RequestFailed {
                status: response.status,
                url: url.to_string(),
                body: response.body_snippet(),
            });
        }
        response.json(url)
    }
}

//! Dataset build phases
//!
//! Pipeline A runs in two invocations, each checkpointed by a manifest:
//!
//! - [`run_search_phase`]: targets → searches → batched orders →
//!   `order_manifest.json`
//! - [`run_order_phase`]: `order_manifest.json` → submissions →
//!   `order_responses.json`
//!
//! Pipeline B, [`run_sample_phase`], runs once delivery completes:
//! `order_manifest.json` + delivered rasters → tile samples →
//! `tiles_manifest.json`.
//!
//! Network phases keep a bounded number of requests in flight. A fatal
//! error on one request does not cancel the others; it is reported after
//! every in-flight request has finished.

mod order;
mod partition;
mod samples;
mod search;

pub use order::{run_order_phase, OrderPhaseOutput};
pub use partition::OrderPartitioner;
pub use samples::{run_sample_phase, SamplePhaseOutput};
pub use search::{run_search_phase, SearchPhaseOutput};

use rand::distr::Alphanumeric;
use rand::Rng;
use thiserror::Error;

use crate::coord::CoordError;
use crate::geometry::GeometryError;
use crate::manifest::ManifestError;
use crate::provider::{ApiConfig, ProviderError};
use crate::samples::SampleError;
use crate::storage::{BlobStore, StorageError};
use crate::targets::TargetError;

/// Length of generated order uids.
pub const ORDER_UID_LEN: usize = 12;

/// Errors that stop a phase.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Target(#[from] TargetError),

    #[error("Search for {target} failed: {source}")]
    Search {
        target: String,
        #[source]
        source: ProviderError,
    },

    #[error("Order {order_uid} failed: {source}")]
    Order {
        order_uid: String,
        #[source]
        source: ProviderError,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Sample(#[from] SampleError),

    #[error("Invalid geometry in order {order_uid}: {source}")]
    Geometry {
        order_uid: String,
        #[source]
        source: GeometryError,
    },

    #[error(transparent)]
    Coord(#[from] CoordError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// What the network phases need: where to write and how to reach the
/// provider.
pub struct PipelineContext<'a, S: BlobStore + ?Sized, C> {
    pub store: &'a S,
    pub client: &'a C,
    pub api: &'a ApiConfig,
    /// Directory receiving manifests.
    pub save_dir: String,
}

impl<'a, S: BlobStore + ?Sized, C> PipelineContext<'a, S, C> {
    pub fn new(store: &'a S, client: &'a C, api: &'a ApiConfig, save_dir: impl Into<String>) -> Self {
        Self {
            store,
            client,
            api,
            save_dir: save_dir.into(),
        }
    }

    fn concurrency(&self) -> usize {
        self.api.concurrency.max(1)
    }
}

/// Random lowercase alphanumeric token naming one order.
pub fn generate_order_uid() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ORDER_UID_LEN)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect()
}

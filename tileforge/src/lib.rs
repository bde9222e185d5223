//! TileForge - Satellite imagery datasets for machine learning
//!
//! This library builds tiled training datasets from a commercial imagery
//! catalog in two pipelines:
//!
//! - **Acquisition**: target collections are searched against the catalog,
//!   the resulting scenes are batched into orders and the orders are
//!   submitted, each step checkpointed in a JSON manifest.
//! - **Sample preparation**: delivered scenes are cut into Web Mercator
//!   tiles, the target geometry is rasterized into a label mask, and the
//!   mask is combined with the scene's quality layer.
//!
//! # High-Level API
//!
//! The [`pipeline`] module runs each phase end to end:
//!
//! ```ignore
//! use tileforge::pipeline::{run_search_phase, PipelineContext};
//! use tileforge::provider::AsyncReqwestClient;
//! use tileforge::storage::LocalStore;
//!
//! let store = LocalStore::new();
//! let client = AsyncReqwestClient::new(config.api.api_key.clone())?;
//! let ctx = PipelineContext::new(&store, &client, &config.api, "datasets/run/data");
//! let output = run_search_phase(&ctx, "targets", config.interval, config.search, 500).await?;
//! ```

pub mod config;
pub mod coord;
pub mod geometry;
pub mod logging;
pub mod manifest;
pub mod pipeline;
pub mod provider;
pub mod raster;
pub mod samples;
pub mod storage;
pub mod targets;

/// Version of the TileForge library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

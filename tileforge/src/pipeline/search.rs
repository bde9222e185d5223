//! Search phase: targets → order manifest.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

use super::{generate_order_uid, OrderPartitioner, PipelineContext, PipelineError};
use crate::geometry::FeatureSet;
use crate::manifest::{write_manifest, OrderManifest, ORDER_MANIFEST_FILE};
use crate::provider::{AsyncHttpClient, PaginatedSearchClient, SceneId, SearchConfig, SearchRequest, SearchRequestBuilder};
use crate::storage::BlobStore;
use crate::targets::{FeatureSource, IntervalResolver};

/// Summary of a finished search phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPhaseOutput {
    pub manifest_path: String,
    pub orders: usize,
    pub scenes: usize,
}

struct SearchJob {
    target: String,
    geojson: Arc<FeatureSet>,
    request: SearchRequest,
}

/// Searches every target under `targets_dir` and writes the order manifest.
///
/// Each feature with a geometry becomes one search; its scene ids are split
/// into batches of at most `max_order_size`, and each batch gets a fresh
/// order uid. Results are keyed by uid, so arrival order does not matter.
pub async fn run_search_phase<S, C>(
    ctx: &PipelineContext<'_, S, C>,
    targets_dir: &str,
    resolver: IntervalResolver,
    search: SearchConfig,
    max_order_size: usize,
) -> Result<SearchPhaseOutput, PipelineError>
where
    S: BlobStore + ?Sized,
    C: AsyncHttpClient,
{
    let partitioner = OrderPartitioner::new(max_order_size)?;
    let source = FeatureSource::new(ctx.store, targets_dir, resolver);
    let builder = SearchRequestBuilder::new(search);
    let client = PaginatedSearchClient::new(ctx.client, ctx.api.search_url.clone(), ctx.api.rate_limit);

    let jobs = source.targets()?.flat_map(|target| -> Vec<Result<SearchJob, PipelineError>> {
        match target {
            Ok(target) => {
                let requests = builder.build(&target.features, &target.interval);
                if requests.is_empty() {
                    warn!(target = %target.path, "Target has no geometries to search");
                }
                let geojson = Arc::new(target.features);
                requests
                    .into_iter()
                    .map(|request| {
                        Ok(SearchJob {
                            target: target.path.clone(),
                            geojson: Arc::clone(&geojson),
                            request,
                        })
                    })
                    .collect()
            }
            Err(e) => vec![Err(e.into())],
        }
    });

    let results: Vec<Result<(Arc<FeatureSet>, Vec<SceneId>), PipelineError>> = stream::iter(jobs)
        .map(|job| {
            let client = &client;
            async move {
                let job = job?;
                match client.search(&job.request).await {
                    Ok(ids) => {
                        info!(target = %job.target, scenes = ids.len(), "Search finished");
                        Ok((job.geojson, ids))
                    }
                    Err(source) => {
                        error!(target = %job.target, error = %source, "Search failed");
                        Err(PipelineError::Search {
                            target: job.target,
                            source,
                        })
                    }
                }
            }
        })
        .buffer_unordered(ctx.concurrency())
        .collect()
        .await;

    let mut manifest = OrderManifest::new();
    let mut scenes = 0usize;
    for result in results {
        let (geojson, ids) = result?;
        scenes += ids.len();
        for entry in partitioner.partition(&geojson, &ids) {
            let uid = loop {
                let uid = generate_order_uid();
                if !manifest.contains_key(&uid) {
                    break uid;
                }
            };
            manifest.insert(uid, entry);
        }
    }

    let manifest_path = ctx.store.join(&[&ctx.save_dir, ORDER_MANIFEST_FILE]);
    write_manifest(ctx.store, &manifest_path, &manifest)?;
    info!(
        path = %manifest_path,
        orders = manifest.len(),
        scenes = scenes,
        "Search phase complete"
    );

    Ok(SearchPhaseOutput {
        manifest_path,
        orders: manifest.len(),
        scenes,
    })
}

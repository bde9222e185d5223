//! Order phase: order manifest → response manifest.

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use super::{PipelineContext, PipelineError};
use crate::manifest::{
    read_manifest, write_manifest, ManifestReader, OrderManifestEntry, ResponseManifest,
    ResponseManifestEntry, DRY_RUN_MANIFEST_FILE, RESPONSE_MANIFEST_FILE,
};
use crate::provider::{AsyncHttpClient, OrderConfig, OrderRequestBuilder, OrderSubmissionClient};
use crate::storage::BlobStore;

/// Summary of a finished order phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPhaseOutput {
    pub manifest_path: String,
    /// Orders sent to the provider (or built, in dry-run mode).
    pub submitted: usize,
    /// Orders already present in the resumed response manifest.
    pub skipped: usize,
}

enum Outcome {
    Submitted(String, ResponseManifestEntry),
    Skipped,
}

/// Submits every order in the manifest at `order_manifest_path` and writes
/// the response manifest.
///
/// With `resume`, orders whose uid already appears in that response
/// manifest are not submitted again; their recorded responses are carried
/// over. Dry-run entries in it do not count as submitted.
///
/// In dry-run mode each payload, with credentials redacted, is recorded as
/// its own response in `order_dry_run.json` instead of the response
/// manifest.
///
/// If any submission fails, the responses that did succeed are still
/// written before the first error is returned, so a resumed run picks up
/// where this one stopped.
pub async fn run_order_phase<S, C>(
    ctx: &PipelineContext<'_, S, C>,
    order_manifest_path: &str,
    order: OrderConfig,
    resume: Option<&str>,
) -> Result<OrderPhaseOutput, PipelineError>
where
    S: BlobStore + ?Sized,
    C: AsyncHttpClient,
{
    let mut previous: ResponseManifest = match resume {
        Some(path) => read_manifest(ctx.store, path)?,
        None => ResponseManifest::new(),
    };
    previous.retain(|_, entry| !entry.dry_run);
    let entries = ManifestReader::<OrderManifestEntry>::open(ctx.store, order_manifest_path)?;

    let dry_run = order.dry_run;
    let builder = OrderRequestBuilder::new(order);
    let submitter =
        OrderSubmissionClient::new(ctx.client, ctx.api.orders_url.clone(), ctx.api.rate_limit);
    if dry_run {
        info!("Dry run: orders are built but not submitted");
    }

    let outcomes: Vec<Result<Outcome, PipelineError>> = stream::iter(entries)
        .map(|entry| {
            let (builder, submitter, previous) = (&builder, &submitter, &previous);
            async move {
                let (order_uid, entry) = entry?;
                if previous.contains_key(&order_uid) {
                    info!(order_uid = %order_uid, "Order already submitted, skipping");
                    return Ok(Outcome::Skipped);
                }

                let prepared = builder.prepare(order_uid, entry);
                if dry_run {
                    let response = serde_json::to_value(prepared.request.redacted())
                        .map_err(crate::provider::ProviderError::from)?;
                    return Ok(Outcome::Submitted(
                        prepared.order_uid,
                        ResponseManifestEntry {
                            geojson: prepared.geojson,
                            response,
                            dry_run: true,
                        },
                    ));
                }

                let order_uid = prepared.order_uid.clone();
                let submitted = submitter
                    .submit(prepared)
                    .await
                    .map_err(|source| PipelineError::Order { order_uid, source })?;
                Ok(Outcome::Submitted(
                    submitted.order_uid,
                    ResponseManifestEntry::submitted(submitted.geojson, submitted.response),
                ))
            }
        })
        .buffer_unordered(ctx.concurrency())
        .collect()
        .await;

    let mut responses = previous;
    let mut submitted = 0usize;
    let mut skipped = 0usize;
    let mut first_error = None;
    for outcome in outcomes {
        match outcome {
            Ok(Outcome::Submitted(uid, entry)) => {
                submitted += 1;
                responses.insert(uid, entry);
            }
            Ok(Outcome::Skipped) => skipped += 1,
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    warn!(error = %e, "Additional order failure");
                }
            }
        }
    }

    let file = if dry_run {
        DRY_RUN_MANIFEST_FILE
    } else {
        RESPONSE_MANIFEST_FILE
    };
    let manifest_path = ctx.store.join(&[&ctx.save_dir, file]);
    write_manifest(ctx.store, &manifest_path, &responses)?;

    if let Some(e) = first_error {
        return Err(e);
    }

    info!(
        path = %manifest_path,
        submitted = submitted,
        skipped = skipped,
        "Order phase complete"
    );
    Ok(OrderPhaseOutput {
        manifest_path,
        submitted,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Feature, FeatureSet, Geometry};
    use crate::manifest::OrderManifest;
    use crate::provider::{ApiConfig, HttpResponse, RecordedRequest, ScriptedHttpClient};
    use crate::storage::MemoryStore;
    use serde_json::Value;

    fn order_manifest(store: &MemoryStore, uids: &[&str]) -> String {
        let mut manifest = OrderManifest::new();
        for uid in uids {
            manifest.insert(
                uid.to_string(),
                OrderManifestEntry {
                    geojson: FeatureSet::new(vec![Feature::new(Geometry::Point {
                        coordinates: vec![0.0, 0.0],
                    })]),
                    asset_ids: vec![format!("{uid}_scene")],
                },
            );
        }
        write_manifest(store, "data/order_manifest.json", &manifest).unwrap();
        "data/order_manifest.json".to_string()
    }

    fn ok(id: &str) -> Result<HttpResponse, crate::provider::ProviderError> {
        Ok(HttpResponse::new(202, format!(r#"{{"id":"{id}"}}"#)))
    }

    #[tokio::test]
    async fn test_submits_every_order() {
        let store = MemoryStore::new();
        let path = order_manifest(&store, &["u1", "u2"]);
        let client = ScriptedHttpClient::new(vec![ok("o1"), ok("o2")]);
        let api = ApiConfig::default();
        let ctx = PipelineContext::new(&store, &client, &api, "data");

        let output = run_order_phase(&ctx, &path, OrderConfig::default(), None)
            .await
            .unwrap();

        assert_eq!(output.submitted, 2);
        assert_eq!(output.skipped, 0);
        let responses: ResponseManifest = read_manifest(&store, &output.manifest_path).unwrap();
        assert_eq!(responses.len(), 2);
        let mut ids: Vec<_> = responses.values().map(|r| r.response["id"].clone()).collect();
        ids.sort_by_key(|v| v.to_string());
        assert_eq!(ids, vec![Value::from("o1"), Value::from("o2")]);
    }

    #[tokio::test]
    async fn test_dry_run_records_redacted_payload() {
        let store = MemoryStore::new();
        let path = order_manifest(&store, &["u1"]);
        let client = ScriptedHttpClient::default();
        let api = ApiConfig::default();
        let ctx = PipelineContext::new(&store, &client, &api, "data");
        let config = OrderConfig {
            credentials: "gcs-service-account-key".to_string(),
            dry_run: true,
            ..Default::default()
        };

        let output = run_order_phase(&ctx, &path, config, None).await.unwrap();

        assert!(client.requests().is_empty());
        assert_eq!(output.manifest_path, "data/order_dry_run.json");
        assert!(store.get_bytes("data/order_responses.json").is_err());

        let raw = store.get_bytes(&output.manifest_path).unwrap();
        assert!(!String::from_utf8_lossy(&raw).contains("gcs-service-account-key"));

        let responses: ResponseManifest = read_manifest(&store, &output.manifest_path).unwrap();
        let entry = &responses["u1"];
        assert!(entry.dry_run);
        assert_eq!(entry.response["name"], "u1");
        assert_eq!(entry.response["products"][0]["item_ids"][0], "u1_scene");
        assert_eq!(
            entry.response["delivery"]["google_cloud_storage"]["credentials"],
            "<redacted>"
        );
    }

    #[tokio::test]
    async fn test_resume_from_dry_run_still_submits() {
        let store = MemoryStore::new();
        let path = order_manifest(&store, &["u1"]);
        let api = ApiConfig::default();

        let dry_client = ScriptedHttpClient::default();
        let ctx = PipelineContext::new(&store, &dry_client, &api, "dry");
        let config = OrderConfig {
            dry_run: true,
            ..Default::default()
        };
        let dry = run_order_phase(&ctx, &path, config, None).await.unwrap();

        let client = ScriptedHttpClient::new(vec![ok("o1")]);
        let ctx = PipelineContext::new(&store, &client, &api, "data");
        let output = run_order_phase(&ctx, &path, OrderConfig::default(), Some(&dry.manifest_path))
            .await
            .unwrap();

        assert_eq!((output.submitted, output.skipped), (1, 0));
        assert_eq!(client.requests().len(), 1);
        let responses: ResponseManifest = read_manifest(&store, &output.manifest_path).unwrap();
        assert_eq!(responses["u1"].response["id"], "o1");
        assert!(!responses["u1"].dry_run);
    }

    #[tokio::test]
    async fn test_resume_skips_recorded_orders() {
        let store = MemoryStore::new();
        let path = order_manifest(&store, &["u1", "u2"]);
        let api = ApiConfig::default();

        let mut previous = ResponseManifest::new();
        previous.insert(
            "u1".to_string(),
            ResponseManifestEntry::submitted(
                FeatureSet::new(vec![]),
                serde_json::json!({"id": "earlier"}),
            ),
        );
        write_manifest(&store, "old/order_responses.json", &previous).unwrap();

        let client = ScriptedHttpClient::new(vec![ok("o2")]);
        let ctx = PipelineContext::new(&store, &client, &api, "data");
        let output = run_order_phase(
            &ctx,
            &path,
            OrderConfig::default(),
            Some("old/order_responses.json"),
        )
        .await
        .unwrap();

        assert_eq!(output.submitted, 1);
        assert_eq!(output.skipped, 1);
        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert!(matches!(&requests[0], RecordedRequest::Post(_, body) if body["name"] == "u2"));

        let responses: ResponseManifest = read_manifest(&store, &output.manifest_path).unwrap();
        assert_eq!(responses["u1"].response["id"], "earlier");
        assert_eq!(responses["u2"].response["id"], "o2");
    }

    #[tokio::test]
    async fn test_failure_keeps_successful_responses() {
        let store = MemoryStore::new();
        let path = order_manifest(&store, &["u1"]);
        let client = ScriptedHttpClient::new(vec![Ok(HttpResponse::new(400, "invalid"))]);
        let api = ApiConfig::default();
        let ctx = PipelineContext::new(&store, &client, &api, "data");

        let err = run_order_phase(&ctx, &path, OrderConfig::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Order { ref order_uid, .. } if order_uid == "u1"));

        let responses: ResponseManifest =
            read_manifest(&store, "data/order_responses.json").unwrap();
        assert!(responses.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_order_manifest_is_fatal() {
        let store = MemoryStore::new();
        store.put_string("data/order_manifest.json", "not json").unwrap();
        let client = ScriptedHttpClient::default();
        let api = ApiConfig::default();
        let ctx = PipelineContext::new(&store, &client, &api, "data");

        let err = run_order_phase(&ctx, "data/order_manifest.json", OrderConfig::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Manifest(crate::manifest::ManifestError::Decode { .. })
        ));
    }
}

//! Integration tests for the dataset pipelines.
//!
//! These tests drive the three phases end to end against an in-memory
//! store and a fake provider:
//! - targets → paginated search (with a rate-limited first attempt) →
//!   order manifest
//! - order manifest → submissions → response manifest, then a resumed run
//! - order manifest + delivered rasters → tile samples → tile manifest
//!
//! Run with: `cargo test --test dataset_pipeline`

use std::collections::BTreeMap;

use ndarray::Array3;
use parking_lot::Mutex;
use serde_json::{json, Value};

use tileforge::coord::{tile_bounds, tile_xy_bounds, TileCoord};
use tileforge::manifest::{read_manifest, OrderManifestEntry, ResponseManifestEntry, TileManifest};
use tileforge::pipeline::{
    run_order_phase, run_sample_phase, run_search_phase, PipelineContext, PipelineError,
};
use tileforge::provider::{
    ApiConfig, AsyncHttpClient, HttpResponse, OrderConfig, ProviderError, SearchConfig,
};
use tileforge::raster::{geotiff, GeoTransform, PixelSize, PixelType, Raster};
use tileforge::samples::SampleConfig;
use tileforge::storage::{BlobStore, MemoryStore};
use tileforge::targets::IntervalResolver;

// ============================================================================
// Fake provider
// ============================================================================

const SEARCH_URL: &str = "https://catalog.test/search";
const PAGE_2_URL: &str = "https://catalog.test/search/page2";
const ORDERS_URL: &str = "https://catalog.test/orders";

/// Routes requests by URL: a rate-limited then paginated search, and an
/// order endpoint echoing the order name.
#[derive(Default)]
struct FakeProvider {
    search_calls: Mutex<u32>,
    orders: Mutex<Vec<Value>>,
    reject_orders: bool,
}

impl FakeProvider {
    fn rejecting_orders() -> Self {
        Self {
            reject_orders: true,
            ..Default::default()
        }
    }

    fn submitted(&self) -> Vec<Value> {
        self.orders.lock().clone()
    }
}

fn page(ids: &[&str], next: Option<&str>) -> HttpResponse {
    let features: Vec<_> = ids.iter().map(|id| json!({ "id": id })).collect();
    let body = json!({ "features": features, "_links": { "_next": next } });
    HttpResponse::new(200, serde_json::to_vec(&body).unwrap())
}

impl AsyncHttpClient for FakeProvider {
    async fn get(&self, url: &str) -> Result<HttpResponse, ProviderError> {
        match url {
            PAGE_2_URL => Ok(page(&[SCENES[3]], None)),
            _ => Ok(HttpResponse::new(404, "not found")),
        }
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpResponse, ProviderError> {
        match url {
            SEARCH_URL => {
                let mut calls = self.search_calls.lock();
                *calls += 1;
                if *calls == 1 {
                    return Ok(HttpResponse::new(429, "slow down").with_retry_after("0"));
                }
                Ok(page(&SCENES[..3], Some(PAGE_2_URL)))
            }
            ORDERS_URL if self.reject_orders => Ok(HttpResponse::new(400, "bad bundle")),
            ORDERS_URL => {
                self.orders.lock().push(body.clone());
                let name = body["name"].as_str().unwrap_or("");
                let reply = json!({ "id": format!("order-{name}"), "state": "queued" });
                Ok(HttpResponse::new(202, serde_json::to_vec(&reply).unwrap()))
            }
            _ => Ok(HttpResponse::new(404, "not found")),
        }
    }
}

// ============================================================================
// Fixtures
// ============================================================================

const SCENES: [&str; 4] = [
    "20210701_101010_1004",
    "20210702_101010_1004",
    "20210703_101010_1004",
    "20210704_101010_1004",
];

fn tile() -> TileCoord {
    TileCoord::new(12000, 17000, 15).unwrap()
}

fn api() -> ApiConfig {
    ApiConfig {
        search_url: SEARCH_URL.to_string(),
        orders_url: ORDERS_URL.to_string(),
        ..Default::default()
    }
}

/// Target collection holding one polygon in the middle of `tile()`.
fn write_target(store: &MemoryStore) {
    let b = tile_bounds(&tile());
    let (dx, dy) = ((b.east - b.west) / 4.0, (b.north - b.south) / 4.0);
    let (w, s, e, n) = (b.west + dx, b.south + dy, b.east - dx, b.north - dy);
    let target = json!({
        "type": "FeatureCollection",
        "name": "kilns",
        "features": [{
            "type": "Feature",
            "properties": { "site": "a" },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[w, s], [e, s], [e, n], [w, n], [w, s]]]
            }
        }]
    });
    store
        .put_string("targets/2021_06_30_kilns.geojson", &target.to_string())
        .unwrap();
}

/// GeoTIFF covering `tile()` with 20 m pixels.
fn tiff(bands: usize, value: f32) -> Vec<u8> {
    let b = tile_xy_bounds(&tile());
    let width = (b.width() / 20.0).ceil() as usize;
    let height = (b.height() / 20.0).ceil() as usize;
    let raster = Raster::new(
        Array3::from_elem((bands, height, width), value),
        GeoTransform::new(b.left, b.top, 20.0, -20.0),
        PixelType::U16,
    );
    geotiff::encode(&raster).unwrap()
}

/// Delivers every scene; the last one is fully flagged by its quality layer.
fn deliver(store: &MemoryStore) {
    for (i, scene) in SCENES.iter().enumerate() {
        let flagged = if i == SCENES.len() - 1 { 1.0 } else { 0.0 };
        store
            .put_bytes(
                &format!("delivered/{scene}/{scene}_3B_AnalyticMS_SR.tif"),
                &tiff(4, 800.0),
            )
            .unwrap();
        store
            .put_bytes(&format!("delivered/{scene}/{scene}_3B_udm.tif"), &tiff(1, flagged))
            .unwrap();
        store
            .put_string(&format!("delivered/{scene}/{scene}_metadata.json"), "{}")
            .unwrap();
    }
}

async fn search(store: &MemoryStore, client: &FakeProvider) -> String {
    let api = api();
    let ctx = PipelineContext::new(store, client, &api, "run/data");
    let output = run_search_phase(
        &ctx,
        "targets",
        IntervalResolver::default(),
        SearchConfig::default(),
        2,
    )
    .await
    .unwrap();
    assert_eq!(output.scenes, 4);
    assert_eq!(output.orders, 2);
    output.manifest_path
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_search_paginates_and_partitions() {
    let store = MemoryStore::new();
    write_target(&store);
    let client = FakeProvider::default();

    let manifest_path = search(&store, &client).await;
    assert_eq!(*client.search_calls.lock(), 2, "429 retried exactly once");

    let manifest: BTreeMap<String, OrderManifestEntry> =
        read_manifest(&store, &manifest_path).unwrap();
    let mut batches: Vec<Vec<String>> = manifest.values().map(|e| e.asset_ids.clone()).collect();
    batches.sort();
    assert_eq!(
        batches,
        vec![
            vec![SCENES[0].to_string(), SCENES[1].to_string()],
            vec![SCENES[2].to_string(), SCENES[3].to_string()],
        ]
    );
    for entry in manifest.values() {
        assert_eq!(entry.geojson.name(), Some("kilns"));
        assert_eq!(entry.geojson.features.len(), 1);
    }
}

#[tokio::test]
async fn test_order_phase_submits_and_resumes() {
    let store = MemoryStore::new();
    write_target(&store);
    let client = FakeProvider::default();
    let order_manifest = search(&store, &client).await;
    let api = api();

    let ctx = PipelineContext::new(&store, &client, &api, "run/data");
    let first = run_order_phase(&ctx, &order_manifest, OrderConfig::default(), None)
        .await
        .unwrap();
    assert_eq!((first.submitted, first.skipped), (2, 0));

    let responses: BTreeMap<String, ResponseManifestEntry> =
        read_manifest(&store, &first.manifest_path).unwrap();
    for (uid, entry) in &responses {
        assert_eq!(entry.response["id"], format!("order-{uid}"));
        assert_eq!(entry.geojson.name(), Some("kilns"));
    }
    let submitted = client.submitted();
    assert_eq!(submitted.len(), 2);
    assert!(submitted
        .iter()
        .all(|order| order["products"][0]["item_ids"].as_array().unwrap().len() == 2));

    // A second run against the recorded responses submits nothing new
    let ctx = PipelineContext::new(&store, &client, &api, "run2/data");
    let resumed = run_order_phase(
        &ctx,
        &order_manifest,
        OrderConfig::default(),
        Some(&first.manifest_path),
    )
    .await
    .unwrap();
    assert_eq!((resumed.submitted, resumed.skipped), (0, 2));
    assert_eq!(client.submitted().len(), 2);

    let carried: BTreeMap<String, ResponseManifestEntry> =
        read_manifest(&store, &resumed.manifest_path).unwrap();
    assert_eq!(carried, responses);
}

#[tokio::test]
async fn test_rejected_order_is_fatal() {
    let store = MemoryStore::new();
    write_target(&store);
    let client = FakeProvider::rejecting_orders();
    let order_manifest = search(&store, &client).await;
    let api = api();

    let ctx = PipelineContext::new(&store, &client, &api, "run/data");
    let err = run_order_phase(&ctx, &order_manifest, OrderConfig::default(), None)
        .await
        .unwrap_err();

    match err {
        PipelineError::Order { source, .. } => {
            assert!(matches!(source, ProviderError::RequestFailed { status: 400, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_samples_from_delivered_scenes() {
    let store = MemoryStore::new();
    write_target(&store);
    let client = FakeProvider::default();
    let order_manifest = search(&store, &client).await;
    deliver(&store);

    let config = SampleConfig {
        pixel_size: PixelSize { x: 40.0, y: -40.0 },
        ..Default::default()
    };
    let output = run_sample_phase(
        &store,
        &store,
        &order_manifest,
        "delivered",
        "run/data",
        &config,
    )
    .unwrap();
    assert_eq!(output.samples, SCENES.len());
    assert_eq!(output.all_null, 1);

    let bytes = store.get_bytes(&output.manifest_path).unwrap();
    let manifest: TileManifest = serde_json::from_slice(&bytes).unwrap();
    let quadkey = tile().quadkey();
    for (i, scene) in SCENES.iter().enumerate() {
        let record = manifest.get(15, &quadkey, scene).unwrap();
        assert_eq!(record.all_null, i == SCENES.len() - 1);
        for path in [Some(&record.image), Some(&record.udm), record.target.as_ref()] {
            let path = path.unwrap();
            assert!(path.starts_with(&format!("run/data/tiles/zoom_15/{quadkey}/")));
            assert!(store.get_bytes(path).is_ok());
        }
    }

    let first = manifest.get(15, &quadkey, SCENES[0]).unwrap();
    let image = geotiff::decode(&store.get_bytes(&first.image).unwrap()).unwrap();
    assert_eq!(image.band_count(), 4);
    assert_eq!(image.band(0)[[0, 0]], 800.0);
}

#[tokio::test]
async fn test_samples_without_deliveries_fail_on_first_scene() {
    let store = MemoryStore::new();
    write_target(&store);
    let client = FakeProvider::default();
    let order_manifest = search(&store, &client).await;

    let err = run_sample_phase(
        &store,
        &store,
        &order_manifest,
        "delivered",
        "run/data",
        &SampleConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Sample(tileforge::samples::SampleError::MissingAsset { .. })
    ));
}

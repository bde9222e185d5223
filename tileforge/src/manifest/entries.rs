//! Typed manifest entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geometry::FeatureSet;

/// One order to submit: the target collection and its batch of scenes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderManifestEntry {
    pub geojson: FeatureSet,
    pub asset_ids: Vec<String>,
}

/// One submitted (or dry-run) order and the provider's reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseManifestEntry {
    pub geojson: FeatureSet,
    pub response: Value,
    /// Set when `response` is the unsent payload of a dry run.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub dry_run: bool,
}

impl ResponseManifestEntry {
    pub fn submitted(geojson: FeatureSet, response: Value) -> Self {
        Self {
            geojson,
            response,
            dry_run: false,
        }
    }
}

/// Order uid → order.
pub type OrderManifest = BTreeMap<String, OrderManifestEntry>;

/// Order uid → submission response.
pub type ResponseManifest = BTreeMap<String, ResponseManifestEntry>;

/// Files written for one scene in one tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Class mask path, present in training mode only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub image: String,
    pub udm: String,
    pub all_null: bool,
}

/// zoom → quadkey → scene id → sample files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileManifest {
    zooms: BTreeMap<u8, BTreeMap<String, BTreeMap<String, SampleRecord>>>,
}

impl TileManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a sample, replacing any earlier record for the same key.
    pub fn insert(&mut self, zoom: u8, quadkey: &str, scene_id: &str, record: SampleRecord) {
        self.zooms
            .entry(zoom)
            .or_default()
            .entry(quadkey.to_string())
            .or_default()
            .insert(scene_id.to_string(), record);
    }

    pub fn get(&self, zoom: u8, quadkey: &str, scene_id: &str) -> Option<&SampleRecord> {
        self.zooms.get(&zoom)?.get(quadkey)?.get(scene_id)
    }

    /// Number of sample records.
    pub fn len(&self) -> usize {
        self.zooms
            .values()
            .flat_map(|tiles| tiles.values())
            .map(|scenes| scenes.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every record as `(zoom, quadkey, scene_id, record)`.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &str, &str, &SampleRecord)> {
        self.zooms.iter().flat_map(|(zoom, tiles)| {
            tiles.iter().flat_map(move |(quadkey, scenes)| {
                scenes
                    .iter()
                    .map(move |(scene, record)| (*zoom, quadkey.as_str(), scene.as_str(), record))
            })
        })
    }

    /// Moves every record of `other` into this manifest.
    pub fn merge(&mut self, other: TileManifest) {
        for (zoom, tiles) in other.zooms {
            let target = self.zooms.entry(zoom).or_default();
            for (quadkey, scenes) in tiles {
                target.entry(quadkey).or_default().extend(scenes);
            }
        }
    }
}

//! JSON manifests checkpointing the pipeline phases.
//!
//! Each manifest is one JSON object keyed by an opaque identifier. It is
//! written once, in full, after the producing phase drains, and read back
//! entry by entry by the next phase.
//!
//! | File | Keys | Values |
//! |------|------|--------|
//! | `order_manifest.json` | order uid | [`OrderManifestEntry`] |
//! | `order_responses.json` | order uid | [`ResponseManifestEntry`] |
//! | `order_dry_run.json` | order uid | [`ResponseManifestEntry`], payload only |
//! | `tiles_manifest.json` | zoom | quadkey → scene → [`SampleRecord`] |

mod entries;

pub use entries::{
    OrderManifest, OrderManifestEntry, ResponseManifest, ResponseManifestEntry, SampleRecord,
    TileManifest,
};

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::storage::{BlobStore, StorageError};

/// File name of the order manifest.
pub const ORDER_MANIFEST_FILE: &str = "order_manifest.json";

/// File name of the response manifest.
pub const RESPONSE_MANIFEST_FILE: &str = "order_responses.json";

/// File name of the payloads recorded by a dry-run order phase.
pub const DRY_RUN_MANIFEST_FILE: &str = "order_dry_run.json";

/// File name of the tile manifest.
pub const TILE_MANIFEST_FILE: &str = "tiles_manifest.json";

/// Errors raised while reading or writing manifests.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The file is not a JSON object
    #[error("Malformed manifest {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// One entry does not match the expected shape
    #[error("Malformed entry '{key}' in manifest {path}: {source}")]
    InvalidEntry {
        path: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode manifest {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Writes `manifest` as pretty-printed JSON to `path`.
pub fn write_manifest<S, T>(store: &S, path: &str, manifest: &T) -> Result<(), ManifestError>
where
    S: BlobStore + ?Sized,
    T: Serialize + ?Sized,
{
    let json = serde_json::to_vec_pretty(manifest).map_err(|source| ManifestError::Encode {
        path: path.to_string(),
        source,
    })?;
    store.put_bytes(path, &json)?;
    info!(path = path, bytes = json.len(), "Manifest written");
    Ok(())
}

/// Reads a whole manifest into a map.
pub fn read_manifest<S, T>(
    store: &S,
    path: &str,
) -> Result<std::collections::BTreeMap<String, T>, ManifestError>
where
    S: BlobStore + ?Sized,
    T: DeserializeOwned,
{
    ManifestReader::open(store, path)?.collect()
}

/// Iterates a manifest's top-level entries one at a time.
///
/// The document must be a JSON object; that is checked when the reader is
/// opened. Each value is decoded into `T` only when the iterator reaches
/// it.
pub struct ManifestReader<T> {
    path: String,
    entries: serde_json::map::IntoIter,
    _entry: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> ManifestReader<T> {
    /// Loads `path` and checks that it holds a JSON object.
    pub fn open<S: BlobStore + ?Sized>(store: &S, path: &str) -> Result<Self, ManifestError> {
        let bytes = store.get_bytes(path)?;
        Self::from_slice(path, &bytes)
    }

    /// Reader over an in-memory document.
    pub fn from_slice(path: &str, bytes: &[u8]) -> Result<Self, ManifestError> {
        let object: Map<String, Value> =
            serde_json::from_slice(bytes).map_err(|source| ManifestError::Decode {
                path: path.to_string(),
                source,
            })?;
        debug!(path = path, entries = object.len(), "Manifest opened");
        Ok(Self {
            path: path.to_string(),
            entries: object.into_iter(),
            _entry: PhantomData,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl<T: DeserializeOwned> Iterator for ManifestReader<T> {
    type Item = Result<(String, T), ManifestError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (key, value) = self.entries.next()?;
        Some(match serde_json::from_value(value) {
            Ok(entry) => Ok((key, entry)),
            Err(source) => Err(ManifestError::InvalidEntry {
                path: self.path.clone(),
                key,
                source,
            }),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

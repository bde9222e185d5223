//! Opening located files as source rasters.

use tracing::debug;

use super::{LocatedAssets, SampleError};
use crate::raster::SourceDataset;
use crate::storage::BlobStore;

/// Reads located files from a store and decodes them.
pub struct AssetLoader<'a, S: BlobStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: BlobStore + ?Sized> AssetLoader<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Opens one file as an in-memory dataset.
    pub fn open(&self, scene_id: &str, path: &str) -> Result<SourceDataset, SampleError> {
        let bytes = self.store.get_bytes(path)?;
        debug!(scene_id = scene_id, path = path, bytes = bytes.len(), "Opening asset");
        SourceDataset::open(path, &bytes).map_err(|source| SampleError::Raster {
            scene_id: scene_id.to_string(),
            source,
        })
    }

    /// Opens a scene's image and, when located, its quality layer.
    pub fn load(
        &self,
        assets: &LocatedAssets,
    ) -> Result<(SourceDataset, Option<SourceDataset>), SampleError> {
        let image = self.open(&assets.scene_id, &assets.image)?;
        let quality = assets
            .quality
            .as_deref()
            .map(|path| self.open(&assets.scene_id, path))
            .transpose()?;
        Ok((image, quality))
    }
}

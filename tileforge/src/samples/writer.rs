//! Writing tile windows to storage.

use tracing::debug;

use super::{SampleError, TileCells};
use crate::manifest::SampleRecord;
use crate::raster::{geotiff, Raster};
use crate::storage::BlobStore;

/// Directory under the save directory holding tile samples.
pub const TILES_DIR: &str = "tiles";

/// Encodes tile windows as GeoTIFFs under
/// `<save_dir>/tiles/zoom_<z>/<quadkey>/`.
pub struct SampleWriter<'a, S: BlobStore + ?Sized> {
    store: &'a S,
    save_dir: String,
}

impl<'a, S: BlobStore + ?Sized> SampleWriter<'a, S> {
    pub fn new(store: &'a S, save_dir: impl Into<String>) -> Self {
        Self {
            store,
            save_dir: save_dir.into(),
        }
    }

    /// Directory holding one tile's files.
    pub fn tile_dir(&self, zoom: u8, quadkey: &str) -> String {
        self.store.join(&[
            &self.save_dir,
            TILES_DIR,
            &format!("zoom_{}", zoom),
            quadkey,
        ])
    }

    fn put(&self, scene_id: &str, path: &str, raster: &Raster) -> Result<(), SampleError> {
        let bytes = geotiff::encode(raster).map_err(|source| SampleError::Raster {
            scene_id: scene_id.to_string(),
            source,
        })?;
        self.store.put_bytes(path, &bytes)?;
        Ok(())
    }

    /// Writes the windows of one tile and returns their manifest record.
    pub fn write(&self, cells: &TileCells, all_null: bool) -> Result<SampleRecord, SampleError> {
        let dir = self.tile_dir(cells.tile.zoom, &cells.quadkey);
        let path = |suffix: &str| self.store.join(&[&dir, &format!("{}_{}.tif", cells.scene_id, suffix)]);

        let image = path("geotiff");
        let udm = path("udm");
        self.put(&cells.scene_id, &image, &cells.image)?;
        self.put(&cells.scene_id, &udm, &cells.quality)?;

        let target = match &cells.label {
            Some(label) => {
                let target = path("target");
                self.put(&cells.scene_id, &target, label)?;
                Some(target)
            }
            None => None,
        };

        debug!(scene_id = %cells.scene_id, quadkey = %cells.quadkey, all_null = all_null, "Sample written");
        Ok(SampleRecord {
            target,
            image,
            udm,
            all_null,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileCoord;
    use crate::raster::{GeoTransform, GridSpec, PixelType};
    use crate::storage::MemoryStore;

    fn cells(with_label: bool) -> TileCells {
        let grid = GridSpec {
            transform: GeoTransform::new(0.0, 6.0, 3.0, -3.0),
            width: 2,
            height: 2,
        };
        let tile = TileCoord::new(1, 2, 2).unwrap();
        TileCells {
            tile,
            quadkey: tile.quadkey(),
            scene_id: "scene".to_string(),
            label: with_label.then(|| Raster::filled(&grid, 1, PixelType::U8, 1.0)),
            image: Raster::filled(&grid, 4, PixelType::U16, 100.0),
            quality: Raster::filled(&grid, 1, PixelType::U8, 0.0).with_nodata(Some(1.0)),
        }
    }

    #[test]
    fn test_writes_expected_layout() {
        let store = MemoryStore::new();
        let writer = SampleWriter::new(&store, "run/data");
        let record = writer.write(&cells(true), false).unwrap();

        let quadkey = TileCoord::new(1, 2, 2).unwrap().quadkey();
        let dir = format!("run/data/tiles/zoom_2/{}", quadkey);
        assert_eq!(record.image, format!("{}/scene_geotiff.tif", dir));
        assert_eq!(record.udm, format!("{}/scene_udm.tif", dir));
        assert_eq!(record.target, Some(format!("{}/scene_target.tif", dir)));
        assert!(!record.all_null);
        assert_eq!(store.len(), 3);

        let udm = geotiff::decode(&store.get_bytes(&record.udm).unwrap()).unwrap();
        assert_eq!(udm.nodata(), Some(1.0));
        let image = geotiff::decode(&store.get_bytes(&record.image).unwrap()).unwrap();
        assert_eq!(image.band_count(), 4);
    }

    #[test]
    fn test_no_target_without_label() {
        let store = MemoryStore::new();
        let record = SampleWriter::new(&store, "out")
            .write(&cells(false), false)
            .unwrap();
        assert!(record.target.is_none());
        assert_eq!(store.len(), 2);
    }
}

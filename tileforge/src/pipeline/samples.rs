//! Sample phase: order manifest + delivered rasters → tile manifest.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::PipelineError;
use crate::coord::{tiles_covering, TileCoord};
use crate::manifest::{
    write_manifest, ManifestReader, OrderManifestEntry, SampleRecord, TileManifest,
    TILE_MANIFEST_FILE,
};
use crate::samples::{
    AssetKind, AssetLoader, AssetLocator, GridCellResampler, MaskSynthesizer, SampleConfig,
    SampleError, SampleWriter, SceneSource,
};
use crate::storage::BlobStore;

/// Summary of a finished sample phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplePhaseOutput {
    pub manifest_path: String,
    /// Tile samples written, one per (tile, scene).
    pub samples: usize,
    /// Samples whose mask is entirely background.
    pub all_null: usize,
}

/// Per-scene tile processing shared by the sequential and parallel paths.
struct TileWorker<'a, O: BlobStore + ?Sized> {
    resampler: GridCellResampler,
    mask: MaskSynthesizer,
    writer: SampleWriter<'a, O>,
}

impl<O: BlobStore + ?Sized> TileWorker<'_, O> {
    fn process(
        &self,
        scene: &SceneSource,
        tile: TileCoord,
    ) -> Result<(u8, String, SampleRecord), SampleError> {
        let mut cells = self.resampler.cells(scene, tile)?;
        let all_null = match cells.label.as_mut() {
            Some(label) => self.mask.apply(&scene.scene_id, label, &cells.quality)?,
            None => false,
        };
        let record = self.writer.write(&cells, all_null)?;
        Ok((tile.zoom, cells.quadkey, record))
    }
}

/// Builds tile samples for every scene named in the order manifest.
///
/// Delivered rasters are listed from `src_dir` in `source`; the order
/// manifest is read from, and samples plus `tiles_manifest.json` are
/// written to, `save_dir` in `output`. Each scene is cut into one window
/// per tile covering its order's target collection at every configured
/// zoom. The scene's datasets are closed once its tiles are done.
///
/// Every scene needs both an image and a quality file; the first scene
/// missing either stops the phase.
pub fn run_sample_phase<S, O>(
    source: &S,
    output: &O,
    manifest_path: &str,
    src_dir: &str,
    save_dir: &str,
    config: &SampleConfig,
) -> Result<SamplePhaseOutput, PipelineError>
where
    S: BlobStore + ?Sized,
    O: BlobStore + ?Sized,
{
    let paths = source.list(src_dir, Some(&config.raster_extension))?;
    info!(src_dir = src_dir, files = paths.len(), "Listed delivered rasters");

    let locator = AssetLocator::new(config.quality_suffix.clone());
    let loader = AssetLoader::new(source);
    let worker = TileWorker {
        resampler: GridCellResampler::new(config.pixel_size),
        mask: MaskSynthesizer::new(config.mask_mode),
        writer: SampleWriter::new(output, save_dir),
    };

    let mut manifest = TileManifest::new();
    for entry in ManifestReader::<OrderManifestEntry>::open(output, manifest_path)? {
        let (order_uid, entry) = entry?;
        let bounds = entry
            .geojson
            .bounds()
            .map_err(|source| PipelineError::Geometry {
                order_uid: order_uid.clone(),
                source,
            })?;
        let label = config.training.then_some(&entry.geojson);
        debug!(order_uid = %order_uid, scenes = entry.asset_ids.len(), "Processing order");

        for assets in locator.locate_all(&entry.asset_ids, &paths, true) {
            let assets = assets?;
            let (image, quality) = loader.load(&assets)?;
            let Some(quality) = quality else {
                return Err(SampleError::MissingAsset {
                    scene_id: assets.scene_id,
                    kind: AssetKind::Quality,
                }
                .into());
            };
            let mut scene = SceneSource::new(assets.scene_id, image, quality, label)?;

            let tiles = tiles_covering(&bounds, &config.zooms, config.truncate)?;
            let records: Vec<(u8, String, SampleRecord)> = if config.parallel_tiles {
                tiles
                    .par_bridge()
                    .map(|tile| worker.process(&scene, tile))
                    .collect::<Result<_, _>>()?
            } else {
                tiles
                    .map(|tile| worker.process(&scene, tile))
                    .collect::<Result<_, _>>()?
            };
            scene.close();

            let mut scene_manifest = TileManifest::new();
            for (zoom, quadkey, record) in records {
                scene_manifest.insert(zoom, &quadkey, &scene.scene_id, record);
            }
            info!(scene_id = %scene.scene_id, tiles = scene_manifest.len(), "Scene sampled");
            manifest.merge(scene_manifest);
        }
    }

    let all_null = manifest.iter().filter(|(_, _, _, r)| r.all_null).count();
    if !manifest.is_empty() && all_null == manifest.len() {
        warn!("Every sample mask is background");
    }

    let manifest_path = output.join(&[save_dir, TILE_MANIFEST_FILE]);
    write_manifest(output, &manifest_path, &manifest)?;
    info!(
        path = %manifest_path,
        samples = manifest.len(),
        all_null = all_null,
        "Sample phase complete"
    );

    Ok(SamplePhaseOutput {
        manifest_path,
        samples: manifest.len(),
        all_null,
    })
}

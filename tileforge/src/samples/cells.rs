//! Per-tile raster windows.

use tracing::trace;

use super::SampleError;
use crate::coord::TileCoord;
use crate::geometry::{FeatureSet, ProjectedShape};
use crate::raster::{rasterize, resample, GridSpec, PixelSize, Raster, Resampling, SourceDataset};

/// No-data value of quality windows; pixels outside the scene count as
/// flagged.
pub const QUALITY_NODATA: f64 = 1.0;

/// Value burned into the label window where the target geometry lies.
const LABEL_BURN: u8 = 1;

/// One scene's open sources.
#[derive(Debug)]
pub struct SceneSource {
    pub scene_id: String,
    pub image: SourceDataset,
    pub quality: SourceDataset,
    /// Target geometry in Web Mercator, present in training mode.
    pub label: Option<ProjectedShape>,
}

impl SceneSource {
    /// Bundles a scene's datasets, projecting `label` when given.
    pub fn new(
        scene_id: impl Into<String>,
        image: SourceDataset,
        quality: SourceDataset,
        label: Option<&FeatureSet>,
    ) -> Result<Self, SampleError> {
        let scene_id = scene_id.into();
        let label = label
            .map(|features| features.project_mercator())
            .transpose()
            .map_err(|source| SampleError::Geometry {
                scene_id: scene_id.clone(),
                source,
            })?;
        Ok(Self {
            scene_id,
            image,
            quality,
            label,
        })
    }

    /// Releases the label and closes both datasets. Safe to call twice.
    pub fn close(&mut self) {
        self.label = None;
        self.image.close();
        self.quality.close();
    }
}

/// Windows cut from one scene for one tile.
#[derive(Debug, Clone)]
pub struct TileCells {
    pub tile: TileCoord,
    pub quadkey: String,
    pub scene_id: String,
    pub label: Option<Raster>,
    pub image: Raster,
    pub quality: Raster,
}

/// Cuts tile-aligned windows at a fixed pixel size.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridCellResampler {
    pixel_size: PixelSize,
}

impl GridCellResampler {
    pub fn new(pixel_size: PixelSize) -> Self {
        Self { pixel_size }
    }

    /// Resamples every layer of `scene` onto `tile`'s grid.
    ///
    /// The label is rasterized straight onto the grid. The image is
    /// interpolated bilinearly and the quality layer uses nearest
    /// neighbour with [`QUALITY_NODATA`] outside the scene; both are
    /// reprojected from their own CRS.
    pub fn cells(&self, scene: &SceneSource, tile: TileCoord) -> Result<TileCells, SampleError> {
        let raster_err = |source| SampleError::Raster {
            scene_id: scene.scene_id.clone(),
            source,
        };

        let grid = GridSpec::for_tile(&tile, self.pixel_size).map_err(raster_err)?;
        let label = scene
            .label
            .as_ref()
            .map(|shape| rasterize(shape, &grid, LABEL_BURN));
        let image = resample(
            scene.image.raster().map_err(raster_err)?,
            &grid,
            Resampling::for_layer(false),
            None,
        )
        .map_err(raster_err)?;
        let quality = resample(
            scene.quality.raster().map_err(raster_err)?,
            &grid,
            Resampling::for_layer(true),
            Some(QUALITY_NODATA),
        )
        .map_err(raster_err)?;

        let quadkey = tile.quadkey();
        trace!(scene_id = %scene.scene_id, quadkey = %quadkey, width = grid.width, height = grid.height, "Cut tile cells");
        Ok(TileCells {
            tile,
            quadkey,
            scene_id: scene.scene_id.clone(),
            label,
            image,
            quality,
        })
    }
}

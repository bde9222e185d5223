//! Training sample generation
//!
//! Turns delivered scenes into per-tile samples:
//!
//! 1. [`AssetLocator`] pairs each scene id with its image and quality files
//! 2. [`AssetLoader`] opens both as source rasters
//! 3. [`GridCellResampler`] cuts one window per tile (label, image, quality)
//! 4. [`MaskSynthesizer`] composites label and quality into a class mask
//! 5. [`SampleWriter`] stores the windows as GeoTIFFs
//!
//! Each tile's windows are owned by the task processing that tile and are
//! dropped once written.

mod cells;
mod loader;
mod locator;
mod mask;
mod writer;

pub use cells::{GridCellResampler, SceneSource, TileCells, QUALITY_NODATA};
pub use loader::AssetLoader;
pub use locator::{AssetKind, AssetLocator, LocatedAssets};
pub use mask::{MaskMode, MaskSynthesizer};
pub use writer::{SampleWriter, TILES_DIR};

use thiserror::Error;

use crate::coord::CoordError;
use crate::geometry::GeometryError;
use crate::raster::{PixelSize, RasterError};
use crate::storage::StorageError;

/// Default tile zoom levels.
pub const DEFAULT_ZOOMS: [u8; 1] = [15];

/// Default suffix marking the quality layer's file stem.
pub const DEFAULT_QUALITY_SUFFIX: &str = "udm";

/// Default extension of delivered rasters.
pub const DEFAULT_RASTER_EXTENSION: &str = ".tif";

/// Errors raised while building samples.
#[derive(Debug, Error)]
pub enum SampleError {
    /// No delivered file matches a scene for a required role
    #[error("No {kind} file found for scene {scene_id}")]
    MissingAsset { scene_id: String, kind: AssetKind },

    /// Several delivered files match a scene for the same role
    #[error("Several {kind} files match scene {scene_id}: {paths:?}")]
    AmbiguousAsset {
        scene_id: String,
        kind: AssetKind,
        paths: Vec<String>,
    },

    /// Label and quality windows disagree in shape
    #[error("Mask inputs differ in shape for scene {scene_id}: label {label:?}, quality {quality:?}")]
    ShapeMismatch {
        scene_id: String,
        label: (usize, usize),
        quality: (usize, usize),
    },

    #[error("Raster error for scene {scene_id}: {source}")]
    Raster {
        scene_id: String,
        #[source]
        source: RasterError,
    },

    #[error("Invalid geometry for scene {scene_id}: {source}")]
    Geometry {
        scene_id: String,
        #[source]
        source: GeometryError,
    },

    #[error(transparent)]
    Coord(#[from] CoordError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Sample generation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleConfig {
    pub zooms: Vec<u8>,
    /// Clamp out-of-range zoom levels instead of rejecting them.
    pub truncate: bool,
    pub pixel_size: PixelSize,
    /// Produce label masks alongside the imagery.
    pub training: bool,
    pub mask_mode: MaskMode,
    pub quality_suffix: String,
    pub raster_extension: String,
    /// Process a scene's tiles on the rayon pool.
    pub parallel_tiles: bool,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            zooms: DEFAULT_ZOOMS.to_vec(),
            truncate: true,
            pixel_size: PixelSize::default(),
            training: true,
            mask_mode: MaskMode::default(),
            quality_suffix: DEFAULT_QUALITY_SUFFIX.to_string(),
            raster_extension: DEFAULT_RASTER_EXTENSION.to_string(),
            parallel_tiles: false,
        }
    }
}

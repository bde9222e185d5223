//! In-memory georeferenced rasters
//!
//! The sample pipeline needs a small raster toolkit: decode delivered
//! GeoTIFFs, resample them onto a tile's grid, burn label geometry into the
//! same grid, and encode the results back to GeoTIFF. Tile grids live in
//! Web Mercator metres; sources may be in WGS84 or a WGS84 / UTM zone and
//! are reprojected while resampling.
//!
//! # Example
//!
//! ```ignore
//! use tileforge::coord::TileCoord;
//! use tileforge::raster::{geotiff, resample, GridSpec, PixelSize, Resampling};
//!
//! let source = geotiff::decode(&bytes)?;
//! let grid = GridSpec::for_tile(&tile, PixelSize::default())?;
//! let cell = resample(&source, &grid, Resampling::Bilinear, None)?;
//! let encoded = geotiff::encode(&cell)?;
//! ```

mod crs;
mod error;
pub mod geotiff;
mod rasterize;
mod resample;
mod types;

pub use crs::{Crs, Reprojector, EPSG_WEB_MERCATOR, EPSG_WGS84};
pub use error::RasterError;
pub use rasterize::rasterize;
pub use resample::{resample, Resampling};
pub use types::{
    GeoTransform, GridSpec, PixelSize, PixelType, Raster, SourceDataset, MAX_GRID_PIXELS,
};

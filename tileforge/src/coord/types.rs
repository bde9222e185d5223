//! Coordinate type definitions

use thiserror::Error;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.051_128_779_806_59;
pub const MAX_LAT: f64 = 85.051_128_779_806_59;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Zoom levels supported by the quadtree tiling scheme.
///
/// The upper bound keeps `2^zoom` inside `u32` and quadkeys short enough
/// to be used as directory names.
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 24;

/// Earth radius used by the spherical Web Mercator projection (EPSG:3857).
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Half the Web Mercator world width in metres.
pub const ORIGIN_SHIFT_M: f64 = std::f64::consts::PI * EARTH_RADIUS_M;

/// Tile coordinates in the Web Mercator / Slippy Map quadtree.
///
/// `col` is the tile X index (west to east) and `row` the tile Y index
/// (north to south).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Y coordinate (north-south), 0 at north
    pub row: u32,
    /// X coordinate (east-west), 0 at west
    pub col: u32,
    /// Zoom level
    pub zoom: u8,
}

impl TileCoord {
    /// Create a tile coordinate, validating the indices against the zoom level.
    pub fn new(row: u32, col: u32, zoom: u8) -> Result<Self, CoordError> {
        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(zoom));
        }
        let n = 1u64 << zoom;
        if u64::from(row) >= n || u64::from(col) >= n {
            return Err(CoordError::TileOutOfRange { row, col, zoom });
        }
        Ok(Self { row, col, zoom })
    }

    /// Quadkey string for this tile (one digit per zoom level).
    pub fn quadkey(&self) -> String {
        super::tile_to_quadkey(self)
    }
}

/// Geographic bounding box in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LngLatBbox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl LngLatBbox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &LngLatBbox) -> LngLatBbox {
        LngLatBbox {
            west: self.west.min(other.west),
            south: self.south.min(other.south),
            east: self.east.max(other.east),
            north: self.north.max(other.north),
        }
    }
}

/// Projected bounding box in Web Mercator metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MercatorBounds {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl MercatorBounds {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }
}

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Latitude is outside the valid range
    #[error("Invalid latitude: {0} (must be between -90 and 90)")]
    InvalidLatitude(f64),

    /// Longitude is outside the valid range
    #[error("Invalid longitude: {0} (must be between -180 and 180)")]
    InvalidLongitude(f64),

    /// Zoom level is outside the valid range
    #[error("Invalid zoom level: {0} (must be between 0 and 24)")]
    InvalidZoom(u8),

    /// Tile indices do not exist at the given zoom level
    #[error("Tile ({row}, {col}) does not exist at zoom {zoom}")]
    TileOutOfRange { row: u32, col: u32, zoom: u8 },

    /// Quadkey contains invalid characters or is too long
    #[error("Invalid quadkey: '{0}' (must contain only digits 0-3 and length <= 24)")]
    InvalidQuadkey(String),
}

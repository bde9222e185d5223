//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude),
//! Web Mercator metres and quadtree tile coordinates, plus quadkey encoding.
//! Tiles follow the standard power-of-two XYZ scheme: zoom `z` has `2^z`
//! columns and rows, row 0 at the north edge.

mod grid;
mod types;

pub use grid::{tiles_covering, TileGrid};
pub use types::{
    CoordError, LngLatBbox, MercatorBounds, TileCoord, EARTH_RADIUS_M, MAX_LAT, MAX_LON,
    MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM, ORIGIN_SHIFT_M,
};

use std::f64::consts::PI;

/// Converts geographic coordinates to tile coordinates.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 24)
///
/// # Returns
///
/// A `Result` containing the tile coordinates or an error if inputs are invalid.
#[inline]
pub fn to_tile_coords(lat: f64, lon: f64, zoom: u8) -> Result<TileCoord, CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let (col, row) = tile_index(lon, lat, zoom);
    Ok(TileCoord { row, col, zoom })
}

/// Tile indices for an already-validated point, clamped to the grid.
///
/// The east and south edges of the world belong to the last column/row.
#[inline]
pub(crate) fn tile_index(lon: f64, lat: f64, zoom: u8) -> (u32, u32) {
    let n = 2.0_f64.powi(zoom as i32);
    let max_index = (1u64 << zoom) - 1;

    let x = ((lon + 180.0) / 360.0 * n).floor();

    let lat_rad = lat.to_radians();
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).floor();

    let clamp = |v: f64| -> u32 {
        if v <= 0.0 {
            0
        } else {
            (v as u64).min(max_index) as u32
        }
    };

    (clamp(x), clamp(y))
}

/// Converts tile coordinates back to geographic coordinates.
///
/// Returns the latitude/longitude of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileCoord) -> (f64, f64) {
    let n = 2.0_f64.powi(tile.zoom as i32);

    let lon = tile.col as f64 / n * 360.0 - 180.0;

    let y = tile.row as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad.to_degrees();

    (lat, lon)
}

/// Geographic bounds of a tile.
pub fn tile_bounds(tile: &TileCoord) -> LngLatBbox {
    let (north, west) = tile_to_lat_lon(tile);
    let (south, east) = tile_to_lat_lon(&TileCoord {
        row: tile.row + 1,
        col: tile.col + 1,
        zoom: tile.zoom,
    });
    LngLatBbox {
        west,
        south,
        east,
        north,
    }
}

/// Web Mercator (EPSG:3857) bounds of a tile in metres.
///
/// Computed directly from the tile indices so adjacent tiles share exact
/// edges.
pub fn tile_xy_bounds(tile: &TileCoord) -> MercatorBounds {
    let tile_size = 2.0 * ORIGIN_SHIFT_M / 2.0_f64.powi(tile.zoom as i32);
    let x = |col: u32| col as f64 * tile_size - ORIGIN_SHIFT_M;
    let y = |row: u32| ORIGIN_SHIFT_M - row as f64 * tile_size;
    MercatorBounds {
        left: x(tile.col),
        bottom: y(tile.row + 1),
        right: x(tile.col + 1),
        top: y(tile.row),
    }
}

/// Inverse of [`lon_lat_to_meters`].
#[inline]
pub fn meters_to_lon_lat(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - PI / 2.0).to_degrees();
    (lon, lat)
}

/// Projects a longitude/latitude pair to Web Mercator metres.
///
/// Latitudes are clamped to the Mercator range so the poles stay finite.
#[inline]
pub fn lon_lat_to_meters(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(MIN_LAT, MAX_LAT);
    let x = EARTH_RADIUS_M * lon.to_radians();
    let y = EARTH_RADIUS_M * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

/// Encodes a tile as a quadkey.
///
/// Each zoom level contributes one digit: bit 0 from the column, bit 1
/// from the row. Zoom 0 encodes as the empty string.
pub fn tile_to_quadkey(tile: &TileCoord) -> String {
    let mut quadkey = String::with_capacity(tile.zoom as usize);
    for level in (1..=tile.zoom).rev() {
        let mask = 1u32 << (level - 1);
        let mut digit = b'0';
        if tile.col & mask != 0 {
            digit += 1;
        }
        if tile.row & mask != 0 {
            digit += 2;
        }
        quadkey.push(digit as char);
    }
    quadkey
}

/// Decodes a quadkey back into tile coordinates.
pub fn quadkey_to_tile(quadkey: &str) -> Result<TileCoord, CoordError> {
    if quadkey.len() > MAX_ZOOM as usize {
        return Err(CoordError::InvalidQuadkey(quadkey.to_string()));
    }

    let zoom = quadkey.len() as u8;
    let mut row = 0u32;
    let mut col = 0u32;

    for (i, ch) in quadkey.chars().enumerate() {
        let mask = 1u32 << (zoom as usize - i - 1);
        match ch {
            '0' => {}
            '1' => col |= mask,
            '2' => row |= mask,
            '3' => {
                col |= mask;
                row |= mask;
            }
            _ => return Err(CoordError::InvalidQuadkey(quadkey.to_string())),
        }
    }

    Ok(TileCoord { row, col, zoom })
}

//! Tile enumeration over a bounding box.
//!
//! [`tiles_covering`] yields every tile intersecting a geographic bounding
//! box at each requested zoom level. Boxes crossing the antimeridian
//! (`west > east`) are split in two. Enumeration is lazy: the grid only
//! stores one index range per (box, zoom) pair.

use super::{tile_index, CoordError, LngLatBbox, TileCoord, MAX_LAT, MAX_ZOOM, MIN_LAT, MIN_ZOOM};

/// Nudge applied to the east/south edges so a box ending exactly on a tile
/// boundary does not pull in the next tile.
const EDGE_EPSILON: f64 = 1e-9;

/// Inclusive index range of tiles at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TileSpan {
    zoom: u8,
    min_col: u32,
    max_col: u32,
    min_row: u32,
    max_row: u32,
}

impl TileSpan {
    fn len(&self) -> usize {
        let cols = (self.max_col - self.min_col) as usize + 1;
        let rows = (self.max_row - self.min_row) as usize + 1;
        cols * rows
    }
}

/// Lazy, finite iterator over the tiles covering a bounding box.
///
/// Tiles are yielded zoom by zoom in the order the zooms were requested;
/// within a zoom, column-major (all rows of the west-most column first).
#[derive(Debug, Clone)]
pub struct TileGrid {
    spans: Vec<TileSpan>,
    span_idx: usize,
    col: u32,
    row: u32,
}

impl TileGrid {
    fn new(spans: Vec<TileSpan>) -> Self {
        let (col, row) = spans
            .first()
            .map(|s| (s.min_col, s.min_row))
            .unwrap_or((0, 0));
        Self {
            spans,
            span_idx: 0,
            col,
            row,
        }
    }
}

impl Iterator for TileGrid {
    type Item = TileCoord;

    fn next(&mut self) -> Option<Self::Item> {
        let span = *self.spans.get(self.span_idx)?;

        let tile = TileCoord {
            row: self.row,
            col: self.col,
            zoom: span.zoom,
        };

        if self.row < span.max_row {
            self.row += 1;
        } else if self.col < span.max_col {
            self.col += 1;
            self.row = span.min_row;
        } else {
            self.span_idx += 1;
            if let Some(next) = self.spans.get(self.span_idx) {
                self.col = next.min_col;
                self.row = next.min_row;
            }
        }

        Some(tile)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let Some(current) = self.spans.get(self.span_idx) else {
            return (0, Some(0));
        };
        let rows = (current.max_row - current.min_row) as usize + 1;
        let consumed =
            (self.col - current.min_col) as usize * rows + (self.row - current.min_row) as usize;
        let remaining = self.spans[self.span_idx..]
            .iter()
            .map(TileSpan::len)
            .sum::<usize>()
            - consumed;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TileGrid {}

/// Enumerates the tiles intersecting `bounds` at each of `zooms`.
///
/// Latitudes are always clamped to the Web Mercator range. Without
/// `truncate`, longitudes outside ±180, latitudes outside ±90 and zoom
/// levels above [`MAX_ZOOM`] are rejected; with `truncate` they are
/// clamped into range instead.
///
/// Calling this again with the same arguments yields the same sequence.
pub fn tiles_covering(
    bounds: &LngLatBbox,
    zooms: &[u8],
    truncate: bool,
) -> Result<TileGrid, CoordError> {
    let mut bbox = *bounds;

    if truncate {
        bbox.west = bbox.west.clamp(-180.0, 180.0);
        bbox.east = bbox.east.clamp(-180.0, 180.0);
        bbox.south = bbox.south.clamp(-90.0, 90.0);
        bbox.north = bbox.north.clamp(-90.0, 90.0);
    } else {
        for lon in [bbox.west, bbox.east] {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(CoordError::InvalidLongitude(lon));
            }
        }
        for lat in [bbox.south, bbox.north] {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(CoordError::InvalidLatitude(lat));
            }
        }
    }

    let zooms = zooms
        .iter()
        .map(|&z| {
            if truncate {
                Ok(z.clamp(MIN_ZOOM, MAX_ZOOM))
            } else if z > MAX_ZOOM {
                Err(CoordError::InvalidZoom(z))
            } else {
                Ok(z)
            }
        })
        .collect::<Result<Vec<u8>, CoordError>>()?;

    let boxes = if bbox.west > bbox.east {
        vec![
            LngLatBbox::new(-180.0, bbox.south, bbox.east, bbox.north),
            LngLatBbox::new(bbox.west, bbox.south, 180.0, bbox.north),
        ]
    } else {
        vec![bbox]
    };

    let mut spans = Vec::with_capacity(boxes.len() * zooms.len());
    for b in &boxes {
        let west = b.west.max(-180.0);
        let south = b.south.max(MIN_LAT);
        let east = b.east.min(180.0);
        let north = b.north.min(MAX_LAT);

        for &zoom in &zooms {
            let (min_col, min_row) = tile_index(west, north, zoom);
            let (max_col, max_row) = tile_index(
                (east - EDGE_EPSILON).max(west),
                (south + EDGE_EPSILON).min(north),
                zoom,
            );
            spans.push(TileSpan {
                zoom,
                min_col,
                max_col: max_col.max(min_col),
                min_row,
                max_row: max_row.max(min_row),
            });
        }
    }

    Ok(TileGrid::new(spans))
}

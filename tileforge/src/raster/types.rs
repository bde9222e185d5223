//! Core raster types.

use ndarray::{Array3, ArrayView2, ArrayViewMut2, Axis};

use super::{Crs, RasterError};
use crate::coord::{tile_xy_bounds, MercatorBounds, TileCoord};

/// Affine georeferencing of a north-up raster in its CRS units.
///
/// `pixel_height` is negative for north-up rasters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Map coordinates of a pixel centre.
    #[inline]
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y + (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Fractional pixel position `(col, row)` of a map coordinate.
    #[inline]
    pub fn to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }
}

/// Storage type written out when a raster is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
    U8,
    U16,
    F32,
}

impl PixelType {
    pub fn is_integer(&self) -> bool {
        !matches!(self, PixelType::F32)
    }

    /// Clamps and rounds a value into the type's range.
    pub fn quantize(&self, value: f64) -> f32 {
        match self {
            PixelType::U8 => value.round().clamp(0.0, u8::MAX as f64) as f32,
            PixelType::U16 => value.round().clamp(0.0, u16::MAX as f64) as f32,
            PixelType::F32 => value as f32,
        }
    }
}

/// Output pixel size in metres. `y` is negative for north-up output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelSize {
    pub x: f64,
    pub y: f64,
}

impl Default for PixelSize {
    fn default() -> Self {
        Self { x: 3.0, y: -3.0 }
    }
}

/// Largest tile grid, in pixels per band, the pipelines will allocate.
pub const MAX_GRID_PIXELS: usize = 1 << 26;

/// Target grid for resampling or rasterization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub transform: GeoTransform,
    pub width: usize,
    pub height: usize,
}

impl GridSpec {
    /// Grid covering one tile's Web Mercator extent at a fixed pixel size.
    ///
    /// The grid is anchored at the tile's north-west corner and rounds the
    /// pixel count up, so it always covers the whole tile. Grids above
    /// [`MAX_GRID_PIXELS`] are rejected.
    pub fn for_tile(tile: &TileCoord, pixel_size: PixelSize) -> Result<Self, RasterError> {
        let px = pixel_size.x.abs();
        let py = pixel_size.y.abs();
        if !(px > 0.0 && py > 0.0 && px.is_finite() && py.is_finite()) {
            return Err(RasterError::InvalidGrid(format!(
                "pixel size must be non-zero, got {} x {}",
                pixel_size.x, pixel_size.y
            )));
        }

        let bounds = tile_xy_bounds(tile);
        let width = (bounds.width() / px).ceil().max(1.0);
        let height = (bounds.height() / py).ceil().max(1.0);
        if width * height > MAX_GRID_PIXELS as f64 {
            return Err(RasterError::InvalidGrid(format!(
                "zoom {} tile at {} x {} m pixels needs {:.0} x {:.0} pixels (limit {})",
                tile.zoom, px, py, width, height, MAX_GRID_PIXELS
            )));
        }
        let (width, height) = (width as usize, height as usize);

        Ok(Self {
            transform: GeoTransform::new(bounds.left, bounds.top, px, -py),
            width,
            height,
        })
    }
}

/// An in-memory, georeferenced, multi-band raster.
///
/// Pixels are held as `f32` in a `(band, row, col)` array regardless of the
/// storage type; `pixel_type` decides how they are written out.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    data: Array3<f32>,
    transform: GeoTransform,
    pixel_type: PixelType,
    nodata: Option<f64>,
    crs: Crs,
}

impl Raster {
    pub fn new(data: Array3<f32>, transform: GeoTransform, pixel_type: PixelType) -> Self {
        Self {
            data,
            transform,
            pixel_type,
            nodata: None,
            crs: Crs::WebMercator,
        }
    }

    /// Raster of `bands` bands over `grid`, every pixel set to `fill`.
    pub fn filled(grid: &GridSpec, bands: usize, pixel_type: PixelType, fill: f32) -> Self {
        Self::new(
            Array3::from_elem((bands, grid.height, grid.width), fill),
            grid.transform,
            pixel_type,
        )
    }

    pub fn with_nodata(mut self, nodata: Option<f64>) -> Self {
        self.nodata = nodata;
        self
    }

    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = crs;
        self
    }

    pub fn width(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    pub fn height(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn band_count(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array3<f32> {
        &mut self.data
    }

    pub fn band(&self, index: usize) -> ArrayView2<'_, f32> {
        self.data.index_axis(Axis(0), index)
    }

    pub fn band_mut(&mut self, index: usize) -> ArrayViewMut2<'_, f32> {
        self.data.index_axis_mut(Axis(0), index)
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Extent of the raster in its own CRS units.
    pub fn bounds(&self) -> MercatorBounds {
        let t = &self.transform;
        let x0 = t.origin_x;
        let x1 = t.origin_x + self.width() as f64 * t.pixel_width;
        let y0 = t.origin_y;
        let y1 = t.origin_y + self.height() as f64 * t.pixel_height;
        MercatorBounds {
            left: x0.min(x1),
            bottom: y0.min(y1),
            right: x0.max(x1),
            top: y0.max(y1),
        }
    }

    /// Whether `value` is this raster's no-data value.
    #[inline]
    pub fn is_nodata(&self, value: f32) -> bool {
        self.nodata.map_or(false, |nd| value as f64 == nd)
    }
}

/// A source raster opened from delivered bytes.
///
/// Closing releases the pixels; closing again is a no-op.
#[derive(Debug)]
pub struct SourceDataset {
    name: String,
    raster: Option<Raster>,
}

impl SourceDataset {
    /// Decodes a GeoTIFF into an open dataset.
    pub fn open(name: impl Into<String>, bytes: &[u8]) -> Result<Self, RasterError> {
        let raster = super::geotiff::decode(bytes)?;
        Ok(Self::from_raster(name, raster))
    }

    pub fn from_raster(name: impl Into<String>, raster: Raster) -> Self {
        Self {
            name: name.into(),
            raster: Some(raster),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.raster.is_some()
    }

    pub fn raster(&self) -> Result<&Raster, RasterError> {
        self.raster
            .as_ref()
            .ok_or_else(|| RasterError::Closed(self.name.clone()))
    }

    pub fn close(&mut self) {
        if self.raster.take().is_some() {
            tracing::trace!(dataset = %self.name, "Closed source dataset");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::ORIGIN_SHIFT_M;

    #[test]
    fn test_pixel_center_and_back() {
        let t = GeoTransform::new(100.0, 200.0, 3.0, -3.0);
        let (x, y) = t.pixel_center(2, 4);
        assert_eq!((x, y), (107.5, 186.5));
        let (c, r) = t.to_pixel(x, y);
        assert_eq!((c, r), (2.5, 4.5));
    }

    #[test]
    fn test_grid_for_world_tile() {
        let tile = TileCoord {
            row: 0,
            col: 0,
            zoom: 0,
        };
        let size = PixelSize {
            x: ORIGIN_SHIFT_M,
            y: -ORIGIN_SHIFT_M,
        };
        let grid = GridSpec::for_tile(&tile, size).unwrap();
        assert_eq!((grid.width, grid.height), (2, 2));
        assert!((grid.transform.origin_x + ORIGIN_SHIFT_M).abs() < 1e-6);
        assert!((grid.transform.origin_y - ORIGIN_SHIFT_M).abs() < 1e-6);
        assert!(grid.transform.pixel_height < 0.0);
    }

    #[test]
    fn test_grid_rounds_up_partial_pixels() {
        // A zoom 15 tile is ~1222.99 m wide: 408 pixels of 3 m
        let tile = TileCoord {
            row: 12000,
            col: 17000,
            zoom: 15,
        };
        let grid = GridSpec::for_tile(&tile, PixelSize::default()).unwrap();
        assert_eq!(grid.width, 408);
        assert_eq!(grid.height, 408);
    }

    #[test]
    fn test_grid_rejects_zero_pixel_size() {
        let tile = TileCoord {
            row: 0,
            col: 0,
            zoom: 1,
        };
        let result = GridSpec::for_tile(&tile, PixelSize { x: 0.0, y: -3.0 });
        assert!(matches!(result, Err(RasterError::InvalidGrid(_))));
    }

    #[test]
    fn test_grid_rejects_oversized_tiles() {
        // 3 m pixels: zoom 5 would need ~417k x 417k pixels
        for zoom in [0, 5] {
            let tile = TileCoord { row: 0, col: 0, zoom };
            let result = GridSpec::for_tile(&tile, PixelSize::default());
            assert!(matches!(result, Err(RasterError::InvalidGrid(_))), "zoom {zoom}");
        }
        // 8192 x 8192 is within the limit
        let tile = TileCoord { row: 0, col: 0, zoom: 0 };
        let pixel = 2.0 * ORIGIN_SHIFT_M / 8192.0;
        let grid = GridSpec::for_tile(&tile, PixelSize { x: pixel, y: -pixel }).unwrap();
        assert_eq!((grid.width, grid.height), (8192, 8192));
    }

    #[test]
    fn test_raster_dimensions_and_bounds() {
        let grid = GridSpec {
            transform: GeoTransform::new(0.0, 30.0, 10.0, -10.0),
            width: 4,
            height: 3,
        };
        let raster = Raster::filled(&grid, 2, PixelType::U8, 0.0);
        assert_eq!(raster.width(), 4);
        assert_eq!(raster.height(), 3);
        assert_eq!(raster.band_count(), 2);
        let b = raster.bounds();
        assert_eq!((b.left, b.bottom, b.right, b.top), (0.0, 0.0, 40.0, 30.0));
    }

    #[test]
    fn test_quantize() {
        assert_eq!(PixelType::U8.quantize(300.0), 255.0);
        assert_eq!(PixelType::U8.quantize(1.6), 2.0);
        assert_eq!(PixelType::U16.quantize(-4.0), 0.0);
        assert_eq!(PixelType::F32.quantize(0.25), 0.25);
    }

    #[test]
    fn test_double_close_is_silent() {
        let grid = GridSpec {
            transform: GeoTransform::new(0.0, 0.0, 1.0, -1.0),
            width: 1,
            height: 1,
        };
        let mut dataset = SourceDataset::from_raster("udm", Raster::filled(&grid, 1, PixelType::U8, 0.0));
        assert!(dataset.raster().is_ok());
        dataset.close();
        dataset.close();
        assert!(!dataset.is_open());
        assert!(matches!(dataset.raster(), Err(RasterError::Closed(_))));
    }
}

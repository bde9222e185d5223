//! Resampling a source raster onto a target grid.

use super::{GridSpec, Raster, RasterError, Reprojector};

/// Resampling kernel.
///
/// Categorical layers (labels, quality flags) must use [`Resampling::Nearest`]
/// so no new class values are invented between neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resampling {
    #[default]
    Nearest,
    Bilinear,
}

impl Resampling {
    /// Kernel for a layer: nearest for categorical data, bilinear otherwise.
    pub fn for_layer(is_label: bool) -> Self {
        if is_label {
            Resampling::Nearest
        } else {
            Resampling::Bilinear
        }
    }
}

/// Resamples `src` onto `grid`.
///
/// `grid` is in Web Mercator; each target pixel centre is projected into
/// the source CRS before it is looked up. Target pixels outside the source
/// extent, or whose source pixel is no-data, are filled with `nodata`
/// (falling back to the source's own no-data value, then 0). The output
/// carries the effective no-data value.
pub fn resample(
    src: &Raster,
    grid: &GridSpec,
    method: Resampling,
    nodata: Option<f64>,
) -> Result<Raster, RasterError> {
    let reprojector = Reprojector::from_web_mercator(src.crs())?;
    let nodata = nodata.or(src.nodata());
    let fill = nodata.unwrap_or(0.0) as f32;
    let bands = src.band_count();
    let mut out = Raster::filled(grid, bands, src.pixel_type(), fill).with_nodata(nodata);

    let width = src.width() as isize;
    let height = src.height() as isize;
    let src_t = *src.transform();
    let pixel_type = src.pixel_type();

    for row in 0..grid.height {
        for col in 0..grid.width {
            let (x, y) = grid.transform.pixel_center(col, row);
            let Some((sx, sy)) = reprojector.project(x, y) else {
                continue;
            };
            let (fc, fr) = src_t.to_pixel(sx, sy);
            let (nc, nr) = (fc.floor() as isize, fr.floor() as isize);
            if nc < 0 || nr < 0 || nc >= width || nr >= height {
                continue;
            }
            let (nc, nr) = (nc as usize, nr as usize);

            for band in 0..bands {
                let nearest = src.data()[[band, nr, nc]];
                if src.is_nodata(nearest) {
                    continue;
                }
                let value = match method {
                    Resampling::Nearest => nearest,
                    Resampling::Bilinear => {
                        bilinear(src, band, fc, fr).map_or(nearest, |v| pixel_type.quantize(v))
                    }
                };
                out.data_mut()[[band, row, col]] = value;
            }
        }
    }

    Ok(out)
}

/// Bilinear interpolation at fractional pixel position `(fc, fr)`.
///
/// Neighbours are clamped to the raster edge. Returns `None` when any
/// neighbour is no-data so the caller can fall back to nearest.
fn bilinear(src: &Raster, band: usize, fc: f64, fr: f64) -> Option<f64> {
    let max_c = src.width() as isize - 1;
    let max_r = src.height() as isize - 1;

    let x = fc - 0.5;
    let y = fr - 0.5;
    let c0 = x.floor();
    let r0 = y.floor();
    let tx = x - c0;
    let ty = y - r0;

    let clamp_c = |c: f64| (c as isize).clamp(0, max_c) as usize;
    let clamp_r = |r: f64| (r as isize).clamp(0, max_r) as usize;
    let (c0i, c1i) = (clamp_c(c0), clamp_c(c0 + 1.0));
    let (r0i, r1i) = (clamp_r(r0), clamp_r(r0 + 1.0));

    let data = src.data();
    let sample = |r: usize, c: usize| -> Option<f64> {
        let v = data[[band, r, c]];
        (!src.is_nodata(v)).then_some(v as f64)
    };

    let v00 = sample(r0i, c0i)?;
    let v01 = sample(r0i, c1i)?;
    let v10 = sample(r1i, c0i)?;
    let v11 = sample(r1i, c1i)?;

    let top = v00 * (1.0 - tx) + v01 * tx;
    let bottom = v10 * (1.0 - tx) + v11 * tx;
    Some(top * (1.0 - ty) + bottom * ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{lon_lat_to_meters, tile_xy_bounds, to_tile_coords};
    use crate::raster::{Crs, GeoTransform, PixelSize, PixelType};
    use ndarray::{array, Array3};

    fn source() -> Raster {
        // 2x2 source, 10 m pixels, covering x 0..20, y 0..20
        let data = Array3::from_shape_vec((1, 2, 2), vec![0.0, 100.0, 200.0, 255.0]).unwrap();
        Raster::new(data, GeoTransform::new(0.0, 20.0, 10.0, -10.0), PixelType::U8)
    }

    fn grid(origin_x: f64, origin_y: f64, pixel: f64, size: usize) -> GridSpec {
        GridSpec {
            transform: GeoTransform::new(origin_x, origin_y, pixel, -pixel),
            width: size,
            height: size,
        }
    }

    #[test]
    fn test_nearest_upsample_copies_blocks() {
        let out = resample(&source(), &grid(0.0, 20.0, 5.0, 4), Resampling::Nearest, None).unwrap();
        assert_eq!(
            out.band(0),
            array![
                [0.0f32, 0.0, 100.0, 100.0],
                [0.0, 0.0, 100.0, 100.0],
                [200.0, 200.0, 255.0, 255.0],
                [200.0, 200.0, 255.0, 255.0]
            ]
        );
    }

    #[test]
    fn test_nearest_never_invents_values() {
        let out = resample(&source(), &grid(0.0, 20.0, 3.0, 6), Resampling::Nearest, None).unwrap();
        for v in out.band(0).iter() {
            assert!([0.0, 100.0, 200.0, 255.0].contains(v));
        }
    }

    #[test]
    fn test_outside_extent_gets_nodata_fill() {
        let out = resample(&source(), &grid(-10.0, 20.0, 10.0, 2), Resampling::Nearest, Some(1.0)).unwrap();
        assert_eq!(out.nodata(), Some(1.0));
        assert_eq!(out.band(0), array![[1.0f32, 0.0], [1.0, 200.0]]);
    }

    #[test]
    fn test_outside_extent_defaults_to_zero() {
        let out = resample(&source(), &grid(100.0, 100.0, 10.0, 2), Resampling::Bilinear, None).unwrap();
        assert!(out.band(0).iter().all(|&v| v == 0.0));
        assert_eq!(out.nodata(), None);
    }

    #[test]
    fn test_bilinear_interpolates_between_centres() {
        // Target pixel centred on x=10, y=10: equidistant from all four centres
        let out = resample(&source(), &grid(9.0, 11.0, 2.0, 1), Resampling::Bilinear, None).unwrap();
        assert_eq!(out.band(0)[[0, 0]], ((0.0 + 100.0 + 200.0 + 255.0) / 4.0f64).round() as f32);
    }

    #[test]
    fn test_bilinear_falls_back_to_nearest_next_to_nodata() {
        let src = source().with_nodata(Some(0.0));
        let out = resample(&src, &grid(9.0, 11.0, 2.0, 1), Resampling::Bilinear, None).unwrap();
        // Nearest source pixel for centre (10, 10) is row 1, col 1
        assert_eq!(out.band(0)[[0, 0]], 255.0);
    }

    #[test]
    fn test_source_nodata_propagates() {
        let src = source().with_nodata(Some(100.0));
        let out = resample(&src, &grid(10.0, 20.0, 10.0, 1), Resampling::Nearest, Some(1.0)).unwrap();
        assert_eq!(out.band(0)[[0, 0]], 1.0);
    }

    #[test]
    fn test_kernel_for_layer() {
        assert_eq!(Resampling::for_layer(true), Resampling::Nearest);
        assert_eq!(Resampling::for_layer(false), Resampling::Bilinear);
    }

    /// Zone 33 UTM source around 15°E 45°N, 10 m pixels, value 10 west of
    /// the central meridian and 20 east of it.
    fn utm_source() -> Raster {
        let (size, pixel) = (400, 10.0);
        let (west, north) = (500_000.0 - 2_000.0, 4_982_950.0 + 2_000.0);
        let data = Array3::from_shape_fn((1, size, size), |(_, _, c)| {
            if (c as f64 + 0.5) * pixel < 2_000.0 {
                10.0
            } else {
                20.0
            }
        });
        Raster::new(data, GeoTransform::new(west, north, pixel, -pixel), PixelType::U16).with_crs(
            Crs::Utm {
                zone: 33,
                south: false,
            },
        )
    }

    #[test]
    fn test_utm_source_is_reprojected_onto_tile() {
        let tile = to_tile_coords(45.0, 15.0, 15).unwrap();
        let grid = GridSpec::for_tile(&tile, PixelSize { x: 30.0, y: -30.0 }).unwrap();
        let out = resample(&utm_source(), &grid, Resampling::Nearest, Some(0.0)).unwrap();

        // The whole tile lies inside the 4 km source square
        assert!(out.band(0).iter().all(|&v| v == 10.0 || v == 20.0));

        // Pixels either side of 15°E take the matching half of the source
        let (meridian_x, _) = lon_lat_to_meters(15.0, 45.0);
        let b = tile_xy_bounds(&tile);
        let meridian_col = ((meridian_x - b.left) / 30.0) as usize;
        let row = grid.height / 2;
        assert_eq!(out.band(0)[[row, 0]], 10.0);
        assert_eq!(out.band(0)[[row, meridian_col - 1]], 10.0);
        assert_eq!(out.band(0)[[row, meridian_col + 1]], 20.0);
        assert_eq!(out.band(0)[[row, grid.width - 1]], 20.0);
        assert_eq!(out.crs(), Crs::WebMercator);
    }

    #[test]
    fn test_utm_source_elsewhere_leaves_nodata() {
        let tile = to_tile_coords(10.0, 15.0, 15).unwrap();
        let grid = GridSpec::for_tile(&tile, PixelSize { x: 100.0, y: -100.0 }).unwrap();
        let out = resample(&utm_source(), &grid, Resampling::Bilinear, Some(1.0)).unwrap();
        assert!(out.band(0).iter().all(|&v| v == 1.0));
    }
}

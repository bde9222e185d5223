//! Burning vector shapes into a raster grid.

use super::{GridSpec, PixelType, Raster};
use crate::geometry::ProjectedShape;

/// Rasterizes `shape` onto `grid` as a single-band `u8` raster.
///
/// Pixels whose centre lies inside a polygon (even-odd rule over all of its
/// rings, so holes stay empty) are set to `burn`. Lines and points burn
/// every pixel they pass through. Everything else is 0.
pub fn rasterize(shape: &ProjectedShape, grid: &GridSpec, burn: u8) -> Raster {
    let mut raster = Raster::filled(grid, 1, PixelType::U8, 0.0);
    let burn = burn as f32;
    let t = grid.transform;

    {
        let mut band = raster.band_mut(0);

        for polygon in &shape.polygons {
            let mut crossings = Vec::new();
            for row in 0..grid.height {
                let (_, y) = t.pixel_center(0, row);
                crossings.clear();
                for ring in polygon {
                    for (a, b) in ring.iter().zip(ring.iter().cycle().skip(1)) {
                        if (a.1 <= y) != (b.1 <= y) {
                            crossings.push(a.0 + (y - a.1) / (b.1 - a.1) * (b.0 - a.0));
                        }
                    }
                }
                crossings.sort_by(|p, q| p.total_cmp(q));

                for span in crossings.chunks_exact(2) {
                    let start = ((span[0] - t.origin_x) / t.pixel_width - 0.5).ceil();
                    let end = ((span[1] - t.origin_x) / t.pixel_width - 0.5).ceil();
                    let start = start.max(0.0) as usize;
                    let end = end.clamp(0.0, grid.width as f64) as usize;
                    for col in start..end {
                        band[[row, col]] = burn;
                    }
                }
            }
        }

        let mut burn_point = |x: f64, y: f64| {
            let (fc, fr) = t.to_pixel(x, y);
            let (c, r) = (fc.floor(), fr.floor());
            if c >= 0.0 && r >= 0.0 && (c as usize) < grid.width && (r as usize) < grid.height {
                band[[r as usize, c as usize]] = burn;
            }
        };

        let step = t.pixel_width.abs().min(t.pixel_height.abs()) / 2.0;
        for line in &shape.lines {
            if let [only] = line.as_slice() {
                burn_point(only.0, only.1);
            }
            for pair in line.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                let length = (b.0 - a.0).hypot(b.1 - a.1);
                let steps = (length / step).ceil().max(1.0) as usize;
                for i in 0..=steps {
                    let f = i as f64 / steps as f64;
                    burn_point(a.0 + f * (b.0 - a.0), a.1 + f * (b.1 - a.1));
                }
            }
        }

        for &(x, y) in &shape.points {
            burn_point(x, y);
        }
    }

    raster
}

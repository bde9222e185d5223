//! Coordinate reference systems of delivered rasters.
//!
//! Tile grids are always Web Mercator. Scenes usually arrive in the UTM
//! zone they were captured in, so resampling maps every tile pixel centre
//! into the source CRS through [`Reprojector`].

use proj4rs::proj::Proj;

use super::RasterError;
use crate::coord::meters_to_lon_lat;

/// EPSG code for Web Mercator.
pub const EPSG_WEB_MERCATOR: u32 = 3857;

/// EPSG code for WGS84 longitude/latitude.
pub const EPSG_WGS84: u32 = 4326;

const EPSG_UTM_NORTH: u32 = 32600;
const EPSG_UTM_SOUTH: u32 = 32700;

/// Supported raster CRS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Crs {
    #[default]
    WebMercator,
    /// WGS84 longitude/latitude in degrees.
    Wgs84,
    /// WGS84 / UTM, EPSG:326xx (north) and EPSG:327xx (south).
    Utm { zone: u8, south: bool },
}

impl Crs {
    pub fn from_epsg(code: u32) -> Result<Self, RasterError> {
        match code {
            EPSG_WEB_MERCATOR => Ok(Crs::WebMercator),
            EPSG_WGS84 => Ok(Crs::Wgs84),
            c if (EPSG_UTM_NORTH + 1..=EPSG_UTM_NORTH + 60).contains(&c) => Ok(Crs::Utm {
                zone: (c - EPSG_UTM_NORTH) as u8,
                south: false,
            }),
            c if (EPSG_UTM_SOUTH + 1..=EPSG_UTM_SOUTH + 60).contains(&c) => Ok(Crs::Utm {
                zone: (c - EPSG_UTM_SOUTH) as u8,
                south: true,
            }),
            other => Err(RasterError::UnsupportedCrs(other)),
        }
    }

    pub fn epsg(&self) -> u32 {
        match self {
            Crs::WebMercator => EPSG_WEB_MERCATOR,
            Crs::Wgs84 => EPSG_WGS84,
            Crs::Utm { zone, south: false } => EPSG_UTM_NORTH + u32::from(*zone),
            Crs::Utm { zone, south: true } => EPSG_UTM_SOUTH + u32::from(*zone),
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Wgs84)
    }

    fn proj_string(&self) -> Option<String> {
        match self {
            Crs::WebMercator | Crs::Wgs84 => None,
            Crs::Utm { zone, south } => Some(format!(
                "+proj=utm +zone={}{} +datum=WGS84 +units=m +no_defs",
                zone,
                if *south { " +south" } else { "" }
            )),
        }
    }
}

const WGS84_PROJ: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// Maps Web Mercator metres into a target CRS.
///
/// Web Mercator is inverted to WGS84 degrees analytically; projected
/// targets go through `proj4rs` on the same datum, so no datum shift is
/// involved.
pub struct Reprojector {
    target: Crs,
    projection: Option<(Proj, Proj)>,
}

impl std::fmt::Debug for Reprojector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reprojector")
            .field("target", &self.target)
            .finish()
    }
}

impl Reprojector {
    /// Reprojector from Web Mercator into `target`.
    pub fn from_web_mercator(target: Crs) -> Result<Self, RasterError> {
        let projection = match target.proj_string() {
            Some(definition) => {
                let from = Proj::from_proj_string(WGS84_PROJ)
                    .map_err(|e| RasterError::Projection(e.to_string()))?;
                let to = Proj::from_proj_string(&definition)
                    .map_err(|e| RasterError::Projection(e.to_string()))?;
                Some((from, to))
            }
            None => None,
        };
        Ok(Self { target, projection })
    }

    pub fn target(&self) -> Crs {
        self.target
    }

    /// Whether points pass through unchanged.
    pub fn is_identity(&self) -> bool {
        self.target == Crs::WebMercator
    }

    /// Projects a Web Mercator point; `None` when it has no image in the
    /// target CRS.
    pub fn project(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if self.is_identity() {
            return Some((x, y));
        }
        let (lon, lat) = meters_to_lon_lat(x, y);
        let Some((from, to)) = &self.projection else {
            return Some((lon, lat));
        };

        let mut point = (lon.to_radians(), lat.to_radians(), 0.0);
        proj4rs::transform::transform(from, to, &mut point).ok()?;
        (point.0.is_finite() && point.1.is_finite()).then_some((point.0, point.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::lon_lat_to_meters;

    #[test]
    fn test_epsg_codes() {
        assert_eq!(Crs::from_epsg(3857).unwrap(), Crs::WebMercator);
        assert_eq!(Crs::from_epsg(4326).unwrap(), Crs::Wgs84);
        assert_eq!(
            Crs::from_epsg(32633).unwrap(),
            Crs::Utm {
                zone: 33,
                south: false
            }
        );
        assert_eq!(
            Crs::from_epsg(32719).unwrap(),
            Crs::Utm {
                zone: 19,
                south: true
            }
        );
        for code in [3857, 4326, 32601, 32660, 32701, 32760] {
            assert_eq!(Crs::from_epsg(code).unwrap().epsg(), code);
        }
    }

    #[test]
    fn test_unknown_codes_rejected() {
        for code in [2154, 32600, 32661, 32700, 0] {
            assert!(matches!(
                Crs::from_epsg(code),
                Err(RasterError::UnsupportedCrs(c)) if c == code
            ));
        }
    }

    #[test]
    fn test_web_mercator_is_identity() {
        let reprojector = Reprojector::from_web_mercator(Crs::WebMercator).unwrap();
        assert!(reprojector.is_identity());
        assert_eq!(reprojector.project(12.5, -7.0), Some((12.5, -7.0)));
    }

    #[test]
    fn test_wgs84_target_gives_degrees() {
        let reprojector = Reprojector::from_web_mercator(Crs::Wgs84).unwrap();
        let (x, y) = lon_lat_to_meters(-105.0, 40.0);
        let (lon, lat) = reprojector.project(x, y).unwrap();
        assert!((lon + 105.0).abs() < 1e-9);
        assert!((lat - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_utm_central_meridian() {
        // 15°E is the central meridian of zone 33: easting 500 km, and the
        // northing is the scaled meridian arc to 45°N
        let reprojector = Reprojector::from_web_mercator(Crs::Utm {
            zone: 33,
            south: false,
        })
        .unwrap();
        let (x, y) = lon_lat_to_meters(15.0, 45.0);
        let (easting, northing) = reprojector.project(x, y).unwrap();
        assert!((easting - 500_000.0).abs() < 0.01, "easting {easting}");
        assert!((northing - 4_982_950.4).abs() < 1.0, "northing {northing}");
    }

    #[test]
    fn test_utm_south_false_northing() {
        let reprojector = Reprojector::from_web_mercator(Crs::Utm {
            zone: 19,
            south: true,
        })
        .unwrap();
        let (x, y) = lon_lat_to_meters(-69.0, -0.0001);
        let (easting, northing) = reprojector.project(x, y).unwrap();
        assert!((easting - 500_000.0).abs() < 0.01);
        assert!((northing - 10_000_000.0).abs() < 20.0, "northing {northing}");
    }
}

//! GeoJSON feature collections.
//!
//! Target geometries arrive as GeoJSON `FeatureCollection` documents. The
//! types here deserialize them, keep any unknown members so a collection
//! written back into a manifest round-trips, and answer the two questions
//! the pipelines ask of a geometry: its bounding box and its shape in Web
//! Mercator metres.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::coord::{lon_lat_to_meters, LngLatBbox};

/// A position: `[lon, lat]` with an optional trailing altitude.
pub type Position = Vec<f64>;

/// Errors raised while reading GeoJSON.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// The document is not a valid feature collection
    #[error("Invalid GeoJSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// A position has fewer than two ordinates
    #[error("Invalid position: expected [lon, lat], got {0} values")]
    InvalidPosition(usize),

    /// The collection holds no coordinates at all
    #[error("Feature collection has no coordinates")]
    Empty,
}

/// GeoJSON geometry object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<Geometry> },
}

/// A geometry projected to Web Mercator metres, grouped by how it burns
/// into a raster.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectedShape {
    /// Polygons as lists of rings (exterior first, then holes).
    pub polygons: Vec<Vec<Vec<(f64, f64)>>>,
    /// Line strings as vertex lists.
    pub lines: Vec<Vec<(f64, f64)>>,
    /// Isolated points.
    pub points: Vec<(f64, f64)>,
}

impl ProjectedShape {
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty() && self.lines.is_empty() && self.points.is_empty()
    }

    fn extend(&mut self, other: ProjectedShape) {
        self.polygons.extend(other.polygons);
        self.lines.extend(other.lines);
        self.points.extend(other.points);
    }
}

fn lon_lat(position: &Position) -> Result<(f64, f64), GeometryError> {
    match position.as_slice() {
        [lon, lat, ..] => Ok((*lon, *lat)),
        other => Err(GeometryError::InvalidPosition(other.len())),
    }
}

fn project_ring(ring: &[Position]) -> Result<Vec<(f64, f64)>, GeometryError> {
    ring.iter()
        .map(|p| lon_lat(p).map(|(lon, lat)| lon_lat_to_meters(lon, lat)))
        .collect()
}

impl Geometry {
    /// Visits every position in the geometry.
    fn for_each_position<F>(&self, f: &mut F) -> Result<(), GeometryError>
    where
        F: FnMut(f64, f64),
    {
        let mut visit = |p: &Position| -> Result<(), GeometryError> {
            let (lon, lat) = lon_lat(p)?;
            f(lon, lat);
            Ok(())
        };

        match self {
            Geometry::Point { coordinates } => visit(coordinates)?,
            Geometry::MultiPoint { coordinates } | Geometry::LineString { coordinates } => {
                for p in coordinates {
                    visit(p)?;
                }
            }
            Geometry::MultiLineString { coordinates } | Geometry::Polygon { coordinates } => {
                for p in coordinates.iter().flatten() {
                    visit(p)?;
                }
            }
            Geometry::MultiPolygon { coordinates } => {
                for p in coordinates.iter().flatten().flatten() {
                    visit(p)?;
                }
            }
            Geometry::GeometryCollection { geometries } => {
                for g in geometries {
                    g.for_each_position(f)?;
                }
            }
        }
        Ok(())
    }

    /// Bounding box of the geometry, or `None` when it has no positions.
    pub fn bounds(&self) -> Result<Option<LngLatBbox>, GeometryError> {
        let mut bbox: Option<LngLatBbox> = None;
        self.for_each_position(&mut |lon, lat| {
            let point = LngLatBbox::new(lon, lat, lon, lat);
            bbox = Some(match bbox {
                Some(b) => b.union(&point),
                None => point,
            });
        })?;
        Ok(bbox)
    }

    /// Projects the geometry to Web Mercator metres.
    pub fn project_mercator(&self) -> Result<ProjectedShape, GeometryError> {
        let mut shape = ProjectedShape::default();
        match self {
            Geometry::Point { coordinates } => {
                let (lon, lat) = lon_lat(coordinates)?;
                shape.points.push(lon_lat_to_meters(lon, lat));
            }
            Geometry::MultiPoint { coordinates } => {
                shape.points = project_ring(coordinates)?;
            }
            Geometry::LineString { coordinates } => {
                shape.lines.push(project_ring(coordinates)?);
            }
            Geometry::MultiLineString { coordinates } => {
                for line in coordinates {
                    shape.lines.push(project_ring(line)?);
                }
            }
            Geometry::Polygon { coordinates } => {
                let rings = coordinates
                    .iter()
                    .map(|r| project_ring(r))
                    .collect::<Result<Vec<_>, _>>()?;
                shape.polygons.push(rings);
            }
            Geometry::MultiPolygon { coordinates } => {
                for polygon in coordinates {
                    let rings = polygon
                        .iter()
                        .map(|r| project_ring(r))
                        .collect::<Result<Vec<_>, _>>()?;
                    shape.polygons.push(rings);
                }
            }
            Geometry::GeometryCollection { geometries } => {
                for g in geometries {
                    shape.extend(g.project_mercator()?);
                }
            }
        }
        Ok(shape)
    }
}

fn feature_type() -> String {
    "Feature".to_string()
}

fn feature_collection_type() -> String {
    "FeatureCollection".to_string()
}

/// GeoJSON feature. A `null` geometry is allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub foreign_members: Map<String, Value>,
}

impl Feature {
    /// Creates a feature with the given geometry and no properties.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            kind: feature_type(),
            id: None,
            geometry: Some(geometry),
            properties: None,
            foreign_members: Map::new(),
        }
    }

    /// Looks up a string property.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.as_ref()?.get(key)?.as_str()
    }
}

/// GeoJSON feature collection: one logical target.
///
/// Members other than `type` and `features` (`name`, `crs`, ...) are kept
/// in `foreign_members`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    #[serde(rename = "type", default = "feature_collection_type")]
    pub kind: String,
    pub features: Vec<Feature>,
    #[serde(flatten)]
    pub foreign_members: Map<String, Value>,
}

impl FeatureSet {
    /// Creates a collection from features.
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: feature_collection_type(),
            features,
            foreign_members: Map::new(),
        }
    }

    /// Parses a collection from raw GeoJSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, GeometryError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Optional `name` member.
    pub fn name(&self) -> Option<&str> {
        self.foreign_members.get("name")?.as_str()
    }

    /// Looks up a string foreign member.
    pub fn member_str(&self, key: &str) -> Option<&str> {
        self.foreign_members.get(key)?.as_str()
    }

    /// Bounding box over every feature geometry.
    ///
    /// Fails with [`GeometryError::Empty`] when no feature carries a
    /// coordinate.
    pub fn bounds(&self) -> Result<LngLatBbox, GeometryError> {
        let mut bbox: Option<LngLatBbox> = None;
        for geometry in self.features.iter().filter_map(|f| f.geometry.as_ref()) {
            if let Some(b) = geometry.bounds()? {
                bbox = Some(match bbox {
                    Some(acc) => acc.union(&b),
                    None => b,
                });
            }
        }
        bbox.ok_or(GeometryError::Empty)
    }

    /// All feature geometries projected to Web Mercator metres.
    pub fn project_mercator(&self) -> Result<ProjectedShape, GeometryError> {
        let mut shape = ProjectedShape::default();
        for geometry in self.features.iter().filter_map(|f| f.geometry.as_ref()) {
            shape.extend(geometry.project_mercator()?);
        }
        Ok(shape)
    }
}

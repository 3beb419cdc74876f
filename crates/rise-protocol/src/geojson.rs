//! GeoJSON types for location geometries and feature output.
//!
//! The same [`Geometry`] type is used to read `locationCoordinates` from the
//! upstream API and to write the `geometry` member of output features.
//!
//! See: <https://datatracker.ietf.org/doc/html/rfc7946>

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{RiseError, RiseResult};

/// A GeoJSON position: `[x, y]` or `[x, y, z]`.
pub type Position = Vec<f64>;

/// GeoJSON geometry types a location can carry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        coordinates: Position,
    },
    MultiPoint {
        coordinates: Vec<Position>,
    },
    LineString {
        coordinates: Vec<Position>,
    },
    MultiLineString {
        coordinates: Vec<Vec<Position>>,
    },
    /// First ring is the exterior, the rest are holes.
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
}

impl Geometry {
    /// Create a 2D point geometry.
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point {
            coordinates: vec![x, y],
        }
    }

    /// Create a polygon geometry from rings of `(x, y)` pairs.
    pub fn polygon(rings: Vec<Vec<(f64, f64)>>) -> Self {
        Geometry::Polygon {
            coordinates: rings
                .into_iter()
                .map(|ring| ring.into_iter().map(|(x, y)| vec![x, y]).collect())
                .collect(),
        }
    }

    /// The GeoJSON type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point { .. } => "Point",
            Geometry::MultiPoint { .. } => "MultiPoint",
            Geometry::LineString { .. } => "LineString",
            Geometry::MultiLineString { .. } => "MultiLineString",
            Geometry::Polygon { .. } => "Polygon",
            Geometry::MultiPolygon { .. } => "MultiPolygon",
        }
    }

    /// Convert to a `geo` geometry for spatial predicates.
    ///
    /// Only the first two ordinates of each position are used.
    pub fn to_geo(&self) -> RiseResult<geo::Geometry<f64>> {
        let geometry = match self {
            Geometry::Point { coordinates } => geo::Geometry::Point(geo::Point(coord(coordinates)?)),
            Geometry::MultiPoint { coordinates } => geo::Geometry::MultiPoint(geo::MultiPoint(
                coordinates
                    .iter()
                    .map(|p| coord(p).map(geo::Point))
                    .collect::<RiseResult<_>>()?,
            )),
            Geometry::LineString { coordinates } => {
                geo::Geometry::LineString(line_string(coordinates)?)
            }
            Geometry::MultiLineString { coordinates } => {
                geo::Geometry::MultiLineString(geo::MultiLineString(
                    coordinates
                        .iter()
                        .map(|line| line_string(line))
                        .collect::<RiseResult<_>>()?,
                ))
            }
            Geometry::Polygon { coordinates } => geo::Geometry::Polygon(polygon(coordinates)?),
            Geometry::MultiPolygon { coordinates } => geo::Geometry::MultiPolygon(
                geo::MultiPolygon(
                    coordinates
                        .iter()
                        .map(|rings| polygon(rings))
                        .collect::<RiseResult<_>>()?,
                ),
            ),
        };
        Ok(geometry)
    }
}

fn coord(position: &[f64]) -> RiseResult<geo::Coord<f64>> {
    match position {
        [x, y, ..] => Ok(geo::Coord { x: *x, y: *y }),
        _ => Err(RiseError::malformed(format!(
            "position needs at least two ordinates, got {:?}",
            position
        ))),
    }
}

fn line_string(positions: &[Position]) -> RiseResult<geo::LineString<f64>> {
    Ok(geo::LineString(
        positions
            .iter()
            .map(|p| coord(p))
            .collect::<RiseResult<_>>()?,
    ))
}

fn polygon(rings: &[Vec<Position>]) -> RiseResult<geo::Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| line_string(ring));
    let exterior = match rings.next() {
        Some(ring) => ring?,
        None => geo::LineString(Vec::new()),
    };
    let interiors = rings.collect::<RiseResult<Vec<_>>>()?;
    Ok(geo::Polygon::new(exterior, interiors))
}

/// Feature identifier: the location's numeric `_id`, or a string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FeatureId {
    Number(i64),
    String(String),
}

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureId::Number(n) => write!(f, "{}", n),
            FeatureId::String(s) => write!(f, "{}", s),
        }
    }
}

/// A GeoJSON Feature for one location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: String,

    pub id: FeatureId,

    /// `null` when geometry output is skipped.
    pub geometry: Option<Geometry>,

    pub properties: Map<String, Value>,
}

impl Feature {
    /// Create a new feature.
    pub fn new(id: FeatureId, geometry: Option<Geometry>, properties: Map<String, Value>) -> Self {
        Self {
            type_: "Feature".to_string(),
            id,
            geometry,
            properties,
        }
    }

    /// Look up a property value.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

/// A GeoJSON FeatureCollection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCollection {
    /// Type identifier (always "FeatureCollection").
    #[serde(rename = "type")]
    pub type_: String,

    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            type_: "FeatureCollection".to_string(),
            features,
        }
    }
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Result of GeoJSON serialization: a collection, or a single feature for
/// point lookups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum GeoJsonOutput {
    Feature(Feature),
    FeatureCollection(FeatureCollection),
}

impl GeoJsonOutput {
    /// Number of features in the output.
    pub fn len(&self) -> usize {
        match self {
            GeoJsonOutput::Feature(_) => 1,
            GeoJsonOutput::FeatureCollection(fc) => fc.features.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the contained features.
    pub fn features(&self) -> Vec<&Feature> {
        match self {
            GeoJsonOutput::Feature(f) => vec![f],
            GeoJsonOutput::FeatureCollection(fc) => fc.features.iter().collect(),
        }
    }
}

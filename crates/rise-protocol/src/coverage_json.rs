//! CoverageJSON types for location time series.
//!
//! Each coverage describes one catalog item at one location: a point or
//! polygon domain plus a time axis, and a single float range along `t`.
//!
//! See: <https://covjson.org/>

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::geojson::Position;
use crate::parameters::{I18nString, ObservedProperty, ParameterMetadata, Unit};

/// CRS84 longitude/latitude.
pub const CRS84: &str = "http://www.opengis.net/def/crs/OGC/1.3/CRS84";

/// A collection of coverages sharing parameters and referencing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoverageCollection {
    /// Type identifier (always "CoverageCollection").
    #[serde(rename = "type")]
    pub type_: String,

    pub parameters: BTreeMap<String, CovJsonParameter>,

    pub referencing: Vec<ReferenceSystemConnection>,

    pub coverages: Vec<Coverage>,
}

impl CoverageCollection {
    /// Create a collection with the default referencing (CRS84 on x/y,
    /// Gregorian on t).
    pub fn new(
        coverages: Vec<Coverage>,
        parameters: BTreeMap<String, CovJsonParameter>,
    ) -> Self {
        Self {
            type_: "CoverageCollection".to_string(),
            parameters,
            referencing: ReferenceSystemConnection::defaults(),
            coverages,
        }
    }
}

/// A single coverage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coverage {
    /// Type identifier (always "Coverage").
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(rename = "domainType")]
    pub domain_type: DomainType,

    pub domain: Domain,

    pub ranges: BTreeMap<String, NdArray>,
}

impl Coverage {
    pub fn new(domain_type: DomainType, domain: Domain, ranges: BTreeMap<String, NdArray>) -> Self {
        Self {
            type_: "Coverage".to_string(),
            domain_type,
            domain,
            ranges,
        }
    }
}

/// Domain types produced for locations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DomainType {
    /// Time series at a point.
    PointSeries,
    /// Time series over a polygon.
    PolygonSeries,
}

/// The domain of a coverage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Domain {
    /// Domain type (always "Domain").
    #[serde(rename = "type")]
    pub type_: String,

    pub axes: BTreeMap<String, Axis>,
}

impl Domain {
    /// Time series at `(x, y)`.
    pub fn point_series(x: f64, y: f64, t_values: Vec<String>) -> Self {
        let mut axes = BTreeMap::new();
        axes.insert("x".to_string(), Axis::floats(vec![x]));
        axes.insert("y".to_string(), Axis::floats(vec![y]));
        axes.insert("t".to_string(), Axis::times(t_values));

        Self {
            type_: "Domain".to_string(),
            axes,
        }
    }

    /// Time series over one or more polygons, each given as its rings.
    pub fn polygon_series(polygons: Vec<Vec<Vec<Position>>>, t_values: Vec<String>) -> Self {
        let mut axes = BTreeMap::new();
        axes.insert(
            "composite".to_string(),
            Axis::Composite {
                data_type: "polygon".to_string(),
                coordinates: vec!["x".to_string(), "y".to_string()],
                values: polygons,
            },
        );
        axes.insert("t".to_string(), Axis::times(t_values));

        Self {
            type_: "Domain".to_string(),
            axes,
        }
    }
}

/// An axis in the domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Axis {
    /// Polygon tuples.
    Composite {
        #[serde(rename = "dataType")]
        data_type: String,
        coordinates: Vec<String>,
        values: Vec<Vec<Vec<Position>>>,
    },
    /// Explicit list of values.
    Values { values: Vec<AxisValue> },
}

impl Axis {
    pub fn floats(values: Vec<f64>) -> Self {
        Axis::Values {
            values: values.into_iter().map(AxisValue::Float).collect(),
        }
    }

    pub fn times(values: Vec<String>) -> Self {
        Axis::Values {
            values: values.into_iter().map(AxisValue::String).collect(),
        }
    }

    /// Get the number of values in this axis.
    pub fn len(&self) -> usize {
        match self {
            Axis::Composite { values, .. } => values.len(),
            Axis::Values { values } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A value on an axis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AxisValue {
    /// Coordinate value.
    Float(f64),
    /// Timestamp.
    String(String),
}

/// Connection between axes and their reference system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceSystemConnection {
    /// Axes that use this reference system.
    pub coordinates: Vec<String>,

    pub system: ReferenceSystem,
}

impl ReferenceSystemConnection {
    /// CRS84 on `x,y` and a Gregorian calendar on `t`.
    pub fn defaults() -> Vec<Self> {
        vec![
            ReferenceSystemConnection {
                coordinates: vec!["x".to_string(), "y".to_string()],
                system: ReferenceSystem::Geographic {
                    id: CRS84.to_string(),
                },
            },
            ReferenceSystemConnection {
                coordinates: vec!["t".to_string()],
                system: ReferenceSystem::Temporal {
                    calendar: "Gregorian".to_string(),
                },
            },
        ]
    }
}

/// Reference system definitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ReferenceSystem {
    #[serde(rename = "GeographicCRS")]
    Geographic { id: String },

    #[serde(rename = "TemporalRS")]
    Temporal { calendar: String },
}

/// A parameter in CoverageJSON format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CovJsonParameter {
    /// Type (always "Parameter").
    #[serde(rename = "type")]
    pub type_: String,

    pub description: I18nString,

    pub unit: Unit,

    #[serde(rename = "observedProperty")]
    pub observed_property: ObservedProperty,
}

impl CovJsonParameter {
    /// Build from upstream metadata for the parameter `id`.
    pub fn from_metadata(id: &str, meta: &ParameterMetadata) -> Self {
        Self {
            type_: "Parameter".to_string(),
            description: I18nString::english(meta.description.clone()),
            unit: Unit::from_symbol(meta.unit.clone()),
            observed_property: ObservedProperty {
                id: id.to_string(),
                label: I18nString::english(meta.title.clone()),
            },
        }
    }
}

/// N-dimensional array containing data values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NdArray {
    /// Type (always "NdArray").
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(rename = "dataType")]
    pub data_type: String,

    #[serde(rename = "axisNames")]
    pub axis_names: Vec<String>,

    pub shape: Vec<usize>,

    /// The data values (null for missing data).
    pub values: Vec<Option<f64>>,
}

impl NdArray {
    /// A float series along the `t` axis.
    pub fn time_series(values: Vec<Option<f64>>) -> Self {
        Self {
            type_: "NdArray".to_string(),
            data_type: "float".to_string(),
            axis_names: vec!["t".to_string()],
            shape: vec![values.len()],
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_point_series_domain() {
        let domain = Domain::point_series(-105.0, 40.0, vec!["2020-01-01".into()]);
        let json = serde_json::to_value(&domain).unwrap();

        assert_eq!(json["type"], "Domain");
        assert_eq!(json["axes"]["x"], json!({"values": [-105.0]}));
        assert_eq!(json["axes"]["y"], json!({"values": [40.0]}));
        assert_eq!(json["axes"]["t"], json!({"values": ["2020-01-01"]}));
    }

    #[test]
    fn test_polygon_series_domain() {
        let ring = vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![0.0, 0.0],
        ];
        let domain = Domain::polygon_series(vec![vec![ring]], vec!["2020-01-01".into()]);
        let json = serde_json::to_value(&domain).unwrap();

        let composite = &json["axes"]["composite"];
        assert_eq!(composite["dataType"], "polygon");
        assert_eq!(composite["coordinates"], json!(["x", "y"]));
        assert_eq!(composite["values"][0][0][1], json!([1.0, 0.0]));
        assert!(json["axes"].get("x").is_none());
    }

    #[test]
    fn test_axis_untagged_deserialize() {
        let axis: Axis = serde_json::from_value(json!({"values": [1.0, 2.0]})).unwrap();
        assert_eq!(axis.len(), 2);

        let axis: Axis = serde_json::from_value(json!({
            "dataType": "polygon",
            "coordinates": ["x", "y"],
            "values": [[[[0.0, 0.0], [1.0, 1.0]]]]
        }))
        .unwrap();
        assert!(matches!(axis, Axis::Composite { .. }));
    }

    #[test]
    fn test_ndarray_time_series() {
        let arr = NdArray::time_series(vec![Some(1.0), None, Some(3.5)]);
        let json = serde_json::to_value(&arr).unwrap();

        assert_eq!(json["type"], "NdArray");
        assert_eq!(json["dataType"], "float");
        assert_eq!(json["axisNames"], json!(["t"]));
        assert_eq!(json["shape"], json!([3]));
        assert_eq!(json["values"], json!([1.0, null, 3.5]));
    }

    #[test]
    fn test_parameter_from_metadata() {
        let meta = ParameterMetadata {
            description: "Lake/Reservoir Storage".into(),
            unit: "af".into(),
            title: "Storage".into(),
        };
        let param = CovJsonParameter::from_metadata("/rise/api/catalog-item/4222", &meta);
        let json = serde_json::to_value(&param).unwrap();

        assert_eq!(
            json,
            json!({
                "type": "Parameter",
                "description": {"en": "Lake/Reservoir Storage"},
                "unit": {"symbol": "af"},
                "observedProperty": {
                    "id": "/rise/api/catalog-item/4222",
                    "label": {"en": "Storage"}
                }
            })
        );
    }

    #[test]
    fn test_collection_referencing() {
        let cc = CoverageCollection::new(Vec::new(), BTreeMap::new());
        let json = serde_json::to_value(&cc).unwrap();

        assert_eq!(json["type"], "CoverageCollection");
        assert_eq!(json["referencing"][0]["system"]["type"], "GeographicCRS");
        assert_eq!(json["referencing"][0]["system"]["id"], CRS84);
        assert_eq!(json["referencing"][1]["coordinates"], json!(["t"]));
        assert_eq!(json["referencing"][1]["system"]["calendar"], "Gregorian");
    }
}

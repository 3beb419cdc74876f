//! JSON:API wire types for the RISE `location/` endpoint.
//!
//! A page body looks like:
//!
//! ```json
//! {
//!   "links": { "self": "...", "next": "..." },
//!   "meta": { "totalItems": 120, "itemsPerPage": 25, "currentPage": 1 },
//!   "data": [ { "id": "/rise/api/location/1", "type": "Location", "attributes": { ... } } ],
//!   "included": [ { "type": "CatalogRecord", ... }, { "type": "CatalogItem", ... } ]
//! }
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::errors::{RiseError, RiseResult};
use crate::geojson::Geometry;

/// A single location resource object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationRecord {
    /// Record identifier, e.g. `/rise/api/location/1`.
    pub id: String,

    #[serde(rename = "type", default)]
    pub type_: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<LocationAttributes>,

    /// Kept verbatim; catalog links are resolved from `included` instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Value>,
}

impl LocationRecord {
    /// The attribute `_id`, if attributes are present.
    pub fn attribute_id(&self) -> Option<i64> {
        self.attributes.as_ref().map(|a| a.id)
    }
}

/// Attributes of a location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationAttributes {
    /// Numeric identifier, exposed as the feature id.
    #[serde(rename = "_id")]
    pub id: i64,

    #[serde(rename = "locationName")]
    pub location_name: String,

    #[serde(rename = "locationCoordinates")]
    pub location_coordinates: Geometry,

    #[serde(
        rename = "locationGeometry",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub location_geometry: Option<Value>,

    /// Elevation in the location's vertical datum. RISE sends numbers,
    /// numeric strings or null.
    #[serde(default, deserialize_with = "deserialize_elevation")]
    pub elevation: Option<f64>,

    #[serde(rename = "updateDate")]
    pub update_date: String,

    /// Any other attribute, carried through to feature properties.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LocationAttributes {
    /// Attribute keys that never appear in feature properties.
    pub const GEOMETRY_KEYS: [&'static str; 2] = ["locationCoordinates", "locationGeometry"];

    /// Serialize with wire names, dropping the geometry attributes.
    pub fn to_property_map(&self) -> RiseResult<Map<String, Value>> {
        let mut map = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            other => {
                return Err(RiseError::malformed(format!(
                    "attributes did not serialize to an object: {}",
                    other
                )))
            }
        };
        for key in Self::GEOMETRY_KEYS {
            map.remove(key);
        }
        Ok(map)
    }
}

fn deserialize_elevation<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawElevation {
        Number(f64),
        Text(String),
    }

    match Option::<RawElevation>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawElevation::Number(n)) => Ok(Some(n)),
        Some(RawElevation::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("elevation '{}' is not numeric", s))),
    }
}

/// Pagination links.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PageLinks {
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
}

/// Pagination metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PageMeta {
    #[serde(rename = "totalItems", default, skip_serializing_if = "Option::is_none")]
    pub total_items: Option<u64>,
    #[serde(rename = "itemsPerPage", default, skip_serializing_if = "Option::is_none")]
    pub items_per_page: Option<u64>,
    #[serde(rename = "currentPage", default, skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u64>,
}

/// A JSON:API resource identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceRef {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
}

/// A relationship whose `data` may be a single identifier or a list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Relationship {
    #[serde(deserialize_with = "one_or_many")]
    pub data: Vec<ResourceRef>,
}

impl Relationship {
    /// The single referenced id, or an error naming the relationship.
    fn exactly_one(&self, owner: &str, name: &str) -> RiseResult<&str> {
        match self.data.as_slice() {
            [only] => Ok(&only.id),
            refs => Err(RiseError::malformed(format!(
                "{} must reference exactly one {}, found {}",
                owner,
                name,
                refs.len()
            ))),
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.data.iter().map(|r| r.id.as_str())
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<ResourceRef>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(ResourceRef),
        Many(Vec<ResourceRef>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(r) => vec![r],
        OneOrMany::Many(refs) => refs,
    })
}

/// Relationships of a catalog record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogRecordRelationships {
    pub location: Relationship,
    #[serde(
        rename = "catalogItems",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub catalog_items: Option<Relationship>,
}

/// Metadata record linking one location to its catalog items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogRecord {
    pub id: String,
    pub relationships: CatalogRecordRelationships,
}

impl CatalogRecord {
    /// The location this record describes.
    pub fn location_id(&self) -> RiseResult<&str> {
        self.relationships
            .location
            .exactly_one(&format!("CatalogRecord '{}'", self.id), "location")
    }

    /// Items enumerated by this record, in order.
    pub fn item_ids(&self) -> impl Iterator<Item = &str> {
        self.relationships
            .catalog_items
            .iter()
            .flat_map(|rel| rel.ids())
    }
}

/// Relationships of a catalog item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogItemRelationships {
    #[serde(rename = "catalogRecord")]
    pub catalog_record: Relationship,
}

/// A single time series, addressable by URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogItem {
    pub id: String,
    pub relationships: CatalogItemRelationships,
}

impl CatalogItem {
    /// The record that owns this item.
    pub fn record_id(&self) -> RiseResult<&str> {
        self.relationships
            .catalog_record
            .exactly_one(&format!("CatalogItem '{}'", self.id), "catalogRecord")
    }
}

/// An entry of the `included` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum IncludedRecord {
    CatalogRecord(CatalogRecord),
    CatalogItem(CatalogItem),
}

impl IncludedRecord {
    pub fn id(&self) -> &str {
        match self {
            IncludedRecord::CatalogRecord(r) => &r.id,
            IncludedRecord::CatalogItem(i) => &i.id,
        }
    }

    /// Check the single-reference relationships.
    pub fn validate(&self) -> RiseResult<()> {
        match self {
            IncludedRecord::CatalogRecord(r) => r.location_id().map(|_| ()),
            IncludedRecord::CatalogItem(i) => i.record_id().map(|_| ()),
        }
    }
}

/// Time series values for one catalog item of a location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParameterResults {
    #[serde(rename = "catalogItemId")]
    pub catalog_item_id: String,

    #[serde(rename = "timeseriesResults")]
    pub timeseries_results: Vec<Option<f64>>,

    #[serde(rename = "timeseriesDates")]
    pub timeseries_dates: Vec<String>,
}

impl ParameterResults {
    /// Results and dates must pair up one to one.
    pub fn validate(&self) -> RiseResult<()> {
        if self.timeseries_results.len() != self.timeseries_dates.len() {
            return Err(RiseError::malformed(format!(
                "catalog item '{}' has {} results but {} dates",
                self.catalog_item_id,
                self.timeseries_results.len(),
                self.timeseries_dates.len()
            )));
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.timeseries_results.is_empty()
    }
}

/// A location joined with its fetched time series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransformedLocationWithResults {
    #[serde(flatten)]
    pub location: LocationRecord,

    #[serde(default)]
    pub parameters: Vec<ParameterResults>,
}

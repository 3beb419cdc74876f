//! Common test fixtures for RISE location tests.
//!
//! Builders here produce raw JSON exactly as the RISE `location/` endpoint
//! returns it, so tests exercise the same deserialization path as production.

use serde_json::{json, Map, Value};

/// Common bounding boxes as (minx, miny, maxx, maxy).
pub mod bbox {
    /// Continental United States
    pub const CONUS: (f64, f64, f64, f64) = (-130.0, 20.0, -60.0, 55.0);

    /// Colorado River basin, roughly
    pub const COLORADO_BASIN: (f64, f64, f64, f64) = (-116.0, 31.0, -105.0, 43.5);

    /// Somewhere with no RISE locations
    pub const MID_ATLANTIC: (f64, f64, f64, f64) = (-40.0, 10.0, -30.0, 20.0);
}

/// Common time values for testing.
pub mod time {
    /// A fixed reference update date.
    pub const REFERENCE_UPDATE: &str = "2020-01-01T00:00:00+00:00";

    /// A date-only instant matching [`REFERENCE_UPDATE`] by prefix.
    pub const REFERENCE_DAY: &str = "2020-01-01";
}

/// Host used in catalog item URLs.
pub const RISE_HOST: &str = "https://data.usbr.gov";

/// `/rise/api/location/{id}`
pub fn location_record_id(id: i64) -> String {
    format!("/rise/api/location/{}", id)
}

/// `/rise/api/catalog-record/{id}`
pub fn catalog_record_id(id: i64) -> String {
    format!("/rise/api/catalog-record/{}", id)
}

/// `/rise/api/catalog-item/{id}`
pub fn catalog_item_id(id: i64) -> String {
    format!("/rise/api/catalog-item/{}", id)
}

/// Builder for a single location resource object.
///
/// ```
/// use test_utils::LocationBuilder;
///
/// let loc = LocationBuilder::new(7).point(-105.0, 40.0).elevation(1500.0).build();
/// assert_eq!(loc["attributes"]["_id"], 7);
/// ```
#[derive(Debug, Clone)]
pub struct LocationBuilder {
    id: i64,
    name: String,
    coordinates: Value,
    elevation: Value,
    update_date: String,
    extra: Map<String, Value>,
    with_attributes: bool,
}

impl LocationBuilder {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            name: format!("Location {}", id),
            coordinates: json!({"type": "Point", "coordinates": [-105.0, 40.0]}),
            elevation: json!(1000.0),
            update_date: time::REFERENCE_UPDATE.to_string(),
            extra: Map::new(),
            with_attributes: true,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn point(mut self, x: f64, y: f64) -> Self {
        self.coordinates = json!({"type": "Point", "coordinates": [x, y]});
        self
    }

    /// A single-ring polygon from `(x, y)` vertices; the ring is closed for you.
    pub fn polygon(mut self, ring: &[(f64, f64)]) -> Self {
        let mut coords: Vec<Value> = ring.iter().map(|(x, y)| json!([x, y])).collect();
        if let Some(first) = coords.first().cloned() {
            coords.push(first);
        }
        self.coordinates = json!({"type": "Polygon", "coordinates": [coords]});
        self
    }

    /// Any raw GeoJSON geometry.
    pub fn geometry(mut self, geometry: Value) -> Self {
        self.coordinates = geometry;
        self
    }

    pub fn elevation(mut self, elevation: f64) -> Self {
        self.elevation = json!(elevation);
        self
    }

    /// Elevation as RISE sometimes sends it: a numeric string.
    pub fn elevation_text(mut self, elevation: &str) -> Self {
        self.elevation = json!(elevation);
        self
    }

    pub fn no_elevation(mut self) -> Self {
        self.elevation = Value::Null;
        self
    }

    pub fn update_date(mut self, date: impl Into<String>) -> Self {
        self.update_date = date.into();
        self
    }

    /// Add an extra attribute.
    pub fn attr(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// Drop the `attributes` member entirely.
    pub fn without_attributes(mut self) -> Self {
        self.with_attributes = false;
        self
    }

    pub fn build(self) -> Value {
        let mut record = json!({
            "id": location_record_id(self.id),
            "type": "Location",
            "relationships": {"catalogRecords": {"data": []}}
        });
        if self.with_attributes {
            let mut attributes = json!({
                "_id": self.id,
                "locationName": self.name,
                "locationCoordinates": self.coordinates.clone(),
                "locationGeometry": self.coordinates,
                "elevation": self.elevation,
                "updateDate": self.update_date
            });
            if let Some(map) = attributes.as_object_mut() {
                map.extend(self.extra);
            }
            record["attributes"] = attributes;
        }
        record
    }
}

/// Shorthand for a default point location.
pub fn location_json(id: i64) -> Value {
    LocationBuilder::new(id).build()
}

/// A `CatalogRecord` entry for `included`.
pub fn catalog_record_json(record_id: &str, location_id: &str, items: &[&str]) -> Value {
    let items: Vec<Value> = items
        .iter()
        .map(|id| json!({"id": id, "type": "CatalogItem"}))
        .collect();
    json!({
        "id": record_id,
        "type": "CatalogRecord",
        "attributes": {"_id": 1},
        "relationships": {
            "location": {"data": [{"id": location_id, "type": "Location"}]},
            "catalogItems": {"data": items}
        }
    })
}

/// A `CatalogItem` entry for `included`.
pub fn catalog_item_json(item_id: &str, record_id: &str) -> Value {
    json!({
        "id": item_id,
        "type": "CatalogItem",
        "attributes": {"_id": 1},
        "relationships": {
            "catalogRecord": {"data": [{"id": record_id, "type": "CatalogRecord"}]}
        }
    })
}

/// A page body with links and meta.
pub fn page_json(page: u64, data: Vec<Value>) -> Value {
    json!({
        "links": {
            "self": format!("/rise/api/location?page={}", page),
            "first": "/rise/api/location?page=1",
        },
        "meta": {
            "totalItems": data.len(),
            "itemsPerPage": 25,
            "currentPage": page
        },
        "data": data
    })
}

/// A page body with an `included` section.
pub fn page_with_included(page: u64, data: Vec<Value>, included: Vec<Value>) -> Value {
    let mut body = page_json(page, data);
    body["included"] = Value::Array(included);
    body
}

/// Parameter metadata as returned by the parameter endpoint.
pub fn parameter_metadata_json(ids: &[&str]) -> Value {
    let mut map = Map::new();
    for (i, id) in ids.iter().enumerate() {
        map.insert(
            id.to_string(),
            json!({
                "description": format!("Parameter {} description", i),
                "x-ogc-unit": "af",
                "title": format!("Parameter {}", i)
            }),
        );
    }
    Value::Object(map)
}

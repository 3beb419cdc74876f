//! GeoJSON serialization of a filtered location response.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

use rise_protocol::queries::{PropertyFilter, SortOrder, SortSpec};
use rise_protocol::{
    Feature, FeatureCollection, FeatureId, FieldsMapping, GeoJsonOutput, LocationRecord,
    RiseError, RiseResult,
};

use crate::response::{require_attributes, LocationResponse};

/// Output shaping for [`to_geojson`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FeatureOptions {
    /// Emit `"geometry": null` instead of the location coordinates.
    #[serde(default)]
    pub skip_geometry: bool,

    /// Property allow-list. Empty keeps every property.
    #[serde(default)]
    pub select_properties: Vec<String>,

    /// Equality predicates on properties, all of which must hold.
    #[serde(default)]
    pub properties: Vec<PropertyFilter>,

    /// Declared property types, needed to cast `properties` values.
    #[serde(default)]
    pub fields_mapping: FieldsMapping,

    /// Sort keys, first key dominant.
    #[serde(default)]
    pub sortby: Vec<SortSpec>,

    /// Return the bare feature of a point lookup.
    #[serde(default)]
    pub single_feature: bool,
}

impl FeatureOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_geometry(mut self, skip: bool) -> Self {
        self.skip_geometry = skip;
        self
    }

    pub fn select_properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select_properties = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_properties(mut self, filters: Vec<PropertyFilter>) -> Self {
        self.properties = filters;
        self
    }

    pub fn with_fields_mapping(mut self, mapping: FieldsMapping) -> Self {
        self.fields_mapping = mapping;
        self
    }

    pub fn sort_by(mut self, sortby: Vec<SortSpec>) -> Self {
        self.sortby = sortby;
        self
    }

    pub fn single_feature(mut self, single: bool) -> Self {
        self.single_feature = single;
        self
    }
}

impl LocationResponse {
    /// See [`to_geojson`].
    pub fn to_geojson(&self, options: &FeatureOptions) -> RiseResult<GeoJsonOutput> {
        to_geojson(self, options)
    }
}

/// Serialize `response` as a FeatureCollection, or a single Feature when
/// `options.single_feature` is set.
pub fn to_geojson(response: &LocationResponse, options: &FeatureOptions) -> RiseResult<GeoJsonOutput> {
    let predicates = cast_property_filters(options)?;

    let mut features = Vec::with_capacity(response.len());
    for location in &response.data {
        let feature = location_to_feature(location, options.skip_geometry)?;
        if !predicates
            .iter()
            .all(|(name, expected)| property_matches(feature.property(name), expected))
        {
            continue;
        }
        features.push(feature);
    }

    if !options.select_properties.is_empty() {
        for feature in &mut features {
            feature
                .properties
                .retain(|key, _| options.select_properties.iter().any(|name| name == key));
        }
    }

    if features.len() >= 2 && !options.sortby.is_empty() {
        sort_features(&mut features, &options.sortby);
    }

    tracing::debug!(
        "Serialized {} of {} locations to GeoJSON",
        features.len(),
        response.len()
    );

    if options.single_feature {
        return match features.len() {
            1 => Ok(GeoJsonOutput::Feature(features.remove(0))),
            0 => Err(RiseError::LocationNotFound(
                "no location matched the request".to_string(),
            )),
            n => Err(RiseError::MissingPrecondition(format!(
                "expected a single location, found {}",
                n
            ))),
        };
    }

    Ok(GeoJsonOutput::FeatureCollection(FeatureCollection::new(
        features,
    )))
}

fn location_to_feature(location: &LocationRecord, skip_geometry: bool) -> RiseResult<Feature> {
    let attrs = require_attributes(location)?;

    let mut properties: Map<String, Value> = attrs.to_property_map()?;
    properties.insert("name".to_string(), Value::String(attrs.location_name.clone()));
    if let Some(elevation) = attrs.elevation {
        properties.insert("elevation".to_string(), Value::from(elevation));
    }

    let geometry = if skip_geometry {
        None
    } else {
        Some(attrs.location_coordinates.clone())
    };

    Ok(Feature::new(FeatureId::Number(attrs.id), geometry, properties))
}

fn cast_property_filters(options: &FeatureOptions) -> RiseResult<Vec<(&str, Value)>> {
    if options.properties.is_empty() {
        return Ok(Vec::new());
    }
    if options.fields_mapping.is_empty() {
        return Err(RiseError::MissingFieldsMapping);
    }

    options
        .properties
        .iter()
        .map(|filter| {
            let field = options.fields_mapping.get(&filter.name).ok_or_else(|| {
                RiseError::UnresolvableProperty {
                    property: filter.name.clone(),
                }
            })?;
            let value = field.type_.cast(&filter.name, &filter.value)?;
            Ok((filter.name.as_str(), value))
        })
        .collect()
}

fn property_matches(actual: Option<&Value>, expected: &Value) -> bool {
    match (actual, expected) {
        (Some(Value::Number(a)), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Some(actual), expected) => actual == expected,
        (None, _) => false,
    }
}

fn sort_features(features: &mut [Feature], sortby: &[SortSpec]) {
    // One stable pass per key, last key first, leaves the first key dominant.
    for spec in sortby.iter().rev() {
        features.sort_by(|a, b| {
            let ordering = compare_values(a.property(&spec.property), b.property(&spec.property));
            match spec.order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });
    }
}

/// Total order over property values; missing and null sort greatest.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::Number(x), Value::Number(y)) => {
                let x = x.as_f64().unwrap_or(f64::NAN);
                let y = y.as_f64().unwrap_or(f64::NAN);
                x.total_cmp(&y)
            }
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (a, b) => kind_rank(a).cmp(&kind_rank(b)),
        },
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Bool(_) => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        _ => 3,
    }
}

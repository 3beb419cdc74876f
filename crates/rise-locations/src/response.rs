//! The merged location model and its filters.
//!
//! Every filter takes the response by value and hands back a new one. Fallible
//! filters return `RiseResult<LocationResponse>`; on error the input is gone,
//! which is fine because a failed filter fails the whole request.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use rise_protocol::queries::{BboxQuery, DateTimeQuery, QueryGeometry, VerticalLevel};
use rise_protocol::{
    IncludedRecord, LocationAttributes, LocationRecord, PageLinks, PageMeta, RiseError,
    RiseResult,
};

use crate::merge::{merge_pages, DuplicatePolicy};

/// The `location/` response after merging all pages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<PageLinks>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,

    #[serde(deserialize_with = "one_or_many")]
    pub data: Vec<LocationRecord>,

    /// Present when the request asked for `include=catalogRecords.catalogItems`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included: Option<Vec<IncludedRecord>>,
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<LocationRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<LocationRecord>),
        One(Box<LocationRecord>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(records) => records,
        OneOrMany::One(record) => vec![*record],
    })
}

impl LocationResponse {
    /// Merge pages, then validate the merged body.
    pub fn from_api_pages(
        pages: Vec<(String, Value)>,
        policy: DuplicatePolicy,
    ) -> RiseResult<Self> {
        let merged = merge_pages(pages, policy)?;
        Self::validate(merged)
    }

    /// Validate a single body, as returned by a point lookup.
    pub fn from_value(body: Value) -> RiseResult<Self> {
        Self::from_api_pages(vec![("body".to_string(), body)], DuplicatePolicy::Reject)
    }

    fn validate(merged: Value) -> RiseResult<Self> {
        let response: LocationResponse = serde_json::from_value(merged)?;
        if let Some(included) = &response.included {
            for entry in included {
                entry.validate()?;
            }
        }
        Ok(response)
    }

    /// Build directly from records, without paging metadata.
    pub fn from_records(data: Vec<LocationRecord>) -> Self {
        Self {
            links: None,
            meta: None,
            data,
            included: None,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The `_id` of every location that has attributes, in order.
    pub fn attribute_ids(&self) -> Vec<i64> {
        self.data.iter().filter_map(LocationRecord::attribute_id).collect()
    }

    /// Whether two locations share a `locationName`.
    pub fn has_duplicate_location_names(&self) -> bool {
        let mut names = HashSet::new();
        self.data
            .iter()
            .filter_map(|loc| loc.attributes.as_ref())
            .any(|attrs| !names.insert(attrs.location_name.as_str()))
    }

    /// Keep the locations for which `keep` returns true.
    fn retain<F>(self, mut keep: F) -> Self
    where
        F: FnMut(&LocationRecord) -> bool,
    {
        let data = self.data.into_iter().filter(|loc| keep(loc)).collect();
        Self { data, ..self }
    }

    /// Fallible variant of [`retain`](Self::retain).
    fn try_retain<F>(self, mut keep: F) -> RiseResult<Self>
    where
        F: FnMut(&LocationRecord) -> RiseResult<bool>,
    {
        let mut data = Vec::with_capacity(self.data.len());
        for loc in self.data {
            if keep(&loc)? {
                data.push(loc);
            }
        }
        Ok(Self { data, ..self })
    }

    /// Keep locations whose `updateDate` matches `datetime`.
    ///
    /// An instant keeps locations whose raw `updateDate` starts with it; an
    /// interval keeps those whose parsed date lies within its bounds.
    pub fn drop_outside_of_date_range(self, datetime: &str) -> RiseResult<Self> {
        if self.data.is_empty() {
            return Err(RiseError::MissingPrecondition(
                "cannot filter an empty location list by date".to_string(),
            ));
        }
        if let Some(loc) = self.data.iter().find(|loc| loc.attributes.is_none()) {
            return Err(RiseError::MissingPrecondition(format!(
                "location '{}' has no attributes to filter by date",
                loc.id
            )));
        }

        let query = DateTimeQuery::parse(datetime)?;
        self.try_retain(|loc| match &loc.attributes {
            Some(attrs) => query.matches_update_date(&attrs.update_date),
            None => Ok(false),
        })
    }

    /// Drop locations outside `geometry` or whose elevation does not match `z`.
    ///
    /// With neither argument this is a no-op. Otherwise locations without an
    /// elevation are always dropped.
    pub fn filter_by_geometry(
        self,
        geometry: Option<&QueryGeometry>,
        z: Option<&VerticalLevel>,
    ) -> RiseResult<Self> {
        if geometry.is_none() && z.is_none() {
            return Ok(self);
        }

        self.try_retain(|loc| {
            let attrs = require_attributes(loc)?;
            let elevation = match attrs.elevation {
                Some(elevation) => elevation,
                None => return Ok(false),
            };
            if let Some(level) = z {
                if !level.matches(elevation) {
                    return Ok(false);
                }
            }
            match geometry {
                Some(geometry) => geometry.contains(&attrs.location_coordinates),
                None => Ok(true),
            }
        })
    }

    /// Parse `wkt` and `z`, then [`filter_by_geometry`](Self::filter_by_geometry).
    pub fn drop_outside_of_wkt(self, wkt: Option<&str>, z: Option<&str>) -> RiseResult<Self> {
        let geometry = wkt
            .filter(|w| !w.trim().is_empty())
            .map(QueryGeometry::from_wkt)
            .transpose()?;
        let level = parse_z(z)?;
        self.filter_by_geometry(geometry.as_ref(), level.as_ref())
    }

    /// Filter by a 4 or 6 value bbox. An explicit `z` wins over the bbox's own
    /// vertical range.
    pub fn drop_outside_of_bbox(self, bbox: &[f64], z: Option<&str>) -> RiseResult<Self> {
        let bbox = BboxQuery::from_values(bbox)?;
        let explicit = parse_z(z)?;
        let from_bbox = bbox.as_ref().and_then(BboxQuery::vertical_level);

        let level = match (explicit, from_bbox) {
            (Some(explicit), Some(ignored)) => {
                tracing::debug!(
                    "Explicit z {:?} overrides bbox vertical range {:?}",
                    explicit,
                    ignored
                );
                Some(explicit)
            }
            (explicit, from_bbox) => explicit.or(from_bbox),
        };

        let geometry = bbox.as_ref().map(BboxQuery::to_geometry);
        self.filter_by_geometry(geometry.as_ref(), level.as_ref())
    }

    /// Drop every location whose `_id` is `location_id`.
    pub fn drop_specific_location(self, location_id: i64) -> Self {
        self.retain(|loc| loc.attribute_id() != Some(location_id))
    }

    /// Keep only locations whose `_id` is `location_id`.
    pub fn drop_everything_but_one_location(self, location_id: i64) -> Self {
        self.retain(|loc| loc.attribute_id() == Some(location_id))
    }

    /// Keep only locations whose `_id`, rendered as text, equals `identifier`.
    pub fn drop_all_but_id(self, identifier: &str) -> Self {
        self.retain(|loc| {
            loc.attribute_id()
                .map_or(false, |id| id.to_string() == identifier)
        })
    }

    /// Keep the first `limit` locations.
    pub fn drop_after_limit(mut self, limit: usize) -> Self {
        self.data.truncate(limit);
        self
    }

    /// Drop the first `offset` locations.
    pub fn drop_before_offset(mut self, offset: usize) -> Self {
        let offset = offset.min(self.data.len());
        self.data.drain(..offset);
        self
    }
}

fn parse_z(z: Option<&str>) -> RiseResult<Option<VerticalLevel>> {
    z.filter(|z| !z.trim().is_empty())
        .map(VerticalLevel::parse)
        .transpose()
}

pub(crate) fn require_attributes(loc: &LocationRecord) -> RiseResult<&LocationAttributes> {
    loc.attributes.as_ref().ok_or_else(|| {
        RiseError::MissingPrecondition(format!("location '{}' has no attributes", loc.id))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_utils::{
        assert_location_ids, generate_locations, location_json, page_json, LocationBuilder,
    };

    fn response_of(records: Vec<Value>) -> LocationResponse {
        LocationResponse::from_value(json!({ "data": records })).unwrap()
    }

    fn five() -> LocationResponse {
        response_of(generate_locations(5))
    }

    #[test]
    fn test_from_value_single_object() {
        let response = LocationResponse::from_value(json!({"data": location_json(3)})).unwrap();
        assert_location_ids!(response, [3]);
        assert!(response.links.is_none());
    }

    #[test]
    fn test_from_pages_keeps_meta() {
        let response = LocationResponse::from_api_pages(
            vec![("page=1".to_string(), page_json(1, vec![location_json(1)]))],
            DuplicatePolicy::Reject,
        )
        .unwrap();
        assert_eq!(response.meta.unwrap().current_page, Some(1));
    }

    #[test]
    fn test_invalid_included_rejected_at_construction() {
        let body = json!({
            "data": [location_json(1)],
            "included": [{
                "id": "/rise/api/catalog-record/1",
                "type": "CatalogRecord",
                "relationships": {"location": {"data": []}}
            }]
        });
        assert!(matches!(
            LocationResponse::from_value(body),
            Err(RiseError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_unknown_included_type_rejected() {
        let body = json!({
            "data": [location_json(1)],
            "included": [{"id": "x", "type": "Unit", "relationships": {}}]
        });
        assert!(matches!(
            LocationResponse::from_value(body),
            Err(RiseError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_offset_then_limit() {
        let result = five().drop_before_offset(2).drop_after_limit(2);
        assert_location_ids!(result, [3, 4]);
    }

    #[test]
    fn test_limit_then_offset_differs() {
        let result = five().drop_after_limit(2).drop_before_offset(2);
        assert!(result.is_empty());
    }

    #[test]
    fn test_offset_past_end() {
        assert!(five().drop_before_offset(99).is_empty());
        assert_eq!(five().drop_after_limit(99).len(), 5);
    }

    #[test]
    fn test_identifier_filters() {
        assert_location_ids!(five().drop_specific_location(2), [1, 3, 4, 5]);
        assert_location_ids!(five().drop_everything_but_one_location(2), [2]);
        assert_location_ids!(five().drop_all_but_id("4"), [4]);
        assert!(five().drop_all_but_id("04").is_empty());
        assert!(five().drop_everything_but_one_location(42).is_empty());
    }

    #[test]
    fn test_date_instant_prefix() {
        let response = response_of(vec![
            LocationBuilder::new(1).update_date("2020-01-01T10:00:00+00:00").build(),
            LocationBuilder::new(2).update_date("2020-01-02T10:00:00+00:00").build(),
        ]);
        let result = response.drop_outside_of_date_range("2020-01-01").unwrap();
        assert_location_ids!(result, [1]);
    }

    #[test]
    fn test_date_interval_inclusive() {
        let response = response_of(vec![
            LocationBuilder::new(1).update_date("2019-12-31T23:59:59+00:00").build(),
            LocationBuilder::new(2).update_date("2020-01-01T00:00:00+00:00").build(),
            LocationBuilder::new(3).update_date("2020-01-15T00:00:00+00:00").build(),
            LocationBuilder::new(4).update_date("2020-02-01T00:00:00+00:00").build(),
            LocationBuilder::new(5).update_date("2020-02-01T00:00:01+00:00").build(),
        ]);
        let result = response
            .drop_outside_of_date_range("2020-01-01T00:00:00Z/2020-02-01T00:00:00Z")
            .unwrap();
        assert_location_ids!(result, [2, 3, 4]);
    }

    #[test]
    fn test_date_instant_month_prefix() {
        let response = response_of(vec![
            LocationBuilder::new(1).update_date("2020-01-15T08:00:00+00:00").build(),
            LocationBuilder::new(2).update_date("2020-02-03T08:00:00+00:00").build(),
            LocationBuilder::new(3).update_date("2020-01-31 23:00:00+00").build(),
        ]);
        let result = response.drop_outside_of_date_range("2020-01").unwrap();
        assert_location_ids!(result, [1, 3]);
    }

    #[test]
    fn test_date_only_interval_ends_at_midnight() {
        let response = response_of(vec![
            LocationBuilder::new(1).update_date("2019-12-31T23:59:59+00:00").build(),
            LocationBuilder::new(2).update_date("2020-01-01T00:00:00+00:00").build(),
            LocationBuilder::new(3).update_date("2020-12-31T00:00:00+00:00").build(),
            LocationBuilder::new(4).update_date("2020-12-31T08:00:00+00:00").build(),
        ]);
        let result = response
            .drop_outside_of_date_range("2020-01-01/2020-12-31")
            .unwrap();
        assert_location_ids!(result, [2, 3]);
    }

    #[test]
    fn test_date_preconditions() {
        let empty = LocationResponse::from_records(Vec::new());
        assert!(matches!(
            empty.drop_outside_of_date_range("2020-01-01"),
            Err(RiseError::MissingPrecondition(_))
        ));

        let bare = response_of(vec![LocationBuilder::new(1).without_attributes().build()]);
        assert!(matches!(
            bare.drop_outside_of_date_range("2020-01-01"),
            Err(RiseError::MissingPrecondition(_))
        ));
    }

    #[test]
    fn test_date_errors() {
        assert!(matches!(
            five().drop_outside_of_date_range("soon"),
            Err(RiseError::InvalidFilterExpression { .. })
        ));

        let bad_date = response_of(vec![LocationBuilder::new(1).update_date("last tuesday").build()]);
        assert!(matches!(
            bad_date.drop_outside_of_date_range("2020-01-01/.."),
            Err(RiseError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_geometry_noop_without_arguments() {
        let response = response_of(vec![LocationBuilder::new(1).no_elevation().build()]);
        let result = response.filter_by_geometry(None, None).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_z_range_filter() {
        let response = response_of(vec![
            LocationBuilder::new(1).elevation(5.0).build(),
            LocationBuilder::new(2).elevation(10.0).build(),
            LocationBuilder::new(3).elevation(15.0).build(),
            LocationBuilder::new(4).no_elevation().build(),
        ]);
        let result = response.drop_outside_of_wkt(None, Some("0/10")).unwrap();
        assert_location_ids!(result, [1, 2]);
    }

    #[test]
    fn test_null_elevation_dropped_by_geometry_filter() {
        let response = response_of(vec![
            LocationBuilder::new(1).point(1.0, 1.0).no_elevation().build(),
            LocationBuilder::new(2).point(1.0, 1.0).elevation(0.0).build(),
        ]);
        let result = response
            .drop_outside_of_wkt(Some("POLYGON((0 0, 5 0, 5 5, 0 5, 0 0))"), None)
            .unwrap();
        assert_location_ids!(result, [2]);
    }

    #[test]
    fn test_wkt_containment() {
        let response = response_of(vec![
            LocationBuilder::new(1).point(1.0, 1.0).build(),
            LocationBuilder::new(2).point(10.0, 10.0).build(),
            LocationBuilder::new(3)
                .polygon(&[(1.0, 1.0), (2.0, 1.0), (2.0, 2.0)])
                .build(),
        ]);
        let result = response
            .drop_outside_of_wkt(Some("POLYGON((0 0, 5 0, 5 5, 0 5, 0 0))"), None)
            .unwrap();
        assert_location_ids!(result, [1, 3]);
    }

    #[test]
    fn test_bbox_filter() {
        let response = five();
        // generated points run from (-110, 35) eastward one degree at a time
        let result = response
            .drop_outside_of_bbox(&[-110.5, 34.0, -107.5, 40.0], None)
            .unwrap();
        assert_location_ids!(result, [1, 2, 3]);
    }

    #[test]
    fn test_bbox_six_values_filters_z() {
        // elevations are 0, 100, 200, 300, 400
        let result = five()
            .drop_outside_of_bbox(&[-180.0, -90.0, 50.0, 180.0, 90.0, 250.0], None)
            .unwrap();
        assert_location_ids!(result, [2, 3]);
    }

    #[test]
    fn test_explicit_z_beats_bbox_z() {
        let result = five()
            .drop_outside_of_bbox(&[-180.0, -90.0, 50.0, 180.0, 90.0, 250.0], Some("400"))
            .unwrap();
        assert_location_ids!(result, [5]);
    }

    #[test]
    fn test_bbox_errors() {
        assert!(matches!(
            five().drop_outside_of_bbox(&[1.0, 2.0, 3.0], None),
            Err(RiseError::InvalidFilterExpression { .. })
        ));
        assert!(matches!(
            five().drop_outside_of_bbox(&[], Some("abc")),
            Err(RiseError::InvalidFilterExpression { .. })
        ));
    }

    #[test]
    fn test_empty_bbox_with_z_only_filters_z() {
        let result = five().drop_outside_of_bbox(&[], Some("100,300")).unwrap();
        assert_location_ids!(result, [2, 4]);
    }

    #[test]
    fn test_geometry_filter_requires_attributes() {
        let response = response_of(vec![LocationBuilder::new(1).without_attributes().build()]);
        assert!(matches!(
            response.drop_outside_of_wkt(None, Some("1")),
            Err(RiseError::MissingPrecondition(_))
        ));
    }

    #[test]
    fn test_duplicate_location_names() {
        assert!(!five().has_duplicate_location_names());
        let response = response_of(vec![
            LocationBuilder::new(1).name("Hoover Dam").build(),
            LocationBuilder::new(2).name("Hoover Dam").build(),
        ]);
        assert!(response.has_duplicate_location_names());
    }

    #[test]
    fn test_numeric_string_elevation() {
        let response = response_of(vec![LocationBuilder::new(1).elevation_text("10").build()]);
        let result = response.drop_outside_of_wkt(None, Some("10")).unwrap();
        assert_location_ids!(result, [1]);
    }
}

//! End-to-end tests: raw pages in, GeoJSON / CoverageJSON out.

use serde_json::{json, Value};

use rise_locations::{
    CoverageBuilder, DuplicatePolicy, FeatureOptions, ItemsQuery, LocationResponse,
    RelationshipResolver, RiseError,
};
use rise_protocol::queries::{parse_property_filters, SortSpec};
use rise_protocol::{
    FeatureId, FieldDefinition, FieldType, FieldsMapping, GeoJsonOutput, Geometry,
    ParameterMetadataMap, TransformedLocationWithResults,
};
use test_utils::{
    assert_location_ids, bbox, generate_location_with_results, generate_page_with_included,
    generate_pages, location_json, page_json, parameter_metadata_json, time, LocationBuilder,
};

fn features(output: &GeoJsonOutput) -> Vec<i64> {
    output
        .features()
        .iter()
        .map(|f| match f.id {
            FeatureId::Number(id) => id,
            FeatureId::String(ref s) => panic!("unexpected string id {}", s),
        })
        .collect()
}

// ============================================================================
// Merging
// ============================================================================

#[test]
fn test_many_pages_merge_in_order() {
    let pages = generate_pages(23, 5);
    assert_eq!(pages.len(), 5);

    let response = LocationResponse::from_api_pages(pages, DuplicatePolicy::Reject).unwrap();
    assert_eq!(response.len(), 23);
    assert_eq!(response.attribute_ids(), (1..=23).collect::<Vec<i64>>());
    assert_eq!(response.meta.as_ref().unwrap().current_page, Some(1));
}

#[test]
fn test_shared_id_between_pages() {
    let pages = vec![
        ("page=1".to_string(), page_json(1, vec![location_json(1), location_json(2)])),
        ("page=2".to_string(), page_json(2, vec![location_json(2)])),
    ];

    let err = LocationResponse::from_api_pages(pages.clone(), DuplicatePolicy::Reject).unwrap_err();
    assert_eq!(err.status_code(), 502);
    match err {
        RiseError::DuplicateRecord {
            id,
            first_page,
            second_page,
        } => {
            assert_eq!(id, "/rise/api/location/2");
            assert_eq!(first_page, "page=1");
            assert_eq!(second_page, "page=2");
        }
        other => panic!("unexpected error {:?}", other),
    }

    let kept = LocationResponse::from_api_pages(pages, DuplicatePolicy::KeepFirst).unwrap();
    assert_location_ids!(kept, [1, 2]);
}

// ============================================================================
// Filter ordering
// ============================================================================

#[test]
fn test_offset_limit_window() {
    let response = LocationResponse::from_api_pages(generate_pages(5, 5), DuplicatePolicy::Reject)
        .unwrap();
    let result = ItemsQuery::new().with_offset(2).with_limit(2).run(response).unwrap();
    assert_location_ids!(result, [3, 4]);
}

#[test]
fn test_limit_before_offset_is_empty_when_offset_reaches_limit() {
    let response = LocationResponse::from_api_pages(generate_pages(5, 5), DuplicatePolicy::Reject)
        .unwrap();
    let result = response.drop_after_limit(2).drop_before_offset(2);
    assert!(result.is_empty());
}

#[test]
fn test_reference_day_instant() {
    let response = LocationResponse::from_api_pages(generate_pages(3, 3), DuplicatePolicy::Reject)
        .unwrap();
    let result = ItemsQuery::new()
        .with_datetime(time::REFERENCE_DAY)
        .run(response)
        .unwrap();
    assert_location_ids!(result, [1]);
}

#[test]
fn test_bbox_regions() {
    let (min_x, min_y, max_x, max_y) = bbox::COLORADO_BASIN;
    let response = LocationResponse::from_value(json!({
        "data": [
            LocationBuilder::new(1).point(-114.7, 36.0).build(),
            LocationBuilder::new(2).point(-75.0, 40.0).build(),
            LocationBuilder::new(3).point(-111.5, 37.0).build(),
        ]
    }))
    .unwrap();

    let result = ItemsQuery::new()
        .with_bbox(vec![min_x, min_y, max_x, max_y])
        .run(response.clone())
        .unwrap();
    assert_location_ids!(result, [1, 3]);

    let (min_x, min_y, max_x, max_y) = bbox::MID_ATLANTIC;
    let result = ItemsQuery::new()
        .with_bbox(vec![min_x, min_y, max_x, max_y])
        .run(response)
        .unwrap();
    assert!(result.is_empty());
}

#[test]
fn test_range_z_boundaries() {
    let response = LocationResponse::from_value(json!({
        "data": [
            LocationBuilder::new(1).elevation(10.0).build(),
            LocationBuilder::new(2).elevation(15.0).build(),
            LocationBuilder::new(3).no_elevation().build(),
            LocationBuilder::new(4).elevation(0.0).build(),
        ]
    }))
    .unwrap();
    let result = ItemsQuery::new().with_z("0/10").run(response).unwrap();
    assert_location_ids!(result, [1, 4]);
}

// ============================================================================
// Relationships
// ============================================================================

#[test]
fn test_catalog_item_filter_keeps_order() {
    let body = generate_page_with_included(6, &[5, 1, 3], 2);
    let response = LocationResponse::from_value(body).unwrap();
    let resolver = RelationshipResolver::new(test_utils::RISE_HOST);

    let urls = response.catalog_item_urls(&resolver).unwrap();
    assert_eq!(
        urls["/rise/api/location/3"],
        vec![
            "https://data.usbr.gov/rise/api/catalog-item/300".to_string(),
            "https://data.usbr.gov/rise/api/catalog-item/301".to_string(),
        ]
    );

    let kept = response.drop_locations_without_catalogitems(&resolver).unwrap();
    assert_location_ids!(kept, [1, 3, 5]);
}

#[test]
fn test_included_order_does_not_matter() {
    let body = generate_page_with_included(4, &[1, 2, 3, 4], 3);
    let mut shuffled = body.clone();
    if let Some(Value::Array(included)) = shuffled.get_mut("included") {
        included.reverse();
    }

    let resolver = RelationshipResolver::default();
    let a = LocationResponse::from_value(body).unwrap();
    let b = LocationResponse::from_value(shuffled).unwrap();
    assert_eq!(
        a.catalog_item_urls(&resolver).unwrap(),
        b.catalog_item_urls(&resolver).unwrap()
    );
}

// ============================================================================
// GeoJSON
// ============================================================================

#[test]
fn test_sort_with_missing_values() {
    let response = LocationResponse::from_value(json!({
        "data": [
            LocationBuilder::new(10).attr("order", json!(3)).build(),
            LocationBuilder::new(11).build(),
            LocationBuilder::new(12).attr("order", json!(1)).build(),
            LocationBuilder::new(13).attr("order", json!(2)).build(),
        ]
    }))
    .unwrap();

    let asc = response
        .to_geojson(&FeatureOptions::new().sort_by(SortSpec::parse_list("order").unwrap()))
        .unwrap();
    assert_eq!(features(&asc), vec![12, 13, 10, 11]);

    let desc = response
        .to_geojson(&FeatureOptions::new().sort_by(SortSpec::parse_list("-order").unwrap()))
        .unwrap();
    assert_eq!(features(&desc), vec![11, 10, 13, 12]);
}

#[test]
fn test_single_location_round_trip() {
    let raw = LocationBuilder::new(42)
        .name("Flaming Gorge")
        .point(-109.42, 40.91)
        .elevation(1840.0)
        .attr("locationTypeName", json!("Lake/Reservoir"))
        .attr("timezone", json!("MST"))
        .build();

    let response = LocationResponse::from_value(json!({ "data": raw })).unwrap();
    let output = response
        .to_geojson(&FeatureOptions::new().single_feature(true))
        .unwrap();

    let value = serde_json::to_value(&output).unwrap();
    assert_eq!(value["type"], "Feature");
    assert_eq!(value["id"], 42);
    assert_eq!(
        serde_json::from_value::<Geometry>(value["geometry"].clone()).unwrap(),
        Geometry::point(-109.42, 40.91)
    );
    assert_eq!(value["properties"]["locationName"], "Flaming Gorge");
    assert_eq!(value["properties"]["name"], "Flaming Gorge");
    assert_eq!(value["properties"]["elevation"], 1840.0);
    assert_eq!(value["properties"]["locationTypeName"], "Lake/Reservoir");
    assert_eq!(value["properties"]["timezone"], "MST");
    assert_eq!(value["properties"]["updateDate"], time::REFERENCE_UPDATE);
}

#[test]
fn test_property_filter_from_query_pairs() {
    let response = LocationResponse::from_value(json!({
        "data": [
            LocationBuilder::new(1).attr("locationTypeName", json!("Dam")).build(),
            LocationBuilder::new(2).attr("locationTypeName", json!("Canal")).build(),
        ]
    }))
    .unwrap();

    let mut mapping = FieldsMapping::new();
    mapping.insert(
        "locationTypeName".to_string(),
        FieldDefinition::new(FieldType::String),
    );
    let options = FeatureOptions::new()
        .with_properties(parse_property_filters(&[("locationTypeName", "Canal")]))
        .with_fields_mapping(mapping);

    let output = response.to_geojson(&options).unwrap();
    assert_eq!(features(&output), vec![2]);
}

#[test]
fn test_catalog_urls_exposed_as_property() {
    let body = generate_page_with_included(2, &[2], 1);
    let output = LocationResponse::from_value(body)
        .unwrap()
        .attach_catalog_item_urls(&RelationshipResolver::default())
        .unwrap()
        .to_geojson(&FeatureOptions::default())
        .unwrap();

    let feature = output.features()[1];
    assert_eq!(
        feature.properties["catalogItemUrls"],
        json!(["https://data.usbr.gov/rise/api/catalog-item/200"])
    );
}

// ============================================================================
// CoverageJSON
// ============================================================================

#[test]
fn test_coverage_collection_shape() {
    let metadata: ParameterMetadataMap =
        serde_json::from_value(parameter_metadata_json(&["item-1", "item-2"])).unwrap();
    let input: Vec<TransformedLocationWithResults> = vec![
        generate_location_with_results(location_json(1), &["item-1", "item-2"], 3),
        generate_location_with_results(
            LocationBuilder::new(2)
                .polygon(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)])
                .build(),
            &["item-2"],
            2,
        ),
    ]
    .into_iter()
    .map(|v| serde_json::from_value(v).unwrap())
    .collect();

    let collection = CoverageBuilder::new(&metadata).render(&input).unwrap();
    let value = serde_json::to_value(&collection).unwrap();

    assert_eq!(value["coverages"].as_array().unwrap().len(), 3);
    assert_eq!(value["coverages"][0]["domainType"], "PointSeries");
    assert_eq!(value["coverages"][2]["domainType"], "PolygonSeries");
    assert_eq!(value["coverages"][0]["ranges"]["item-1"]["shape"], json!([3]));
    assert_eq!(
        value["coverages"][0]["ranges"]["item-1"]["axisNames"],
        json!(["t"])
    );
    assert_eq!(
        value["parameters"]["item-2"]["observedProperty"]["label"]["en"],
        "Parameter 1"
    );
    assert_eq!(
        value["referencing"][0]["system"]["id"],
        "http://www.opengis.net/def/crs/OGC/1.3/CRS84"
    );
}

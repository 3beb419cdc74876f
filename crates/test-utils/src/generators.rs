//! Generators for synthetic RISE location sets.
//!
//! Values are deterministic so tests can assert on exact ids, positions and
//! elevations.

use serde_json::{json, Value};

use crate::fixtures::{
    catalog_item_id, catalog_item_json, catalog_record_id, catalog_record_json,
    location_record_id, page_json, page_with_included, LocationBuilder,
};

/// Creates `count` point locations with `_id` 1..=count.
///
/// Location `i` (0-based) sits at `(-110 + i, 35 + i * 0.5)` with elevation
/// `i * 100` and an update date on day `i % 28 + 1` of January 2020.
///
/// # Example
///
/// ```
/// use test_utils::generate_locations;
///
/// let locations = generate_locations(3);
/// assert_eq!(locations.len(), 3);
/// assert_eq!(locations[2]["attributes"]["_id"], 3);
/// assert_eq!(locations[2]["attributes"]["elevation"], 200.0);
/// ```
pub fn generate_locations(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| {
            LocationBuilder::new(i as i64 + 1)
                .point(-110.0 + i as f64, 35.0 + i as f64 * 0.5)
                .elevation(i as f64 * 100.0)
                .update_date(format!("2020-01-{:02}T00:00:00+00:00", i % 28 + 1))
                .build()
        })
        .collect()
}

/// Splits generated locations into pages of `per_page`, keyed `page=N`.
pub fn generate_pages(count: usize, per_page: usize) -> Vec<(String, Value)> {
    let per_page = per_page.max(1);
    generate_locations(count)
        .chunks(per_page)
        .enumerate()
        .map(|(i, chunk)| {
            let page = i as u64 + 1;
            (format!("page={}", page), page_json(page, chunk.to_vec()))
        })
        .collect()
}

/// One catalog record per location id, each enumerating `items_per_location`
/// catalog items, followed by the items themselves.
///
/// Record ids are `location_id * 10`; item ids are `location_id * 100 + k`.
pub fn generate_included(location_ids: &[i64], items_per_location: usize) -> Vec<Value> {
    let mut records = Vec::new();
    let mut items = Vec::new();

    for &loc in location_ids {
        let record = catalog_record_id(loc * 10);
        let item_ids: Vec<String> = (0..items_per_location)
            .map(|k| catalog_item_id(loc * 100 + k as i64))
            .collect();
        let item_refs: Vec<&str> = item_ids.iter().map(String::as_str).collect();

        records.push(catalog_record_json(
            &record,
            &location_record_id(loc),
            &item_refs,
        ));
        items.extend(item_ids.iter().map(|id| catalog_item_json(id, &record)));
    }

    records.extend(items);
    records
}

/// A single page containing `count` locations and an `included` section
/// that links only the given ids.
pub fn generate_page_with_included(
    count: usize,
    linked_ids: &[i64],
    items_per_location: usize,
) -> Value {
    page_with_included(
        1,
        generate_locations(count),
        generate_included(linked_ids, items_per_location),
    )
}

/// A location joined with time series results for each of `item_ids`.
///
/// Each series has `len` daily values starting at 2020-01-01, with every
/// third value missing.
pub fn generate_location_with_results(location: Value, item_ids: &[&str], len: usize) -> Value {
    let parameters: Vec<Value> = item_ids
        .iter()
        .map(|id| {
            let results: Vec<Value> = (0..len)
                .map(|i| if i % 3 == 2 { Value::Null } else { json!(i as f64 * 1.5) })
                .collect();
            let dates: Vec<String> = (0..len)
                .map(|i| format!("2020-01-{:02}T00:00:00+00:00", i % 28 + 1))
                .collect();
            json!({
                "catalogItemId": id,
                "timeseriesResults": results,
                "timeseriesDates": dates
            })
        })
        .collect();

    let mut joined = location;
    joined["parameters"] = Value::Array(parameters);
    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_pages_split() {
        let pages = generate_pages(5, 2);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].0, "page=1");
        assert_eq!(pages[2].1["data"].as_array().unwrap().len(), 1);
        assert_eq!(pages[2].1["data"][0]["attributes"]["_id"], 5);
    }

    #[test]
    fn test_generate_included_layout() {
        let included = generate_included(&[1, 2], 2);
        // 2 records then 4 items
        assert_eq!(included.len(), 6);
        assert_eq!(included[0]["type"], "CatalogRecord");
        assert_eq!(included[2]["type"], "CatalogItem");
        assert_eq!(included[2]["id"], "/rise/api/catalog-item/100");
    }

    #[test]
    fn test_generate_results_lengths_match() {
        let joined = generate_location_with_results(
            LocationBuilder::new(1).build(),
            &["/rise/api/catalog-item/1"],
            4,
        );
        let param = &joined["parameters"][0];
        assert_eq!(param["timeseriesResults"].as_array().unwrap().len(), 4);
        assert_eq!(param["timeseriesDates"].as_array().unwrap().len(), 4);
        assert!(param["timeseriesResults"][2].is_null());
    }
}

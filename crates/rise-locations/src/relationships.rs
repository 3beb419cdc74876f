//! Resolving `included` catalog records and items into catalog item URLs.
//!
//! The `included` section is a flat list of two record kinds linked in both
//! directions: a catalog record names its location and (usually) enumerates
//! its catalog items, and each catalog item points back at its record. Either
//! side may be missing, and RISE does not order the list, so resolution is
//! done in two passes over indexes rather than in a single scan.

use serde_json::Value;
use std::collections::{HashMap, HashSet};

use rise_protocol::{IncludedRecord, RiseResult, DEFAULT_CATALOG_ITEM_HOST};

use crate::response::LocationResponse;

/// Maps location record ids to the URLs of their catalog items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipResolver {
    host: String,
}

impl Default for RelationshipResolver {
    fn default() -> Self {
        Self::new(DEFAULT_CATALOG_ITEM_HOST)
    }
}

impl RelationshipResolver {
    /// `host` is prefixed to catalog item ids; a trailing slash is dropped.
    pub fn new(host: impl Into<String>) -> Self {
        let host: String = host.into();
        Self {
            host: host.trim_end_matches('/').to_string(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn url_for(&self, item_id: &str) -> String {
        format!("{}{}", self.host, item_id)
    }

    /// Location id -> catalog item URLs.
    ///
    /// Only locations present in `data` with at least one item appear. Each
    /// record contributes the items it enumerates, in its own order, followed
    /// by items that only reference it back, in `included` order.
    pub fn resolve(&self, response: &LocationResponse) -> RiseResult<HashMap<String, Vec<String>>> {
        let included = match &response.included {
            Some(included) => included,
            None => return Ok(HashMap::new()),
        };

        // Pass 1: index both directions.
        let mut records_by_location: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut enumerated: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut back_refs: HashMap<&str, Vec<&str>> = HashMap::new();

        for entry in included {
            match entry {
                IncludedRecord::CatalogRecord(record) => {
                    records_by_location
                        .entry(record.location_id()?)
                        .or_default()
                        .push(record.id.as_str());
                    enumerated
                        .entry(record.id.as_str())
                        .or_default()
                        .extend(record.item_ids());
                }
                IncludedRecord::CatalogItem(item) => {
                    back_refs
                        .entry(item.record_id()?)
                        .or_default()
                        .push(item.id.as_str());
                }
            }
        }

        // Pass 2: order each record's items, then join through locations.
        let mut items_by_record: HashMap<&str, Vec<&str>> = HashMap::new();
        for (&record, items) in &enumerated {
            let mut seen = HashSet::new();
            let ordered = items
                .iter()
                .chain(back_refs.get(record).into_iter().flatten())
                .copied()
                .filter(|item| seen.insert(*item))
                .collect();
            items_by_record.insert(record, ordered);
        }

        let mut resolved = HashMap::new();
        for location in &response.data {
            let records = match records_by_location.get(location.id.as_str()) {
                Some(records) => records,
                None => continue,
            };

            let mut seen = HashSet::new();
            let urls: Vec<String> = records
                .iter()
                .filter_map(|record| items_by_record.get(record))
                .flatten()
                .filter(|item| seen.insert(**item))
                .map(|item| self.url_for(item))
                .collect();

            if !urls.is_empty() {
                resolved.insert(location.id.clone(), urls);
            }
        }

        tracing::debug!(
            "Resolved catalog items for {} of {} locations",
            resolved.len(),
            response.data.len()
        );
        Ok(resolved)
    }
}

impl LocationResponse {
    /// Shorthand for [`RelationshipResolver::resolve`].
    pub fn catalog_item_urls(
        &self,
        resolver: &RelationshipResolver,
    ) -> RiseResult<HashMap<String, Vec<String>>> {
        resolver.resolve(self)
    }

    /// Drop every location with no resolvable catalog items, keeping order.
    pub fn drop_locations_without_catalogitems(
        self,
        resolver: &RelationshipResolver,
    ) -> RiseResult<Self> {
        let urls = resolver.resolve(&self)?;
        let data = self
            .data
            .into_iter()
            .filter(|loc| urls.contains_key(&loc.id))
            .collect();
        Ok(Self { data, ..self })
    }

    /// Store each location's catalog item URLs as the `catalogItemUrls`
    /// attribute. Locations without items get an empty list.
    pub fn attach_catalog_item_urls(self, resolver: &RelationshipResolver) -> RiseResult<Self> {
        let mut urls = resolver.resolve(&self)?;
        let data = self
            .data
            .into_iter()
            .map(|mut loc| {
                let found = urls.remove(&loc.id).unwrap_or_default();
                if let Some(attrs) = loc.attributes.as_mut() {
                    let list = found.into_iter().map(Value::String).collect();
                    attrs
                        .extra
                        .insert("catalogItemUrls".to_string(), Value::Array(list));
                }
                loc
            })
            .collect();
        Ok(Self { data, ..self })
    }
}

//! Merging paged `location/` responses.
//!
//! RISE pages its location listing. Pages are fetched independently, so the
//! same record can show up twice when the upstream ordering shifts between
//! requests. The merger concatenates pages in the order given and decides
//! what to do with repeats according to a [`DuplicatePolicy`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use rise_protocol::{RiseError, RiseResult};

/// What to do when two data records share an `id`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail the merge.
    #[default]
    Reject,
    /// Keep the first occurrence, log and drop the rest.
    KeepFirst,
}

/// Merge `(page_key, body)` pairs into one raw body.
///
/// The result has every page's `data` concatenated in order, every page's
/// `included` concatenated (present only if some page had it), and the first
/// page's `links` and `meta`. Page keys only label errors; the merge follows
/// the order of `pages`.
pub fn merge_pages(pages: Vec<(String, Value)>, policy: DuplicatePolicy) -> RiseResult<Value> {
    let mut data: Vec<Value> = Vec::new();
    let mut included: Option<Vec<Value>> = None;
    let mut links: Option<Value> = None;
    let mut meta: Option<Value> = None;
    let mut seen: HashMap<String, String> = HashMap::new();
    let mut page_count = 0usize;
    let mut dropped = 0usize;

    for (page_key, body) in pages {
        let mut body = match body {
            Value::Object(map) => map,
            other => {
                return Err(RiseError::malformed(format!(
                    "page '{}' is not a JSON object: {}",
                    page_key,
                    type_name(&other)
                )))
            }
        };

        if page_count == 0 {
            links = body.remove("links").filter(|v| !v.is_null());
            meta = body.remove("meta").filter(|v| !v.is_null());
        }
        page_count += 1;

        let records = match body.remove("data") {
            Some(Value::Array(records)) => records,
            Some(Value::Object(record)) => vec![Value::Object(record)],
            Some(other) => {
                return Err(RiseError::malformed(format!(
                    "page '{}' has data of type {}, expected an object or array",
                    page_key,
                    type_name(&other)
                )))
            }
            None => {
                return Err(RiseError::malformed(format!(
                    "page '{}' has no data member",
                    page_key
                )))
            }
        };

        for record in records {
            let id = record
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    RiseError::malformed(format!("page '{}' has a record without an id", page_key))
                })?
                .to_string();

            if let Some(first_page) = seen.get(&id) {
                match policy {
                    DuplicatePolicy::Reject => {
                        return Err(RiseError::DuplicateRecord {
                            id,
                            first_page: first_page.clone(),
                            second_page: page_key,
                        })
                    }
                    DuplicatePolicy::KeepFirst => {
                        tracing::warn!(
                            "Dropping duplicate location {} from page {} (first seen in page {})",
                            id,
                            page_key,
                            first_page
                        );
                        dropped += 1;
                        continue;
                    }
                }
            }

            seen.insert(id, page_key.clone());
            data.push(record);
        }

        match body.remove("included") {
            Some(Value::Array(entries)) => included.get_or_insert_with(Vec::new).extend(entries),
            Some(Value::Null) | None => {}
            Some(other) => {
                return Err(RiseError::malformed(format!(
                    "page '{}' has included of type {}, expected an array",
                    page_key,
                    type_name(&other)
                )))
            }
        }
    }

    tracing::debug!(
        "Merged {} pages into {} locations ({} duplicates dropped)",
        page_count,
        data.len(),
        dropped
    );

    let mut merged = Map::new();
    if let Some(links) = links {
        merged.insert("links".to_string(), links);
    }
    if let Some(meta) = meta {
        merged.insert("meta".to_string(), meta);
    }
    merged.insert("data".to_string(), Value::Array(data));
    if let Some(included) = included {
        merged.insert("included".to_string(), Value::Array(included));
    }
    Ok(Value::Object(merged))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

//! Parameter and field metadata.
//!
//! Two kinds of metadata live here: the per-parameter descriptions returned
//! by the RISE parameter endpoint (used when building CoverageJSON), and the
//! fields mapping that declares how property filter values are typed.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::HashMap;

use crate::errors::{RiseError, RiseResult};

/// Upstream description of a parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParameterMetadata {
    pub description: String,

    /// Unit symbol.
    #[serde(rename = "x-ogc-unit")]
    pub unit: String,

    pub title: String,
}

/// Parameter metadata keyed by parameter id.
pub type ParameterMetadataMap = HashMap<String, ParameterMetadata>;

/// Declared type of a filterable property.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    Integer,
    String,
}

impl FieldType {
    /// Convert a query-string value to a JSON value of this type.
    pub fn cast(&self, property: &str, raw: &str) -> RiseResult<Value> {
        let trimmed = raw.trim();
        match self {
            FieldType::Number => trimmed
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| RiseError::invalid_filter(property, raw, "a number")),
            FieldType::Integer => trimmed
                .parse::<i64>()
                .map(|n| Value::Number(n.into()))
                .map_err(|_| RiseError::invalid_filter(property, raw, "an integer")),
            FieldType::String => Ok(Value::String(raw.to_string())),
        }
    }
}

/// A single fields mapping entry: `{ "type": "number" }`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldDefinition {
    #[serde(rename = "type")]
    pub type_: FieldType,
}

impl FieldDefinition {
    pub fn new(type_: FieldType) -> Self {
        Self { type_ }
    }
}

/// Property name to declared type.
pub type FieldsMapping = HashMap<String, FieldDefinition>;

/// Internationalized string, English only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct I18nString {
    pub en: String,
}

impl I18nString {
    pub fn english(s: impl Into<String>) -> Self {
        Self { en: s.into() }
    }
}

/// Unit of measurement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Unit {
    pub symbol: String,
}

impl Unit {
    pub fn from_symbol(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
        }
    }
}

/// The observed property being measured.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservedProperty {
    pub id: String,
    pub label: I18nString,
}

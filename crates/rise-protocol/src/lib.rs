//! RISE location protocol types
//!
//! This crate provides the types shared by the location filtering engine and
//! the service that drives it:
//!
//! - JSON:API wire types for the RISE `location/` endpoint (locations, paging
//!   metadata and the `included` catalog records/items)
//! - Parsers that turn query parameters (bbox, WKT, vertical level, datetime,
//!   sort order) into typed predicates
//! - GeoJSON and CoverageJSON output schemas
//! - The error taxonomy surfaced to the request boundary
//!
//! # Example
//!
//! ```rust
//! use rise_protocol::queries::{BboxQuery, VerticalLevel};
//!
//! let bbox = BboxQuery::from_values(&[-110.0, 35.0, 0.0, -100.0, 42.0, 3000.0])
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(bbox.vertical_level(), Some(VerticalLevel::Range(0.0, 3000.0)));
//! ```

pub mod coverage_json;
pub mod errors;
pub mod geojson;
pub mod locations;
pub mod parameters;
pub mod queries;

// Re-export commonly used types
pub use coverage_json::{Coverage, CoverageCollection, CovJsonParameter, Domain, DomainType, NdArray};
pub use errors::{ExceptionResponse, RiseError, RiseResult};
pub use geojson::{Feature, FeatureCollection, FeatureId, GeoJsonOutput, Geometry};
pub use locations::{
    CatalogItem, CatalogRecord, IncludedRecord, LocationAttributes, LocationRecord, PageLinks,
    PageMeta, ParameterResults, ResourceRef, TransformedLocationWithResults,
};
pub use parameters::{
    FieldDefinition, FieldType, FieldsMapping, ParameterMetadata, ParameterMetadataMap,
};
pub use queries::{
    parse_property_filters, parse_timestamp, BboxQuery, DateTimeQuery, PropertyFilter,
    QueryGeometry, SortOrder, SortSpec, VerticalLevel,
};

/// Host prefixed to catalog item identifiers to build their public URLs.
pub const DEFAULT_CATALOG_ITEM_HOST: &str = "https://data.usbr.gov";

/// Media types used in responses
pub mod media_types {
    /// CoverageJSON media type
    pub const COVERAGE_JSON: &str = "application/vnd.cov+json";
    /// GeoJSON media type
    pub const GEO_JSON: &str = "application/geo+json";
    /// JSON media type
    pub const JSON: &str = "application/json";
}

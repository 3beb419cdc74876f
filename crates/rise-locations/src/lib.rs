//! Location response engine for the RISE EDR service.
//!
//! Paged `location/` responses go in; GeoJSON feature collections and
//! CoverageJSON coverage collections come out. In between:
//!
//! 1. [`merge`] concatenates pages and rejects (or drops) duplicate records
//! 2. [`response::LocationResponse`] holds the merged model and the filters
//! 3. [`relationships`] resolves catalog records/items into catalog item URLs
//! 4. [`pipeline::ItemsQuery`] applies the filters in the order the items
//!    endpoint uses
//! 5. [`features`] and [`coverage`] serialize the result
//!
//! Every filter consumes the response and returns a new one, so a stage can
//! never observe a half-filtered list.
//!
//! # Example
//!
//! ```rust
//! use rise_locations::{DuplicatePolicy, FeatureOptions, ItemsQuery, LocationResponse};
//! use serde_json::json;
//!
//! let page = json!({
//!     "data": [{
//!         "id": "/rise/api/location/1",
//!         "type": "Location",
//!         "attributes": {
//!             "_id": 1,
//!             "locationName": "Lake Mead",
//!             "locationCoordinates": {"type": "Point", "coordinates": [-114.7, 36.0]},
//!             "elevation": 372.0,
//!             "updateDate": "2020-01-01T00:00:00+00:00"
//!         }
//!     }]
//! });
//!
//! let response =
//!     LocationResponse::from_api_pages(vec![("page=1".to_string(), page)], DuplicatePolicy::Reject)
//!         .unwrap();
//! let filtered = ItemsQuery::new().with_bbox(vec![-120.0, 30.0, -110.0, 40.0]).run(response).unwrap();
//! let geojson = filtered.to_geojson(&FeatureOptions::default()).unwrap();
//! assert_eq!(geojson.len(), 1);
//! ```

pub mod coverage;
pub mod features;
pub mod merge;
pub mod pipeline;
pub mod relationships;
pub mod response;

pub use coverage::CoverageBuilder;
pub use features::{to_geojson, FeatureOptions};
pub use merge::{merge_pages, DuplicatePolicy};
pub use pipeline::{FilterStage, ItemsQuery, PipelineObserver, TracingObserver};
pub use relationships::RelationshipResolver;
pub use response::LocationResponse;

pub use rise_protocol::{RiseError, RiseResult};

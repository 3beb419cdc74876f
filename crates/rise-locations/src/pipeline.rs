//! The items query: filter stages applied in a fixed order.
//!
//! Stage order matters. Offset and limit run before the spatial filters, so
//! `limit=10&bbox=...` means "of the first ten locations, those in the box",
//! which is how the upstream items endpoint has always behaved.

use serde::{Deserialize, Serialize};
use std::fmt;

use rise_protocol::queries::DateTimeQuery;
use rise_protocol::RiseResult;

use crate::response::LocationResponse;

/// A filter stage of [`ItemsQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterStage {
    Identifier,
    DateTime,
    Offset,
    Limit,
    Bbox,
    Wkt,
    VerticalLevel,
}

impl FilterStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterStage::Identifier => "identifier",
            FilterStage::DateTime => "datetime",
            FilterStage::Offset => "offset",
            FilterStage::Limit => "limit",
            FilterStage::Bbox => "bbox",
            FilterStage::Wkt => "wkt",
            FilterStage::VerticalLevel => "z",
        }
    }
}

impl fmt::Display for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives a callback after every stage that ran.
pub trait PipelineObserver {
    fn stage_finished(&self, _stage: FilterStage, _before: usize, _after: usize) {}
}

/// Logs each stage at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn stage_finished(&self, stage: FilterStage, before: usize, after: usize) {
        tracing::debug!("Filter stage {}: {} -> {} locations", stage, before, after);
    }
}

/// Client parameters of an items request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemsQuery {
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub datetime: Option<String>,
    #[serde(default)]
    pub offset: Option<usize>,
    /// `Some(0)` is treated as no limit.
    #[serde(default)]
    pub limit: Option<usize>,
    /// 4 or 6 values; empty means no box.
    #[serde(default)]
    pub bbox: Vec<f64>,
    #[serde(default)]
    pub wkt: Option<String>,
    #[serde(default)]
    pub z: Option<String>,
}

impl ItemsQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_datetime(mut self, datetime: impl Into<String>) -> Self {
        self.datetime = Some(datetime.into());
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_bbox(mut self, bbox: Vec<f64>) -> Self {
        self.bbox = bbox;
        self
    }

    pub fn with_wkt(mut self, wkt: impl Into<String>) -> Self {
        self.wkt = Some(wkt.into());
        self
    }

    pub fn with_z(mut self, z: impl Into<String>) -> Self {
        self.z = Some(z.into());
        self
    }

    /// Run with the [`TracingObserver`].
    pub fn run(&self, response: LocationResponse) -> RiseResult<LocationResponse> {
        self.execute(response, &TracingObserver)
    }

    /// Apply every requested stage in order, reporting each to `observer`.
    pub fn execute(
        &self,
        mut response: LocationResponse,
        observer: &dyn PipelineObserver,
    ) -> RiseResult<LocationResponse> {
        let z = self.z.as_deref().filter(|z| !z.trim().is_empty());
        let wkt = self.wkt.as_deref().filter(|w| !w.trim().is_empty());

        if let Some(identifier) = &self.identifier {
            response = stage(observer, FilterStage::Identifier, response, |r| {
                Ok(r.drop_all_but_id(identifier))
            })?;
        }

        if let Some(datetime) = &self.datetime {
            DateTimeQuery::parse(datetime)?;
            if response.is_empty() {
                tracing::debug!("Skipping datetime filter, no locations left");
            } else {
                response = stage(observer, FilterStage::DateTime, response, |r| {
                    r.drop_outside_of_date_range(datetime)
                })?;
            }
        }

        if let Some(offset) = self.offset {
            response = stage(observer, FilterStage::Offset, response, |r| {
                Ok(r.drop_before_offset(offset))
            })?;
        }

        if self.limit == Some(0) {
            tracing::debug!("Ignoring limit=0, no limit applied");
        }
        if let Some(limit) = self.limit.filter(|limit| *limit > 0) {
            response = stage(observer, FilterStage::Limit, response, |r| {
                Ok(r.drop_after_limit(limit))
            })?;
        }

        if !self.bbox.is_empty() {
            response = stage(observer, FilterStage::Bbox, response, |r| {
                r.drop_outside_of_bbox(&self.bbox, z)
            })?;
        }

        if wkt.is_some() {
            response = stage(observer, FilterStage::Wkt, response, |r| {
                r.drop_outside_of_wkt(wkt, z)
            })?;
        }

        if z.is_some() && self.bbox.is_empty() && wkt.is_none() {
            response = stage(observer, FilterStage::VerticalLevel, response, |r| {
                r.drop_outside_of_wkt(None, z)
            })?;
        }

        Ok(response)
    }
}

fn stage<F>(
    observer: &dyn PipelineObserver,
    stage: FilterStage,
    response: LocationResponse,
    filter: F,
) -> RiseResult<LocationResponse>
where
    F: FnOnce(LocationResponse) -> RiseResult<LocationResponse>,
{
    let before = response.len();
    let response = filter(response)?;
    observer.stage_finished(stage, before, response.len());
    Ok(response)
}

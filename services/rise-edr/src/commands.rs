//! The commands behind the `rise-edr` binary.
//!
//! Each command loads what it needs through a [`LocationSource`], hands it to
//! the engine and returns the output document. Engine failures surface as
//! [`RiseError`] inside the `anyhow::Error`, so callers can downcast them to
//! build an exception response.

use anyhow::{anyhow, Context, Result};
use clap::Args;
use serde_json::Value;
use std::path::Path;

use rise_locations::{
    CoverageBuilder, FeatureOptions, ItemsQuery, LocationResponse, RelationshipResolver,
};
use rise_protocol::queries::{parse_property_filters, BboxQuery, SortSpec};
use rise_protocol::{
    CoverageCollection, GeoJsonOutput, RiseError, RiseResult, TransformedLocationWithResults,
};

use crate::config::RiseConfig;
use crate::source::LocationSource;

/// Query parameters of the `items` command.
#[derive(Debug, Clone, Default, Args)]
pub struct ItemsArgs {
    /// `minx,miny,maxx,maxy` or `minx,miny,minz,maxx,maxy,maxz`
    #[arg(long, allow_hyphen_values = true)]
    pub bbox: Option<String>,

    /// Instant or `start/end` interval; either end may be `..`
    #[arg(long)]
    pub datetime: Option<String>,

    /// WKT geometry the locations must lie within
    #[arg(long)]
    pub coords: Option<String>,

    /// Vertical level: `v`, `lo/hi`, `v1,v2,...` or `Rn/start/step`
    #[arg(long, allow_hyphen_values = true)]
    pub z: Option<String>,

    #[arg(long)]
    pub offset: Option<usize>,

    /// Maximum number of locations; 0 means no limit
    #[arg(long)]
    pub limit: Option<usize>,

    /// Keep only this location `_id`
    #[arg(long)]
    pub identifier: Option<String>,

    /// Property equality filter, repeatable: `--property name=value`
    #[arg(long = "property", value_parser = parse_key_value)]
    pub properties: Vec<(String, String)>,

    /// Sort keys: `+name`, `-name` or `name`, comma separated
    #[arg(long)]
    pub sortby: Option<String>,

    /// Property allow-list, comma separated
    #[arg(long, value_delimiter = ',')]
    pub select_properties: Vec<String>,

    #[arg(long)]
    pub skip_geometry: bool,

    /// Drop locations without catalog items and expose their URLs
    #[arg(long)]
    pub with_catalog_items: bool,
}

fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))
}

/// The flat value list [`ItemsQuery`] takes, from the query-string form.
fn bbox_values(raw: Option<&str>) -> RiseResult<Vec<f64>> {
    let bbox = match raw.map(BboxQuery::parse).transpose()?.flatten() {
        Some(bbox) => bbox,
        None => return Ok(Vec::new()),
    };
    Ok(match bbox.z {
        Some((min_z, max_z)) => vec![
            bbox.min_x, bbox.min_y, min_z, bbox.max_x, bbox.max_y, max_z,
        ],
        None => vec![bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y],
    })
}

impl ItemsArgs {
    pub fn to_query(&self) -> RiseResult<ItemsQuery> {
        Ok(ItemsQuery {
            identifier: self.identifier.clone(),
            datetime: self.datetime.clone(),
            offset: self.offset,
            limit: self.limit,
            bbox: bbox_values(self.bbox.as_deref())?,
            wkt: self.coords.clone(),
            z: self.z.clone(),
        })
    }

    pub fn to_feature_options(&self, config: &RiseConfig) -> RiseResult<FeatureOptions> {
        let sortby = match &self.sortby {
            Some(sortby) => SortSpec::parse_list(sortby)?,
            None => Vec::new(),
        };
        Ok(FeatureOptions::new()
            .skip_geometry(self.skip_geometry)
            .select_properties(self.select_properties.iter().cloned())
            .with_properties(parse_property_filters(&self.properties))
            .with_fields_mapping(config.fields.clone())
            .sort_by(sortby))
    }
}

/// All locations matching `args`, as a FeatureCollection.
pub async fn items(
    source: &dyn LocationSource,
    config: &RiseConfig,
    args: &ItemsArgs,
) -> Result<GeoJsonOutput> {
    let query = args.to_query()?;
    let options = args.to_feature_options(config)?;

    let pages = source
        .get_or_fetch_all_pages(&config.location_endpoint)
        .await
        .context("Failed to load location pages")?;
    let mut response = LocationResponse::from_api_pages(pages, config.duplicate_policy)?;
    tracing::info!("Loaded {} locations", response.len());

    if args.with_catalog_items {
        let resolver = RelationshipResolver::new(config.catalog_item_host.as_str());
        response = response
            .drop_locations_without_catalogitems(&resolver)?
            .attach_catalog_item_urls(&resolver)?;
    }

    let response = query.run(response)?;
    Ok(response.to_geojson(&options)?)
}

/// A single location as a bare Feature.
pub async fn item(
    source: &dyn LocationSource,
    config: &RiseConfig,
    location_id: i64,
    skip_geometry: bool,
) -> Result<GeoJsonOutput> {
    let url = format!("{}/{}", config.location_endpoint, location_id);
    let body = match source.get_or_fetch(&url).await {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!("Lookup of {} failed: {:#}", url, e);
            return Err(RiseError::LocationNotFound(location_id.to_string()).into());
        }
    };

    let response = LocationResponse::from_value(body)?.drop_everything_but_one_location(location_id);
    let options = FeatureOptions::new()
        .skip_geometry(skip_geometry)
        .single_feature(true);
    Ok(response.to_geojson(&options)?)
}

/// Render locations joined with their time series, read from `results`.
pub async fn coverage(source: &dyn LocationSource, results: &Path) -> Result<CoverageCollection> {
    let content = tokio::fs::read_to_string(results)
        .await
        .with_context(|| format!("Failed to read results file: {:?}", results))?;
    let locations: Vec<TransformedLocationWithResults> =
        serde_json::from_str(&content).map_err(RiseError::from)?;

    let metadata = source
        .get_or_fetch_parameters()
        .await
        .context("Failed to load parameter metadata")?;
    Ok(CoverageBuilder::new(&metadata).render(&locations)?)
}

/// The configured filterable fields.
pub fn fields(config: &RiseConfig) -> Result<Value> {
    serde_json::to_value(&config.fields).map_err(|e| anyhow!("Failed to serialize fields: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("stateId=3").unwrap(),
            ("stateId".to_string(), "3".to_string())
        );
        assert_eq!(
            parse_key_value("name=a=b").unwrap(),
            ("name".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_bbox_values() {
        assert!(bbox_values(None).unwrap().is_empty());
        assert!(bbox_values(Some("")).unwrap().is_empty());
        assert_eq!(
            bbox_values(Some("-110,30,-100,45")).unwrap(),
            vec![-110.0, 30.0, -100.0, 45.0]
        );
        assert_eq!(bbox_values(Some("0,0,5,1,1,10")).unwrap().len(), 6);
        assert!(matches!(
            bbox_values(Some("1,2,3")),
            Err(RiseError::InvalidFilterExpression { .. })
        ));
    }

    #[test]
    fn test_items_args_to_query() {
        let args = ItemsArgs {
            bbox: Some("-110,30,-100,45".to_string()),
            offset: Some(2),
            coords: Some("POINT(1 1)".to_string()),
            ..Default::default()
        };
        let query = args.to_query().unwrap();
        assert_eq!(query.offset, Some(2));
        assert_eq!(query.bbox.len(), 4);
        assert_eq!(query.wkt.as_deref(), Some("POINT(1 1)"));
    }

    #[test]
    fn test_bad_sortby_is_query_error() {
        let args = ItemsArgs {
            sortby: Some("-".to_string()),
            ..Default::default()
        };
        let err = args.to_feature_options(&RiseConfig::default()).unwrap_err();
        assert!(err.is_query_error());
    }
}

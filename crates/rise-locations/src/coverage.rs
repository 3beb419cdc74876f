//! CoverageJSON serialization of locations joined with their time series.

use std::collections::BTreeMap;

use rise_protocol::{
    Coverage, CoverageCollection, CovJsonParameter, Domain, DomainType, Geometry, NdArray,
    ParameterMetadataMap, ParameterResults, RiseError, RiseResult,
    TransformedLocationWithResults,
};

use crate::response::require_attributes;

/// Builds a [`CoverageCollection`] with one coverage per location and
/// non-empty parameter series.
pub struct CoverageBuilder<'a> {
    metadata: &'a ParameterMetadataMap,
}

impl<'a> CoverageBuilder<'a> {
    pub fn new(metadata: &'a ParameterMetadataMap) -> Self {
        Self { metadata }
    }

    pub fn render(&self, locations: &[TransformedLocationWithResults]) -> RiseResult<CoverageCollection> {
        let mut coverages = Vec::new();

        for location in locations {
            let attrs = require_attributes(&location.location)?;

            for series in &location.parameters {
                series.validate()?;
                if series.is_empty() {
                    tracing::debug!(
                        "Skipping empty series {} for location {}",
                        series.catalog_item_id,
                        attrs.id
                    );
                    continue;
                }
                coverages.push(self.coverage_for(&attrs.location_coordinates, series)?);
            }
        }

        let parameters = self.parameters_for(locations);
        tracing::debug!(
            "Rendered {} coverages with {} parameters",
            coverages.len(),
            parameters.len()
        );
        Ok(CoverageCollection::new(coverages, parameters))
    }

    fn coverage_for(&self, geometry: &Geometry, series: &ParameterResults) -> RiseResult<Coverage> {
        let t_values = series.timeseries_dates.clone();

        let (domain_type, domain) = match geometry {
            Geometry::Point { coordinates } => match coordinates.as_slice() {
                [x, y, ..] => (DomainType::PointSeries, Domain::point_series(*x, *y, t_values)),
                _ => {
                    return Err(RiseError::malformed(format!(
                        "point for series {} has fewer than two ordinates",
                        series.catalog_item_id
                    )))
                }
            },
            Geometry::Polygon { coordinates } => (
                DomainType::PolygonSeries,
                Domain::polygon_series(vec![coordinates.clone()], t_values),
            ),
            Geometry::MultiPolygon { coordinates } => (
                DomainType::PolygonSeries,
                Domain::polygon_series(coordinates.clone(), t_values),
            ),
            other => {
                return Err(RiseError::malformed(format!(
                    "cannot build a coverage domain from a {} location",
                    other.type_name()
                )))
            }
        };

        let mut ranges = BTreeMap::new();
        ranges.insert(
            series.catalog_item_id.clone(),
            NdArray::time_series(series.timeseries_results.clone()),
        );

        Ok(Coverage::new(domain_type, domain, ranges))
    }

    fn parameters_for(
        &self,
        locations: &[TransformedLocationWithResults],
    ) -> BTreeMap<String, CovJsonParameter> {
        if locations.is_empty() {
            return self
                .metadata
                .iter()
                .map(|(id, meta)| (id.clone(), CovJsonParameter::from_metadata(id, meta)))
                .collect();
        }

        let mut parameters = BTreeMap::new();
        for series in locations.iter().flat_map(|loc| &loc.parameters) {
            let id = &series.catalog_item_id;
            if parameters.contains_key(id) {
                continue;
            }
            match self.metadata.get(id) {
                Some(meta) => {
                    parameters.insert(id.clone(), CovJsonParameter::from_metadata(id, meta));
                }
                None => tracing::debug!("No parameter metadata for {}", id),
            }
        }
        parameters
    }
}

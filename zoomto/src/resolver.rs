use crate::bbox::{BBox, merge};
use crate::data_service::{DatasetClient, DatasetQuery, ProbeError};
use crate::geometry::compute_bbox;
use crate::metrics_defs::{FALLBACK, PROBE_FAILURE, PROBE_SUCCESS};
use crate::template::{FilterTemplate, TemplateError};
use crate::types::{Feature, LocatorEntry, OUTPUT_CRS, ResolvedViewport, ZoomQuery, ZoomSettings};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Upper bound on dataset queries in flight for a single zoomTo request.
pub const DEFAULT_MAX_CONCURRENT_PROBES: usize = 8;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ZoomError {
    /// The configured filter of a catalog entry cannot be parsed.
    #[error("invalid filter template for dataset '{dataset}': {source}")]
    InvalidTemplate {
        dataset: String,
        source: TemplateError,
    },

    /// A query entry does not provide the values its filter needs.
    #[error("query does not match the filter of dataset '{dataset}': {source}")]
    MalformedQuery {
        dataset: String,
        source: TemplateError,
    },
}

/// Resolves zoomTo queries into viewports by probing the data service.
///
/// Query slot `i` is paired with catalog entry `i` of the requested locator
/// type. Every field mapping of a slot becomes one dataset query; the first
/// feature of each successful query contributes its geometry to the viewport.
/// Failed queries are skipped. Without any contribution the tenant's default
/// extent is returned.
#[derive(Clone)]
pub struct ZoomResolver {
    client: Arc<dyn DatasetClient>,
    max_concurrent_probes: usize,
}

impl ZoomResolver {
    pub fn new(client: Arc<dyn DatasetClient>) -> Self {
        Self::with_max_concurrent_probes(client, DEFAULT_MAX_CONCURRENT_PROBES)
    }

    /// A limit of 0 is treated as 1.
    pub fn with_max_concurrent_probes(client: Arc<dyn DatasetClient>, limit: usize) -> Self {
        ZoomResolver {
            client,
            max_concurrent_probes: limit.max(1),
        }
    }

    pub async fn resolve(
        &self,
        settings: &ZoomSettings,
        query: Option<&ZoomQuery>,
    ) -> Result<ResolvedViewport, ZoomError> {
        let Some(query) = query else {
            return Ok(fallback(settings));
        };

        let Some(entries) = settings.catalog.entries(&query.locator_type) else {
            tracing::debug!(locator_type = %query.locator_type, "Unknown locator type");
            return Ok(fallback(settings));
        };

        let mut total: Option<BBox> = None;
        let mut features = Vec::new();
        let mut min_scale = settings.min_scale;

        // Slots that have no catalog entry or no field mappings are skipped.
        for (entry, slot) in entries.iter().zip(&query.data) {
            if slot.is_empty() {
                continue;
            }

            let queries = build_queries(entry, slot, settings)?;
            let mut contributed = false;

            for (probe, result) in self.probe_slot(&settings.data_service_url, queries).await {
                match result.and_then(|feature| feature_bbox(&feature).map(|b| (feature, b))) {
                    Ok((feature, bbox)) => {
                        shared::counter!(PROBE_SUCCESS).increment(1);
                        features.push(feature);
                        total = Some(merge(total, bbox));
                        contributed = true;
                    }
                    Err(e) => {
                        shared::counter!(PROBE_FAILURE, "reason" => e.reason()).increment(1);
                        match e {
                            ProbeError::NoFeatures => tracing::debug!(
                                dataset = %probe.dataset,
                                filter = %probe.filter,
                                "No feature matched"
                            ),
                            _ => tracing::warn!(
                                dataset = %probe.dataset,
                                error = %e,
                                "Dataset query skipped"
                            ),
                        }
                    }
                }
            }

            if contributed {
                min_scale = entry.min_scale.unwrap_or(settings.min_scale);
            }
        }

        match total {
            Some(bbox) => Ok(ResolvedViewport {
                min_scale,
                crs: OUTPUT_CRS,
                bbox,
                features: Some(features),
            }),
            None => Ok(fallback(settings)),
        }
    }

    /// Runs the queries of one slot concurrently, at most
    /// `max_concurrent_probes` at a time. Results are returned in query
    /// order; a failing or panicking query does not affect the others.
    async fn probe_slot(
        &self,
        base_url: &url::Url,
        queries: Vec<DatasetQuery>,
    ) -> Vec<(DatasetQuery, Result<Feature, ProbeError>)> {
        let permits = Arc::new(Semaphore::new(self.max_concurrent_probes));
        let mut join_set = JoinSet::new();

        for (index, query) in queries.iter().enumerate() {
            let client = self.client.clone();
            let permits = permits.clone();
            let base_url = base_url.clone();
            let query = query.clone();
            join_set.spawn(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => client.first_feature(&base_url, &query).await,
                    Err(e) => Err(ProbeError::TaskFailed(e.to_string())),
                };
                (index, result)
            });
        }

        let mut results: Vec<Option<Result<Feature, ProbeError>>> =
            queries.iter().map(|_| None).collect();

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) => tracing::error!("Task panicked: {}", e),
            }
        }

        queries
            .into_iter()
            .zip(results)
            .map(|(query, result)| {
                let result = result.unwrap_or_else(|| {
                    Err(ProbeError::TaskFailed(format!(
                        "query on dataset '{}' did not complete",
                        query.dataset
                    )))
                });
                (query, result)
            })
            .collect()
    }
}

fn fallback(settings: &ZoomSettings) -> ResolvedViewport {
    shared::counter!(FALLBACK).increment(1);
    ResolvedViewport::fallback(settings)
}

/// Renders the filter of `entry` for every field mapping of the slot.
/// Nothing is queried when a single mapping does not fit.
fn build_queries(
    entry: &LocatorEntry,
    slot: &[Map<String, Value>],
    settings: &ZoomSettings,
) -> Result<Vec<DatasetQuery>, ZoomError> {
    let template =
        FilterTemplate::parse(&entry.filter).map_err(|source| ZoomError::InvalidTemplate {
            dataset: entry.dataset.clone(),
            source,
        })?;
    let bbox = entry.datasetbbox.unwrap_or(settings.canton_extent);

    slot.iter()
        .map(|fields| {
            let filter = template
                .render(fields)
                .map_err(|source| ZoomError::MalformedQuery {
                    dataset: entry.dataset.clone(),
                    source,
                })?;
            Ok::<_, ZoomError>(DatasetQuery {
                dataset: entry.dataset.clone(),
                filter,
                bbox,
            })
        })
        .collect()
}

fn feature_bbox(feature: &Feature) -> Result<BBox, ProbeError> {
    let coordinates = feature
        .get("geometry")
        .and_then(|geometry| geometry.get("coordinates"))
        .ok_or(ProbeError::MissingGeometry)?;

    compute_bbox(coordinates)?.ok_or(ProbeError::EmptyGeometry)
}

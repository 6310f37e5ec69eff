use crate::bbox::BBox;
use crate::geometry::GeometryError;
use crate::types::Feature;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::timeout;

/// Upper bound for a single dataset query, request and body included.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(thiserror::Error, Debug)]
pub enum ProbeError {
    #[error("invalid data service URL: {0}")]
    InvalidUrl(String),
    #[error("dataset query failed: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("dataset query timed out after {0:?}")]
    Timeout(Duration),
    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("response has no features")]
    NoFeatures,
    #[error("feature has no geometry coordinates")]
    MissingGeometry,
    #[error("feature geometry has no coordinates")]
    EmptyGeometry,
    #[error("invalid feature geometry: {0}")]
    InvalidGeometry(#[from] GeometryError),
    #[error("dataset query task failed: {0}")]
    TaskFailed(String),
}

impl ProbeError {
    /// Short label used to tag failure metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            ProbeError::InvalidUrl(_) => "invalid_url",
            ProbeError::ReqwestError(_) => "transport",
            ProbeError::Timeout(_) => "timeout",
            ProbeError::InvalidJson(_) => "invalid_json",
            ProbeError::NoFeatures => "no_features",
            ProbeError::MissingGeometry => "missing_geometry",
            ProbeError::EmptyGeometry => "empty_geometry",
            ProbeError::InvalidGeometry(_) => "invalid_geometry",
            ProbeError::TaskFailed(_) => "task_failed",
        }
    }
}

/// One feature query against a dataset of the data service.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetQuery {
    pub dataset: String,
    pub filter: String,
    pub bbox: BBox,
}

/// Issues dataset queries to the external geodata service.
#[async_trait]
pub trait DatasetClient: Send + Sync {
    /// Returns the first feature matching `query`, or [`ProbeError::NoFeatures`]
    /// when the response carries none.
    async fn first_feature(
        &self,
        base_url: &url::Url,
        query: &DatasetQuery,
    ) -> Result<Feature, ProbeError>;
}

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

/// [`DatasetClient`] talking to the data service over HTTP.
#[derive(Clone)]
pub struct DataServiceClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl DataServiceClient {
    pub fn new(timeout: Duration) -> Self {
        DataServiceClient {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    /// `{base_url}/{dataset}/`, tolerating a trailing slash on the base URL.
    fn dataset_url(base_url: &url::Url, dataset: &str) -> Result<url::Url, ProbeError> {
        let full_url = format!(
            "{}/{}/",
            base_url.as_str().trim_end_matches('/'),
            dataset
        );
        url::Url::parse(&full_url).map_err(|e| ProbeError::InvalidUrl(e.to_string()))
    }
}

impl Default for DataServiceClient {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

#[async_trait]
impl DatasetClient for DataServiceClient {
    async fn first_feature(
        &self,
        base_url: &url::Url,
        query: &DatasetQuery,
    ) -> Result<Feature, ProbeError> {
        let url = Self::dataset_url(base_url, &query.dataset)?;
        let bbox = query.bbox.to_query_string();

        let request = async {
            let response = self
                .client
                .get(url)
                .query(&[("bbox", bbox.as_str()), ("filter", query.filter.as_str())])
                .send()
                .await?;

            // The status code is not inspected, only the body decides.
            tracing::debug!(
                dataset = %query.dataset,
                status = %response.status(),
                "Dataset query answered"
            );
            let body = response.bytes().await?;
            Ok::<_, ProbeError>(body)
        };

        let body = timeout(self.timeout, request)
            .await
            .map_err(|_| ProbeError::Timeout(self.timeout))??;

        let collection: FeatureCollection = serde_json::from_slice(&body)?;
        collection
            .features
            .into_iter()
            .next()
            .ok_or(ProbeError::NoFeatures)
    }
}

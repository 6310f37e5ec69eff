use async_trait::async_trait;
use zoomto::data_service::{DatasetClient, DatasetQuery, ProbeError};
use zoomto::types::Feature;

/// Answers every dataset query with the same feature.
pub struct StaticDatasetClient {
    feature: Feature,
}

impl StaticDatasetClient {
    pub fn new(feature: Feature) -> Self {
        StaticDatasetClient { feature }
    }
}

#[async_trait]
impl DatasetClient for StaticDatasetClient {
    async fn first_feature(
        &self,
        _base_url: &url::Url,
        _query: &DatasetQuery,
    ) -> Result<Feature, ProbeError> {
        Ok(self.feature.clone())
    }
}

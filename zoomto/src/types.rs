use crate::bbox::BBox;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Coordinate reference system of every resolved viewport.
pub const OUTPUT_CRS: &str = "EPSG:2056";

/// A GeoJSON feature as returned by the data service. Passed through unchanged.
pub type Feature = Value;

/// One configured dataset probe, paired positionally with a query slot.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LocatorEntry {
    pub dataset: String,
    /// Filter template. Configured either as a string or as a JSON array, in
    /// which case its compact JSON text is the template.
    #[serde(deserialize_with = "deserialize_filter")]
    pub filter: String,
    /// Bound for the dataset query. Defaults to the tenant's canton extent.
    #[serde(default)]
    pub datasetbbox: Option<BBox>,
    /// Minimum display scale. Defaults to the tenant's minimum scale.
    #[serde(default, rename = "minScale")]
    pub min_scale: Option<u64>,
}

fn deserialize_filter<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(template) => Ok(template),
        value @ Value::Array(_) => Ok(value.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "filter must be a string or an array, found {other}"
        ))),
    }
}

/// Locator type name to its ordered dataset probes.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct LocatorCatalog(HashMap<String, Vec<LocatorEntry>>);

impl LocatorCatalog {
    pub fn new(entries: HashMap<String, Vec<LocatorEntry>>) -> Self {
        LocatorCatalog(entries)
    }

    pub fn entries(&self, locator_type: &str) -> Option<&[LocatorEntry]> {
        self.0.get(locator_type).map(Vec::as_slice)
    }
}

/// Everything the resolver needs from the tenant configuration, already validated.
#[derive(Clone, Debug)]
pub struct ZoomSettings {
    pub data_service_url: url::Url,
    pub min_scale: u64,
    pub canton_extent: BBox,
    pub catalog: LocatorCatalog,
}

/// Inbound zoomTo request.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ZoomQuery {
    #[serde(rename = "type")]
    pub locator_type: String,
    /// `data[i]` lists the field mappings probed against catalog entry `i`.
    #[serde(default)]
    pub data: Vec<Vec<Map<String, Value>>>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ResolvedViewport {
    #[serde(rename = "minScale")]
    pub min_scale: u64,
    pub crs: &'static str,
    pub bbox: BBox,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<Feature>>,
}

impl ResolvedViewport {
    pub fn fallback(settings: &ZoomSettings) -> Self {
        ResolvedViewport {
            min_scale: settings.min_scale,
            crs: OUTPUT_CRS,
            bbox: settings.canton_extent,
            features: None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.features.is_none()
    }
}

/// Response envelope of the zoomTo endpoint.
#[derive(Debug, Serialize)]
pub struct ZoomResponse {
    pub result: ResolvedViewport,
}

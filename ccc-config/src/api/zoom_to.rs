use crate::errors::ConfigServiceError;
use crate::tenant::TenantSnapshot;
use hyper::body::Bytes;
use serde_json::Value;
use zoomto::{LocatorCatalog, ZoomQuery, ZoomResolver, ZoomResponse};

/// Parses a zoomTo request body as JSON.
///
/// An empty body, `null` and `{}` carry no query and resolve to the default
/// extent. Anything else that is valid JSON is returned for interpretation
/// against the catalog.
pub fn parse_body(body: &Bytes) -> Result<Option<Value>, ConfigServiceError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|_| ConfigServiceError::BadRequest("Request data is not JSON".to_string()))?;

    match &value {
        Value::Null => Ok(None),
        Value::Object(fields) if fields.is_empty() => Ok(None),
        _ => Ok(Some(value)),
    }
}

/// Interprets a parsed body against the catalog.
///
/// Without a `type` naming a catalogued locator the request resolves to the
/// default extent, whatever `data` holds. Only queries for a known locator
/// type must match the query shape.
pub fn typed_query(
    body: Value,
    catalog: &LocatorCatalog,
) -> Result<Option<ZoomQuery>, ConfigServiceError> {
    let Some(locator_type) = body.get("type").and_then(Value::as_str) else {
        tracing::debug!("zoomTo request without locator type");
        return Ok(None);
    };
    if catalog.entries(locator_type).is_none() {
        tracing::debug!(locator_type, "Unknown locator type");
        return Ok(None);
    }

    serde_json::from_value(body)
        .map(Some)
        .map_err(|e| ConfigServiceError::BadRequest(format!("Invalid zoomTo query: {e}")))
}

/// Resolves the zoomTo request `body` against the tenant configuration.
pub async fn zoom_to(
    resolver: &ZoomResolver,
    snapshot: &TenantSnapshot,
    body: &Bytes,
) -> Result<ZoomResponse, ConfigServiceError> {
    let body = parse_body(body)?;
    let settings = snapshot.zoom_settings()?;
    let query = match body {
        Some(body) => typed_query(body, &settings.catalog)?,
        None => None,
    };

    let result = resolver.resolve(&settings, query.as_ref()).await?;

    tracing::debug!(
        tenant = snapshot.tenant(),
        fallback = result.is_fallback(),
        "Resolved zoomTo query"
    );
    Ok(ZoomResponse { result })
}

use crate::errors::ConfigServiceError;
use crate::tenant::TenantSnapshot;
use serde_json::Value;

pub const MIN_EDIT_SCALE: &str = "minEditScale";

/// Returns the CCC client configuration of `app_id`.
///
/// A missing `minEditScale` is filled in from the tenant's minimum scale. The
/// returned value is a copy; the snapshot is not modified.
pub fn app_config(snapshot: &TenantSnapshot, app_id: &str) -> Result<Value, ConfigServiceError> {
    let apps = snapshot.client_apps()?;
    let mut config = apps
        .get(app_id)
        .cloned()
        .ok_or_else(|| ConfigServiceError::AppNotFound(app_id.to_string()))?;

    if let Value::Object(fields) = &mut config
        && !fields.contains_key(MIN_EDIT_SCALE)
    {
        fields.insert(MIN_EDIT_SCALE.to_string(), snapshot.min_scale()?.into());
    }

    Ok(config)
}

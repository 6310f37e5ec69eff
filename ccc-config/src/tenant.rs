//! Tenant configuration lookup.
//!
//! A [`ConfigProvider`] hands out an owned [`TenantSnapshot`] per request.
//! Snapshot values are validated lazily by the accessors, so a malformed
//! zoomTo setting fails zoomTo requests only and leaves the app config
//! endpoint working.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use zoomto::{BBox, LocatorCatalog, ZoomSettings};

pub const DEFAULT_MIN_SCALE: &str = "1000";
pub const DEFAULT_CANTON_EXTENT: &str = "[2590983.475, 1212806.115, 2646267.025, 1262755.009]";
pub const DEFAULT_DATA_SERVICE_URL: &str = "http://sogis-data-service:9090/";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("no configuration for tenant '{0}'")]
    UnknownTenant(String),
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl ToString) -> Self {
        ConfigError::Invalid {
            key,
            reason: reason.to_string(),
        }
    }
}

/// Raw configuration of one tenant, as stored.
///
/// Example:
/// ```yaml
/// client_config:
///   myApp:
///     title: Test App
///     editGeomType: Point
///     initialLayers: [Gemeindegrenzen]
/// min_scale: 1000
/// canton_extent: [2590983.475, 1212806.115, 2646267.025, 1262755.009]
/// data_service_url: http://sogis-data-service:9090/
/// zoomto:
///   PriorityLocator:
///     - dataset: Gemeindegrenzen
///       filter: '[["bfs_nr", "=", "{bfs}"]]'
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct TenantSettings {
    pub client_config: Option<Value>,
    pub min_scale: Option<Value>,
    pub canton_extent: Option<Value>,
    pub data_service_url: Option<Value>,
    pub zoomto: Option<Value>,
}

/// Immutable per-request view of a tenant's configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct TenantSnapshot {
    tenant: String,
    settings: TenantSettings,
}

impl TenantSnapshot {
    pub fn new(tenant: impl Into<String>, settings: TenantSettings) -> Self {
        TenantSnapshot {
            tenant: tenant.into(),
            settings,
        }
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// Client configuration objects keyed by application id.
    pub fn client_apps(&self) -> Result<&Map<String, Value>, ConfigError> {
        match &self.settings.client_config {
            Some(Value::Object(apps)) => Ok(apps),
            Some(_) => Err(ConfigError::invalid(
                "client_config",
                "not a JSON object",
            )),
            None => Err(ConfigError::Missing("client_config")),
        }
    }

    pub fn min_scale(&self) -> Result<u64, ConfigError> {
        match &self.settings.min_scale {
            Some(Value::Number(n)) => n
                .as_u64()
                .ok_or_else(|| ConfigError::invalid("min_scale", "not a valid integer")),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid("min_scale", "not a valid integer")),
            Some(_) => Err(ConfigError::invalid("min_scale", "not a valid integer")),
            None => Err(ConfigError::Missing("min_scale")),
        }
    }

    pub fn canton_extent(&self) -> Result<BBox, ConfigError> {
        let value = self
            .settings
            .canton_extent
            .clone()
            .ok_or(ConfigError::Missing("canton_extent"))?;
        serde_json::from_value(value).map_err(|e| ConfigError::invalid("canton_extent", e))
    }

    pub fn data_service_url(&self) -> Result<url::Url, ConfigError> {
        match &self.settings.data_service_url {
            Some(Value::String(s)) if !s.trim().is_empty() => {
                url::Url::parse(s.trim()).map_err(|e| ConfigError::invalid("data_service_url", e))
            }
            Some(Value::String(_)) | None => Err(ConfigError::Missing("data_service_url")),
            Some(_) => Err(ConfigError::invalid("data_service_url", "not a string")),
        }
    }

    pub fn catalog(&self) -> Result<LocatorCatalog, ConfigError> {
        let value = self
            .settings
            .zoomto
            .clone()
            .ok_or(ConfigError::Missing("zoomto"))?;
        serde_json::from_value(value).map_err(|e| ConfigError::invalid("zoomto", e))
    }

    /// Everything the zoomTo resolver needs, validated.
    pub fn zoom_settings(&self) -> Result<ZoomSettings, ConfigError> {
        Ok(ZoomSettings {
            data_service_url: self.data_service_url()?,
            min_scale: self.min_scale()?,
            canton_extent: self.canton_extent()?,
            catalog: self.catalog()?,
        })
    }
}

pub trait ConfigProvider: Send + Sync {
    fn snapshot(&self, tenant: &str) -> Result<TenantSnapshot, ConfigError>;
}

/// Tenants declared in the service configuration file.
pub struct StaticConfigProvider {
    tenants: HashMap<String, TenantSettings>,
}

impl StaticConfigProvider {
    pub fn new(tenants: HashMap<String, TenantSettings>) -> Self {
        StaticConfigProvider { tenants }
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn snapshot(&self, tenant: &str) -> Result<TenantSnapshot, ConfigError> {
        self.tenants
            .get(tenant)
            .map(|settings| TenantSnapshot::new(tenant, settings.clone()))
            .ok_or_else(|| ConfigError::UnknownTenant(tenant.to_string()))
    }
}

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Single tenant configured through environment variables, read on every
/// request:
///
/// | Variable | Setting | Default |
/// |---|---|---|
/// | `CCC_CLIENT_CONFIG` | `client_config` (JSON) | `{}` |
/// | `CCC_ZOOMTO_MIN_SCALE` | `min_scale` | `1000` |
/// | `CCC_ZOOMTO_CANTON_EXTENT` | `canton_extent` (JSON) | canton Solothurn |
/// | `CCC_ZOOMTO_CONFIG` | `zoomto` (JSON) | `{}` |
/// | `CCC_ZOOMTO_DATA_SERVICE_URL` | `data_service_url` | `http://sogis-data-service:9090/` |
pub struct EnvConfigProvider {
    lookup: Lookup,
}

impl EnvConfigProvider {
    pub fn new() -> Self {
        Self::with_lookup(|key| std::env::var(key).ok())
    }

    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        EnvConfigProvider {
            lookup: Box::new(lookup),
        }
    }

    fn var(&self, key: &str, default: &str) -> String {
        (self.lookup)(key).unwrap_or_else(|| default.to_string())
    }

    /// Parses a JSON-valued variable. Unparsable text is kept as a string so
    /// that the accessor reading it reports it as invalid.
    fn json_var(&self, key: &str, default: &str) -> Value {
        let raw = self.var(key, default);
        serde_json::from_str(&raw).unwrap_or(Value::String(raw))
    }
}

impl Default for EnvConfigProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn snapshot(&self, tenant: &str) -> Result<TenantSnapshot, ConfigError> {
        let settings = TenantSettings {
            client_config: Some(self.json_var("CCC_CLIENT_CONFIG", "{}")),
            min_scale: Some(Value::String(
                self.var("CCC_ZOOMTO_MIN_SCALE", DEFAULT_MIN_SCALE),
            )),
            canton_extent: Some(self.json_var("CCC_ZOOMTO_CANTON_EXTENT", DEFAULT_CANTON_EXTENT)),
            data_service_url: Some(Value::String(
                self.var("CCC_ZOOMTO_DATA_SERVICE_URL", DEFAULT_DATA_SERVICE_URL),
            )),
            zoomto: Some(self.json_var("CCC_ZOOMTO_CONFIG", "{}")),
        };
        Ok(TenantSnapshot::new(tenant, settings))
    }
}

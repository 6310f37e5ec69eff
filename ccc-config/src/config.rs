use crate::tenant::TenantSettings;
use http::header::HeaderName;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Listener and admin listener both use {0}")]
    DuplicateListener(String),

    #[error("Probe timeout cannot be 0")]
    InvalidProbeTimeout,

    #[error("Probe concurrency cannot be 0")]
    InvalidProbeConcurrency,

    #[error("Invalid tenant header: {0}")]
    InvalidTenantHeader(String),

    #[error("Static tenant source without tenants")]
    NoTenants,
}

/// Config service configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Main listener serving the client config and zoomTo endpoints
    pub listener: Listener,
    /// Admin listener for health checks
    pub admin_listener: Listener,
    /// Request header selecting the tenant
    #[serde(default = "default_tenant_header")]
    pub tenant_header: String,
    /// Tenant used when the request does not name one
    #[serde(default = "default_tenant")]
    pub default_tenant: String,
    /// Timeout of a single data service request
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    /// Dataset queries in flight per zoomTo request
    #[serde(default = "default_max_concurrent_probes")]
    pub max_concurrent_probes: usize,
    pub tenant_source: TenantSource,
}

fn default_tenant_header() -> String {
    "x-tenant".into()
}

fn default_tenant() -> String {
    "default".into()
}

fn default_probe_timeout_secs() -> u64 {
    zoomto::DEFAULT_PROBE_TIMEOUT.as_secs()
}

fn default_max_concurrent_probes() -> usize {
    zoomto::DEFAULT_MAX_CONCURRENT_PROBES
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.listener == self.admin_listener {
            return Err(ValidationError::DuplicateListener(format!(
                "{}:{}",
                self.listener.host, self.listener.port
            )));
        }

        if self.probe_timeout_secs == 0 {
            return Err(ValidationError::InvalidProbeTimeout);
        }

        if self.max_concurrent_probes == 0 {
            return Err(ValidationError::InvalidProbeConcurrency);
        }

        self.tenant_header()?;

        if let TenantSource::Static { tenants } = &self.tenant_source
            && tenants.is_empty()
        {
            return Err(ValidationError::NoTenants);
        }

        Ok(())
    }

    pub fn tenant_header(&self) -> Result<HeaderName, ValidationError> {
        HeaderName::from_bytes(self.tenant_header.as_bytes())
            .map_err(|_| ValidationError::InvalidTenantHeader(self.tenant_header.clone()))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// Where tenant configuration is read from
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TenantSource {
    /// A single tenant read from `CCC_*` environment variables on every request
    Env,
    /// Tenants declared inline
    Static {
        tenants: HashMap<String, TenantSettings>,
    },
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

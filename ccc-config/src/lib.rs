pub mod api;
pub mod config;
pub mod errors;
pub mod metrics_defs;
pub mod service;
pub mod tenant;

#[cfg(test)]
mod testutils;

use crate::config::{Config, TenantSource};
use crate::errors::ConfigServiceError;
use crate::service::ConfigService;
use crate::tenant::{ConfigProvider, EnvConfigProvider, StaticConfigProvider};
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::sync::Arc;
use zoomto::{DataServiceClient, ZoomResolver};

/// Serves the config service and its admin endpoints until either listener fails.
pub async fn run(config: Config) -> Result<(), ConfigServiceError> {
    let tenant_header = config
        .tenant_header()
        .map_err(|e| ConfigServiceError::InternalError(e.to_string()))?;

    let resolver = ZoomResolver::with_max_concurrent_probes(
        Arc::new(DataServiceClient::new(config.probe_timeout())),
        config.max_concurrent_probes,
    );
    let provider: Arc<dyn ConfigProvider> = match config.tenant_source {
        TenantSource::Env => Arc::new(EnvConfigProvider::new()),
        TenantSource::Static { tenants } => Arc::new(StaticConfigProvider::new(tenants)),
    };

    let service = ConfigService::new(provider, resolver, tenant_header, config.default_tenant);
    let admin_service = AdminService::<_, ConfigServiceError>::new(|| true);

    let service_task = run_http_service(&config.listener.host, config.listener.port, service);
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        admin_service,
    );
    tokio::try_join!(service_task, admin_task)?;
    Ok(())
}

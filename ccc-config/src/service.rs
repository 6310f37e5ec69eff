use crate::api::app_config::app_config;
use crate::api::utils::{query_param, read_body};
use crate::api::zoom_to::zoom_to;
use crate::errors::ConfigServiceError;
use crate::metrics_defs::REQUEST_DURATION;
use crate::tenant::ConfigProvider;
use http::header::HeaderName;
use http_body_util::combinators::BoxBody;
use hyper::body::Bytes;
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use shared::http::make_json_response;
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use zoomto::ZoomResolver;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Endpoint {
    AppConfig,
    ZoomTo,
}

impl Endpoint {
    fn route(method: &Method, path: &str) -> Result<Self, ConfigServiceError> {
        let endpoint = match path {
            "/" => Endpoint::AppConfig,
            "/zoomTo" | "/zoomTo/" => Endpoint::ZoomTo,
            _ => return Err(ConfigServiceError::NotFound),
        };

        let allowed = match endpoint {
            Endpoint::AppConfig => method == Method::GET || method == Method::HEAD,
            Endpoint::ZoomTo => method == Method::POST,
        };
        if !allowed {
            return Err(ConfigServiceError::MethodNotAllowed);
        }
        Ok(endpoint)
    }

    fn name(&self) -> &'static str {
        match self {
            Endpoint::AppConfig => "app_config",
            Endpoint::ZoomTo => "zoom_to",
        }
    }
}

struct ConfigServiceInner {
    provider: Arc<dyn ConfigProvider>,
    resolver: ZoomResolver,
    tenant_header: HeaderName,
    default_tenant: String,
}

/// Serves the CCC client configuration (`GET /?app=<id>`) and zoomTo
/// resolution (`POST /zoomTo`).
#[derive(Clone)]
pub struct ConfigService {
    inner: Arc<ConfigServiceInner>,
}

impl ConfigService {
    pub fn new(
        provider: Arc<dyn ConfigProvider>,
        resolver: ZoomResolver,
        tenant_header: HeaderName,
        default_tenant: String,
    ) -> Self {
        ConfigService {
            inner: Arc::new(ConfigServiceInner {
                provider,
                resolver,
                tenant_header,
                default_tenant,
            }),
        }
    }

    pub async fn handle<B>(&self, req: Request<B>) -> Response<BoxBody<Bytes, Infallible>>
    where
        B: hyper::body::Body,
        B::Error: std::fmt::Display,
    {
        let start = Instant::now();
        let endpoint = Endpoint::route(req.method(), req.uri().path());
        let endpoint_name = endpoint.as_ref().map(Endpoint::name).unwrap_or("unknown");

        let response = match endpoint {
            Ok(endpoint) => match self.dispatch(endpoint, req).await {
                Ok(response) => response,
                Err(e) => e.into_response(),
            },
            Err(e) => e.into_response(),
        };

        shared::histogram!(
            REQUEST_DURATION,
            "endpoint" => endpoint_name,
            "status" => response.status().as_u16().to_string()
        )
        .record(start.elapsed().as_secs_f64());

        response
    }

    async fn dispatch<B>(
        &self,
        endpoint: Endpoint,
        req: Request<B>,
    ) -> Result<Response<BoxBody<Bytes, Infallible>>, ConfigServiceError>
    where
        B: hyper::body::Body,
        B::Error: std::fmt::Display,
    {
        let tenant = self.tenant(&req);

        match endpoint {
            Endpoint::AppConfig => {
                let app = query_param(req.uri().query(), "app").ok_or_else(|| {
                    ConfigServiceError::BadRequest("Missing required parameter: app".to_string())
                })?;
                let snapshot = self.inner.provider.snapshot(&tenant)?;
                let config = app_config(&snapshot, &app)?;
                Ok(make_json_response(StatusCode::OK, &config))
            }
            Endpoint::ZoomTo => {
                let body = read_body(req.into_body()).await?;
                let snapshot = self.inner.provider.snapshot(&tenant)?;
                let response = zoom_to(&self.inner.resolver, &snapshot, &body).await?;
                Ok(make_json_response(StatusCode::OK, &response))
            }
        }
    }

    /// Tenant named by the tenant header, or the default tenant.
    fn tenant<B>(&self, req: &Request<B>) -> String {
        req.headers()
            .get(&self.inner.tenant_header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|tenant| !tenant.is_empty())
            .unwrap_or(&self.inner.default_tenant)
            .to_string()
    }
}

impl<B> Service<Request<B>> for ConfigService
where
    B: hyper::body::Body + Send + 'static,
    B::Data: Send,
    B::Error: std::fmt::Display,
{
    type Response = Response<BoxBody<Bytes, Infallible>>;
    type Error = ConfigServiceError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::{StaticConfigProvider, TenantSettings};
    use crate::testutils::StaticDatasetClient;
    use http_body_util::{BodyExt, Full};
    use serde_json::{Value, json};
    use std::collections::HashMap;

    fn tenant(min_scale: Value) -> TenantSettings {
        TenantSettings {
            client_config: Some(json!({
                "myApp": {"title": "Test App", "notifyLayers": ["Gemeindegrenzen"]}
            })),
            min_scale: Some(min_scale),
            canton_extent: Some(json!([0, 0, 100, 100])),
            data_service_url: Some(json!("http://data-service:9090/")),
            zoomto: Some(json!({
                "MunicipalityLocator": [{"dataset": "Gemeindegrenzen", "filter": [["bfs_nr", "=", "{bfs}"]]}]
            })),
        }
    }

    fn service() -> ConfigService {
        let provider = StaticConfigProvider::new(HashMap::from([
            ("default".to_string(), tenant(json!(1000))),
            ("other".to_string(), tenant(json!(5000))),
            ("broken".to_string(), tenant(json!("not a number"))),
        ]));
        let resolver = ZoomResolver::new(Arc::new(StaticDatasetClient::new(json!({
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [10, 20]}
        }))));

        ConfigService::new(
            Arc::new(provider),
            resolver,
            HeaderName::from_static("x-tenant"),
            "default".to_string(),
        )
    }

    fn request(method: Method, uri: &str, tenant: Option<&str>, body: &str) -> Request<Full<Bytes>> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tenant) = tenant {
            builder = builder.header("x-tenant", tenant);
        }
        builder
            .body(Full::new(Bytes::copy_from_slice(body.as_bytes())))
            .unwrap()
    }

    async fn call(req: Request<Full<Bytes>>) -> (StatusCode, Value) {
        let response = service().call(req).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_app_config() {
        let (status, body) = call(request(Method::GET, "/?app=myApp", None, "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"title": "Test App", "notifyLayers": ["Gemeindegrenzen"], "minEditScale": 1000})
        );

        // Tenant selected through the header
        let (status, body) = call(request(Method::GET, "/?App=myApp", Some("other"), "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["minEditScale"], 5000);
    }

    #[tokio::test]
    async fn test_app_config_errors() {
        let (status, body) = call(request(Method::GET, "/?app=unknown", None, "")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "No configuration for application unknown");

        let (status, _) = call(request(Method::GET, "/", None, "")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(request(Method::GET, "/?app=myApp", Some("broken"), "")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (status, _) = call(request(Method::GET, "/?app=myApp", Some("missing"), "")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_zoom_to() {
        let (status, body) = call(request(
            Method::POST,
            "/zoomTo",
            None,
            r#"{"type": "MunicipalityLocator", "data": [[{"bfs": 2601}]]}"#,
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["bbox"], json!([10.0, 20.0, 10.0, 20.0]));
        assert_eq!(body["result"]["minScale"], 1000);
        assert_eq!(body["result"]["features"].as_array().unwrap().len(), 1);

        let (status, body) = call(request(Method::POST, "/zoomTo", None, "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["bbox"], json!([0.0, 0.0, 100.0, 100.0]));
        assert!(body["result"].get("features").is_none());
    }

    #[tokio::test]
    async fn test_zoom_to_errors() {
        let (status, _) = call(request(Method::POST, "/zoomTo", None, "not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(request(Method::POST, "/zoomTo", Some("broken"), "")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_routing() {
        let (status, _) = call(request(Method::GET, "/zoomTo", None, "")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, _) = call(request(Method::POST, "/?app=myApp", None, "")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, _) = call(request(Method::GET, "/api/", None, "")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

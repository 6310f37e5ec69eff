use crate::tenant::ConfigError;
use http_body_util::combinators::BoxBody;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;
use shared::http::make_json_response;
use std::convert::Infallible;
use thiserror::Error;
use zoomto::ZoomError;

/// Result type alias for config service operations
pub type Result<T, E = ConfigServiceError> = std::result::Result<T, E>;

/// Errors that can occur while serving a request
#[derive(Error, Debug)]
pub enum ConfigServiceError {
    #[error("{0}")]
    BadRequest(String),

    #[error("No configuration for application {0}")]
    AppNotFound(String),

    #[error("Not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Zoom(#[from] ZoomError),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize)]
struct ApiErrorResponse {
    message: String,
}

impl ConfigServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ConfigServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ConfigServiceError::AppNotFound(_) | ConfigServiceError::NotFound => {
                StatusCode::NOT_FOUND
            }
            ConfigServiceError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ConfigServiceError::Zoom(ZoomError::MalformedQuery { .. }) => StatusCode::BAD_REQUEST,
            ConfigServiceError::Config(_)
            | ConfigServiceError::Zoom(ZoomError::InvalidTemplate { .. })
            | ConfigServiceError::InternalError(_)
            | ConfigServiceError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON error response of the form `{"message": "..."}`.
    pub fn into_response(self) -> Response<BoxBody<Bytes, Infallible>> {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        make_json_response(
            status,
            &ApiErrorResponse {
                message: self.to_string(),
            },
        )
    }
}

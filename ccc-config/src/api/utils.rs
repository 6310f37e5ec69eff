use crate::errors::ConfigServiceError;
use http_body_util::BodyExt;
use hyper::body::Bytes;

/// Collects the complete request body.
pub async fn read_body<B>(body: B) -> Result<Bytes, ConfigServiceError>
where
    B: hyper::body::Body,
    B::Error: std::fmt::Display,
{
    body.collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(|e| ConfigServiceError::BadRequest(format!("Failed to read request body: {e}")))
}

/// Looks up a query string parameter. Parameter names match case-insensitively.
pub fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.into_owned())
}

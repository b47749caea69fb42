//! Request correlation and per-request accounting.
//!
//! Every request carries an `x-request-id`: the caller's value when present,
//! a fresh UUID otherwise. The id is echoed on the response, made available
//! to handlers through the [`RequestId`] extractor, and attached to the
//! access log line and HTTP metrics emitted when the response leaves.

use axum::{
    extract::{FromRequestParts, MatchedPath, Request},
    http::{HeaderMap, HeaderValue, StatusCode, request::Parts},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use uuid::Uuid;

use crate::{logging, metrics};

/// Header name for request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation id of the request being served
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    /// Reuse the caller's id, or mint one when absent or blank.
    fn from_headers(headers: &HeaderMap) -> Self {
        let supplied = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty());

        match supplied {
            Some(id) => Self(id.to_owned()),
            None => Self(Uuid::new_v4().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<RequestId>().cloned().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "request id middleware is not installed",
        ))
    }
}

/// Tag the request with an id, then log and count it once answered.
///
/// Metrics are labelled with the matched route template (`/api/v1/teams/{team_id}`)
/// rather than the raw path so ids don't explode label cardinality.
///
/// ```no_run
/// use axum::{Router, middleware, routing::get};
/// use rt_server::api::request_id::request_id_middleware;
///
/// let app: Router = Router::new()
///     .route("/ping", get(|| async { "pong" }))
///     .layer(middleware::from_fn(request_id_middleware));
/// ```
pub async fn request_id_middleware(
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let started = Instant::now();
    let request_id = RequestId::from_headers(request.headers());
    let method = request.method().clone();
    let route = match request.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_owned(),
        None => request.uri().path().to_owned(),
    };

    tracing::debug!(request_id = %request_id.as_str(), %method, uri = %request.uri(), "Request started");
    request.extensions_mut().insert(request_id.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let elapsed = started.elapsed();
    let status = response.status().as_u16();
    logging::log_api_request(
        request_id.as_str(),
        method.as_str(),
        &route,
        status,
        elapsed.as_millis() as u64,
    );
    metrics::http_requests_total(method.as_str(), &route, status);
    metrics::http_request_duration_ms(method.as_str(), &route, elapsed.as_secs_f64() * 1000.0);

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_id_is_kept() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("judge-table-7"));

        assert_eq!(RequestId::from_headers(&headers).as_str(), "judge-table-7");
    }

    #[test]
    fn test_missing_or_blank_id_is_minted() {
        let missing = RequestId::from_headers(&HeaderMap::new());
        assert!(Uuid::parse_str(missing.as_str()).is_ok());

        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static(""));
        let blank = RequestId::from_headers(&headers);
        assert!(Uuid::parse_str(blank.as_str()).is_ok());
    }

    #[test]
    fn test_minted_ids_differ() {
        let headers = HeaderMap::new();
        assert_ne!(
            RequestId::from_headers(&headers),
            RequestId::from_headers(&headers)
        );
    }
}

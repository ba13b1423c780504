//! Request-scoped middleware.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::common::envelope::{RequestMeta, API_VERSION};

/// Attach a `RequestMeta` (request id + start time) to every request and
/// stamp `X-API-Version` / `X-Request-Id` on every response. An incoming
/// `X-Request-Id` header is preserved so callers can correlate logs.
pub async fn request_meta_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request
        .extensions_mut()
        .insert(RequestMeta::new(request_id.clone()));

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("x-api-version", HeaderValue::from_static(API_VERSION));
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert("x-request-id", value);
    }
    response
}

//! The stable API envelope and error taxonomy.
//!
//! Every JSON response on the wire is exactly one of two shapes:
//!
//! ```json
//! { "ok": true,  "data": ..., "meta": { "version": "v1", ... } }
//! { "ok": false, "error": "CODE", "message": "human text", "meta": { ... } }
//! ```

use std::time::Instant;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use serde::Serialize;

/// API version reported in every response envelope and `X-API-Version` header.
pub const API_VERSION: &str = "v1";

/// Wire error codes with a 1:1 HTTP status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    Validation,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    Conflict,
    Unprocessable,
    RateLimit,
    Internal,
    ServiceUnavailable,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::RateLimit => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Default mapping for cases where only an HTTP status is known.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST => ErrorCode::BadRequest,
            StatusCode::UNAUTHORIZED => ErrorCode::Unauthorized,
            StatusCode::FORBIDDEN => ErrorCode::Forbidden,
            StatusCode::NOT_FOUND => ErrorCode::NotFound,
            StatusCode::METHOD_NOT_ALLOWED => ErrorCode::MethodNotAllowed,
            StatusCode::CONFLICT => ErrorCode::Conflict,
            StatusCode::UNPROCESSABLE_ENTITY => ErrorCode::Unprocessable,
            StatusCode::TOO_MANY_REQUESTS => ErrorCode::RateLimit,
            StatusCode::SERVICE_UNAVAILABLE => ErrorCode::ServiceUnavailable,
            s if s.is_client_error() => ErrorCode::BadRequest,
            _ => ErrorCode::Internal,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::Validation => "VALIDATION",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::Unprocessable => "UNPROCESSABLE",
            ErrorCode::RateLimit => "RATE_LIMIT",
            ErrorCode::Internal => "INTERNAL",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }
}

/// A surfaced request error carrying its wire code and human message.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}: {message}", code.as_str())]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }
}

/// Per-request metadata populated by the request-id middleware.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub request_id: String,
    pub started: Instant,
}

impl RequestMeta {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            started: Instant::now(),
        }
    }
}

impl Default for RequestMeta {
    fn default() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }
}

#[derive(Debug, Serialize)]
struct ResponseMeta<'a> {
    version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    process_time_ms: Option<u64>,
}

impl<'a> ResponseMeta<'a> {
    fn from_request(meta: &'a RequestMeta) -> Self {
        Self {
            version: API_VERSION,
            request_id: Some(&meta.request_id),
            process_time_ms: Some(meta.started.elapsed().as_millis() as u64),
        }
    }
}

#[derive(Serialize)]
struct SuccessEnvelope<'a, T: Serialize> {
    ok: bool,
    data: T,
    meta: ResponseMeta<'a>,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    ok: bool,
    error: ErrorCode,
    message: &'a str,
    meta: ResponseMeta<'a>,
}

fn json_body(status: StatusCode, body: String) -> Response {
    Response::builder()
        .status(status)
        .header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        )
        .body(body.into())
        .unwrap_or_default()
}

/// Pretty-printed (2-space indent) success envelope.
pub fn json_ok<T: Serialize>(meta: &RequestMeta, data: T) -> Response {
    json_ok_with_status(meta, StatusCode::OK, data)
}

/// Success envelope with an explicit status (health uses 503 with `ok:true`
/// semantics reserved for errors, so health reports go through this).
pub fn json_ok_with_status<T: Serialize>(meta: &RequestMeta, status: StatusCode, data: T) -> Response {
    let envelope = SuccessEnvelope {
        ok: true,
        data,
        meta: ResponseMeta::from_request(meta),
    };
    match serde_json::to_string_pretty(&envelope) {
        Ok(body) => json_body(status, body),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize response envelope");
            json_error(meta, ApiError::internal("Internal server error"))
        }
    }
}

/// Pretty-printed error envelope; status comes from the error code.
pub fn json_error(meta: &RequestMeta, error: ApiError) -> Response {
    let envelope = ErrorEnvelope {
        ok: false,
        error: error.code,
        message: &error.message,
        meta: ResponseMeta::from_request(meta),
    };
    let body = serde_json::to_string_pretty(&envelope).unwrap_or_else(|_| {
        // Assembled by hand only if serde fails on a flat struct of strings.
        format!(
            "{{\n  \"ok\": false,\n  \"error\": \"{}\",\n  \"message\": \"Internal server error\",\n  \"meta\": {{\n    \"version\": \"{}\"\n  }}\n}}",
            ErrorCode::Internal.as_str(),
            API_VERSION
        )
    });
    json_body(error.code.status(), body)
}

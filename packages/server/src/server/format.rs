//! Output format negotiation.
//!
//! A request gets plain text when its path ends in `.txt`, its `Accept`
//! header asks for `text/plain` exclusively, or it carries
//! `format=text|txt|plain`. Plain-text bodies end with exactly one newline.

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Text,
    Csv,
    Rss,
    Atom,
}

/// True when every media range in `Accept` is `text/plain`.
fn accepts_only_text(headers: &HeaderMap) -> bool {
    let Some(accept) = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let mut ranges = accept
        .split(',')
        .map(|r| r.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
        .filter(|r| !r.is_empty());
    let mut any = false;
    for range in &mut ranges {
        if range != "text/plain" {
            return false;
        }
        any = true;
    }
    any
}

/// Resolve the response format from the `format=` parameter and `Accept`.
pub fn negotiate(headers: &HeaderMap, format: Option<&str>) -> OutputFormat {
    if let Some(format) = format {
        match format.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" | "plain" => return OutputFormat::Text,
            "csv" => return OutputFormat::Csv,
            "rss" => return OutputFormat::Rss,
            "atom" => return OutputFormat::Atom,
            "json" => return OutputFormat::Json,
            _ => {}
        }
    }
    if accepts_only_text(headers) {
        OutputFormat::Text
    } else {
        OutputFormat::Json
    }
}

fn with_content_type(status: StatusCode, content_type: &'static str, body: String) -> Response {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, HeaderValue::from_static(content_type))
        .body(body.into())
        .unwrap_or_default()
}

fn single_trailing_newline(mut body: String) -> String {
    while body.ends_with('\n') {
        body.pop();
    }
    body.push('\n');
    body
}

/// Plain-text response ending with exactly one `\n`.
pub fn plain(status: StatusCode, body: impl Into<String>) -> Response {
    with_content_type(
        status,
        "text/plain; charset=utf-8",
        single_trailing_newline(body.into()),
    )
}

pub fn csv(body: String) -> Response {
    with_content_type(StatusCode::OK, "text/csv; charset=utf-8", body)
}

pub fn rss(body: String) -> Response {
    with_content_type(StatusCode::OK, "application/rss+xml; charset=utf-8", body)
}

pub fn atom(body: String) -> Response {
    with_content_type(StatusCode::OK, "application/atom+xml; charset=utf-8", body)
}

pub fn html(body: impl Into<String>) -> Response {
    with_content_type(StatusCode::OK, "text/html; charset=utf-8", body.into())
}

/// Raw JSON document (OpenAPI spec), outside the API envelope.
pub fn raw_json(body: String) -> Response {
    with_content_type(StatusCode::OK, "application/json; charset=utf-8", body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(accept: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(accept) = accept {
            headers.insert(header::ACCEPT, HeaderValue::from_str(accept).unwrap());
        }
        headers
    }

    #[test]
    fn format_param_wins() {
        assert_eq!(
            negotiate(&headers(None), Some("txt")),
            OutputFormat::Text
        );
        assert_eq!(negotiate(&headers(None), Some("rss")), OutputFormat::Rss);
        assert_eq!(
            negotiate(&headers(Some("text/plain")), Some("json")),
            OutputFormat::Json
        );
    }

    #[test]
    fn exclusive_text_plain_accept_selects_text() {
        assert_eq!(
            negotiate(&headers(Some("text/plain")), None),
            OutputFormat::Text
        );
        assert_eq!(
            negotiate(&headers(Some("text/plain; q=0.9")), None),
            OutputFormat::Text
        );
        // Mixed accept headers stay JSON.
        assert_eq!(
            negotiate(&headers(Some("text/plain, application/json")), None),
            OutputFormat::Json
        );
        assert_eq!(negotiate(&headers(Some("*/*")), None), OutputFormat::Json);
        assert_eq!(negotiate(&headers(None), None), OutputFormat::Json);
    }

    #[test]
    fn plain_bodies_end_with_exactly_one_newline() {
        for body in ["OK", "OK\n", "OK\n\n\n"] {
            assert_eq!(single_trailing_newline(body.to_string()), "OK\n");
        }
        let response = plain(StatusCode::OK, "OK");
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("text/plain; charset=utf-8")
        );
    }
}

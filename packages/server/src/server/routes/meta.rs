//! Meta endpoints: health, info, autodiscover and the server pages.

use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::Response;
use pulldown_cmark::{html, Parser};
use serde_json::json;

use crate::common::envelope::{
    json_error, json_ok, json_ok_with_status, ApiError, RequestMeta, API_VERSION,
};
use crate::domains::query::Category;
use crate::kernel::{HealthStatus, ServerDeps};
use crate::server::format;

fn health_status_code(status: HealthStatus) -> StatusCode {
    match status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy | HealthStatus::Maintenance => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// GET /api/v1/healthz
pub async fn healthz(
    Extension(deps): Extension<Arc<ServerDeps>>,
    Extension(meta): Extension<RequestMeta>,
) -> Response {
    let report = deps.health.status().await;
    json_ok_with_status(&meta, health_status_code(report.status), report)
}

/// GET /api/v1/healthz.txt — `OK\n` or `ERROR: <status>\n`.
pub async fn healthz_txt(Extension(deps): Extension<Arc<ServerDeps>>) -> Response {
    let report = deps.health.status().await;
    let body = if report.is_healthy() {
        "OK".to_string()
    } else {
        format!("ERROR: {}", report.status.as_str())
    };
    format::plain(health_status_code(report.status), body)
}

fn info_payload(deps: &ServerDeps) -> serde_json::Value {
    json!({
        "name": deps.config.instance_name,
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Privacy-respecting metasearch engine",
        "url": deps.config.public_url,
        "uptime_seconds": deps.uptime_seconds(),
        "engines": deps.registry.len(),
        "categories": Category::ALL.len(),
    })
}

/// GET /api/v1/info
pub async fn info(
    Extension(deps): Extension<Arc<ServerDeps>>,
    Extension(meta): Extension<RequestMeta>,
) -> Response {
    json_ok(&meta, info_payload(&deps))
}

/// GET /api/v1/info.txt
pub async fn info_txt(Extension(deps): Extension<Arc<ServerDeps>>) -> Response {
    let body = format!(
        "{} v{}\nengines: {}\nuptime_seconds: {}",
        deps.config.instance_name,
        env!("CARGO_PKG_VERSION"),
        deps.registry.len(),
        deps.uptime_seconds(),
    );
    format::plain(StatusCode::OK, body)
}

/// GET /api/autodiscover — reachable without the version prefix.
pub async fn autodiscover(
    Extension(deps): Extension<Arc<ServerDeps>>,
    Extension(meta): Extension<RequestMeta>,
) -> Response {
    json_ok(
        &meta,
        json!({
            "server": {
                "name": deps.config.instance_name,
                "version": env!("CARGO_PKG_VERSION"),
                "url": deps.config.public_url,
                "features": {
                    "auth": false,
                    "search": true,
                    "register": false,
                },
            },
            "cluster": {
                "primary": deps.config.public_url,
                "nodes": [],
            },
            "api": {
                "version": API_VERSION,
                "base_path": "/api/v1",
            },
        }),
    )
}

const ABOUT_MD: &str = "# About\n\n\
Periscope is a privacy-respecting metasearch engine. It forwards your query \
to several upstream search engines in parallel, merges their answers into a \
single ranked list, and returns it without storing anything about you.\n\n\
No accounts, no tracking, no query logs.\n";

const PRIVACY_MD: &str = "# Privacy\n\n\
- Queries are forwarded to upstream engines without cookies, client IP or \
user agent.\n\
- Nothing is persisted: no query history, no result clicks, no profiles.\n\
- Autocomplete suggestions are proxied server-side so the upstream never \
sees your browser.\n";

const HELP_MD: &str = "# Help\n\n\
## Search operators\n\n\
- `site:example.com`, `-site:example.com`\n\
- `filetype:pdf`, `inurl:`, `intitle:`, `intext:`\n\
- `before:2024-01-31`, `after:2023-06-01`\n\
- `\"exact phrase\"`, `-excluded`\n\n\
## Bangs\n\n\
Prefix a query with `!g`, `!w`, `!gh` and friends to jump straight to the \
upstream engine.\n";

const TERMS_MD: &str = "# Terms\n\n\
This instance is provided as-is, without warranty. Be reasonable: no \
scraping, no abusive query volumes.\n";

/// GET /api/v1/server/{page}
pub async fn server_page(
    Extension(meta): Extension<RequestMeta>,
    Path(page): Path<String>,
) -> Response {
    let markdown = match page.trim().to_ascii_lowercase().as_str() {
        "about" => ABOUT_MD,
        "privacy" => PRIVACY_MD,
        "help" => HELP_MD,
        "terms" => TERMS_MD,
        other => {
            return json_error(
                &meta,
                ApiError::not_found(format!("Unknown server page: {other}")),
            );
        }
    };
    let mut body = String::new();
    html::push_html(&mut body, Parser::new(markdown));
    format::html(body)
}

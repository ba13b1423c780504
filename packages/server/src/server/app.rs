//! Application setup and router assembly.

use std::sync::Arc;

use axum::extract::Extension;
use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use axum::middleware;
use axum::response::Response;
use axum::routing::{get, MethodRouter};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::common::envelope::{json_error, ApiError, ErrorCode, RequestMeta};
use crate::kernel::ServerDeps;
use crate::server::graphql::{create_schema, Schema};
use crate::server::middleware::request_meta_middleware;
use crate::server::routes::{
    autocomplete, autodiscover, direct, get_engine, graphql_handler, graphql_playground, healthz,
    healthz_txt, info, info_txt, instant, list_bangs, list_categories, list_engines, openapi_json,
    openapi_ui, related, search_get, search_post, server_page,
};

async fn method_not_allowed(Extension(meta): Extension<RequestMeta>) -> Response {
    json_error(
        &meta,
        ApiError::new(ErrorCode::MethodNotAllowed, "Method not allowed"),
    )
}

async fn not_found(Extension(meta): Extension<RequestMeta>) -> Response {
    json_error(&meta, ApiError::not_found("Resource not found"))
}

/// Unsupported methods on a known path answer with the 405 envelope.
fn with_405(router: MethodRouter<Arc<Schema>>) -> MethodRouter<Arc<Schema>> {
    router.fallback(method_not_allowed)
}

/// Build the Axum application router.
pub fn build_app(deps: Arc<ServerDeps>) -> Router {
    let schema = Arc::new(create_schema());

    let api_v1 = Router::new()
        // Query endpoints
        .route("/search", with_405(get(search_get).post(search_post)))
        .route("/autocomplete", with_405(get(autocomplete)))
        .route("/related", with_405(get(related)))
        .route("/instant", with_405(get(instant)))
        .route("/direct/:answer_type/:term", with_405(get(direct)))
        // Discovery
        .route("/engines", with_405(get(list_engines)))
        // Trailing slash means "empty id": fall through to the list.
        .route("/engines/", with_405(get(list_engines)))
        .route("/engines/:id", with_405(get(get_engine)))
        .route("/categories", with_405(get(list_categories)))
        .route("/bangs", with_405(get(list_bangs)))
        // Meta
        .route("/healthz", with_405(get(healthz)))
        .route("/healthz.txt", with_405(get(healthz_txt)))
        .route("/info", with_405(get(info)))
        .route("/info.txt", with_405(get(info_txt)))
        .route("/server/:page", with_405(get(server_page)))
        // Dev
        .route("/openapi.json", with_405(get(openapi_json)))
        .route("/openapi", with_405(get(openapi_ui)))
        .route(
            "/graphql",
            with_405(get(graphql_playground).post(graphql_handler)),
        );

    // CORS: open by default, restricted when origins are configured.
    let cors = if deps.config.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([CONTENT_TYPE])
    } else {
        let origins: Vec<HeaderValue> = deps
            .config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([CONTENT_TYPE])
    };

    Router::new()
        .nest("/api/v1", api_v1)
        // Autodiscover lives outside the versioned prefix.
        .route("/api/autodiscover", with_405(get(autodiscover)))
        .fallback(not_found)
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(request_meta_middleware))
        .layer(Extension(deps))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(schema)
}

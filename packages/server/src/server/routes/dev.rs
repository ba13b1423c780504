//! Dev endpoints: OpenAPI document, Swagger shell and GraphQL.

use std::sync::Arc;

use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use juniper::http::GraphQLRequest;
use serde_json::json;

use crate::kernel::ServerDeps;
use crate::server::format;
use crate::server::graphql::{GraphQLContext, Schema};

fn openapi_document(deps: &ServerDeps) -> serde_json::Value {
    json!({
        "openapi": "3.0.3",
        "info": {
            "title": deps.config.instance_name,
            "description": "Privacy-respecting metasearch engine",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "servers": [{ "url": deps.config.public_url }],
        "paths": {
            "/api/v1/search": {
                "get": {
                    "summary": "Run a metasearch",
                    "parameters": [
                        { "name": "q", "in": "query", "required": true, "schema": { "type": "string" } },
                        { "name": "category", "in": "query", "schema": { "type": "string", "enum": ["general", "images", "videos", "news", "maps"] } },
                        { "name": "page", "in": "query", "schema": { "type": "integer", "minimum": 1 } },
                        { "name": "limit", "in": "query", "schema": { "type": "integer", "minimum": 1, "maximum": 100 } },
                        { "name": "safe_search", "in": "query", "schema": { "type": "integer", "minimum": 0, "maximum": 2 } },
                        { "name": "sort", "in": "query", "schema": { "type": "string", "enum": ["relevance", "date", "date_asc", "popularity", "random"] } },
                        { "name": "time_range", "in": "query", "schema": { "type": "string", "enum": ["any", "day", "week", "month", "year"] } },
                        { "name": "engines", "in": "query", "schema": { "type": "string" } },
                        { "name": "format", "in": "query", "schema": { "type": "string", "enum": ["json", "text", "csv", "rss", "atom"] } }
                    ],
                    "responses": { "200": { "description": "Merged results" }, "400": { "description": "Validation error" } }
                },
                "post": { "summary": "Run a metasearch (JSON body)", "responses": { "200": { "description": "Merged results" } } }
            },
            "/api/v1/autocomplete": { "get": { "summary": "Query suggestions", "responses": { "200": { "description": "Suggestion list" } } } },
            "/api/v1/related": { "get": { "summary": "Related queries", "responses": { "200": { "description": "Related query list" } } } },
            "/api/v1/instant": { "get": { "summary": "Instant answer for a query", "responses": { "200": { "description": "Answer or null" } } } },
            "/api/v1/direct/{type}/{term}": { "get": { "summary": "Direct answer by type", "responses": { "200": { "description": "Answer" }, "404": { "description": "Unknown type or term" } } } },
            "/api/v1/engines": { "get": { "summary": "Registered engines", "responses": { "200": { "description": "Engine list" } } } },
            "/api/v1/engines/{id}": { "get": { "summary": "One engine", "responses": { "200": { "description": "Engine" }, "404": { "description": "Unknown engine" } } } },
            "/api/v1/categories": { "get": { "summary": "Result categories", "responses": { "200": { "description": "Category list" } } } },
            "/api/v1/bangs": { "get": { "summary": "Bang shortcuts", "responses": { "200": { "description": "Bang list" } } } },
            "/api/v1/healthz": { "get": { "summary": "Health report", "responses": { "200": { "description": "Healthy" }, "503": { "description": "Unhealthy or maintenance" } } } },
            "/api/v1/info": { "get": { "summary": "Instance info", "responses": { "200": { "description": "Info" } } } },
            "/api/autodiscover": { "get": { "summary": "Instance discovery", "responses": { "200": { "description": "Discovery document" } } } }
        }
    })
}

/// GET /api/v1/openapi.json — the raw document, outside the envelope.
pub async fn openapi_json(Extension(deps): Extension<Arc<ServerDeps>>) -> Response {
    let document = openapi_document(&deps);
    match serde_json::to_string_pretty(&document) {
        Ok(body) => format::raw_json(body),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize OpenAPI document");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /api/v1/openapi — Swagger UI shell.
pub async fn openapi_ui() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>API Explorer</title>
    <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist/swagger-ui.css" />
    <style>
        body { margin: 0; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist/swagger-ui-bundle.js"></script>
    <script>
        SwaggerUIBundle({
            url: '/api/v1/openapi.json',
            dom_id: '#swagger-ui',
        });
    </script>
</body>
</html>
"#,
    )
}

/// GraphQL POST endpoint
pub async fn graphql_handler(
    State(schema): State<Arc<Schema>>,
    Extension(deps): Extension<Arc<ServerDeps>>,
    Json(request): Json<GraphQLRequest>,
) -> Response {
    let context = GraphQLContext { deps };
    let response = request.execute(&schema, &context).await;
    let status = if response.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };

    (status, Json(response)).into_response()
}

/// GraphQL IDE (GraphiQL) on GET
pub async fn graphql_playground() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>GraphQL Playground</title>
    <style>
        body {
            height: 100%;
            margin: 0;
            width: 100%;
            overflow: hidden;
        }
        #graphiql {
            height: 100vh;
        }
    </style>
    <script
        crossorigin
        src="https://unpkg.com/react@18/umd/react.production.min.js"
    ></script>
    <script
        crossorigin
        src="https://unpkg.com/react-dom@18/umd/react-dom.production.min.js"
    ></script>
    <link rel="stylesheet" href="https://unpkg.com/graphiql/graphiql.min.css" />
</head>
<body>
    <div id="graphiql">Loading...</div>
    <script
        src="https://unpkg.com/graphiql/graphiql.min.js"
        type="application/javascript"
    ></script>
    <script>
        const fetcher = GraphiQL.createFetcher({
            url: '/api/v1/graphql',
        });

        ReactDOM.render(
            React.createElement(GraphiQL, { fetcher: fetcher }),
            document.getElementById('graphiql'),
        );
    </script>
</body>
</html>
"#,
    )
}

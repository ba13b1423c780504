//! HTTP surface tests driving the full router with in-process requests.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use server_core::config::Config;
use server_core::domains::bangs::BangTable;
use server_core::domains::instant::InstantDispatcher;
use server_core::domains::search::Aggregator;
use server_core::kernel::engines::{
    BraveEngine, DuckDuckGoEngine, EngineRegistry, WikipediaEngine,
};
use server_core::kernel::health::{EnginesCheck, HealthChecker, HttpClientCheck, SchedulerCheck};
use server_core::kernel::{AutocompleteClient, EngineStatusBoard, SchedulerHandle, ServerDeps};
use server_core::server::build_app;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn deps_with(config: Config, registry: EngineRegistry) -> Arc<ServerDeps> {
    let registry = Arc::new(registry);
    let client = reqwest::Client::new();

    let scheduler_handle = SchedulerHandle::new();
    scheduler_handle.mark_running();

    let mut health = HealthChecker::new(config.maintenance_mode);
    health.register(Arc::new(EnginesCheck::new(registry.clone())));
    health.register(Arc::new(HttpClientCheck));
    health.register(Arc::new(SchedulerCheck::new(scheduler_handle.clone())));

    Arc::new(ServerDeps {
        config,
        registry: registry.clone(),
        aggregator: Aggregator::new(registry),
        instant: InstantDispatcher::with_builtin_handlers(),
        bangs: BangTable::builtin(),
        autocomplete: AutocompleteClient::new(client),
        health,
        status_board: Arc::new(EngineStatusBoard::new()),
        scheduler_handle,
        started_at: Utc::now(),
    })
}

fn default_registry() -> EngineRegistry {
    let client = reqwest::Client::new();
    server_core::kernel::build_registry(&client, &[])
}

fn app() -> Router {
    build_app(deps_with(Config::for_tests(), default_registry()))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>, axum::http::HeaderMap) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec(), headers)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body, _) = get(app, uri).await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    (status, json)
}

fn assert_envelope(json: &Value) {
    let ok = json["ok"].as_bool().expect("ok field present");
    assert_eq!(ok, json.get("error").is_none(), "ok must equal absence of error");
    if !ok {
        assert!(json["message"].is_string());
    }
    assert_eq!(json["meta"]["version"], "v1");
}

#[tokio::test]
async fn s1_missing_query_is_bad_request() {
    let app = app();
    let (status, json) = get_json(&app, "/api/v1/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_envelope(&json);
    assert_eq!(json["ok"], false);
    assert_eq!(json["error"], "BAD_REQUEST");
    assert_eq!(json["message"], "Query parameter is required");
}

#[tokio::test]
async fn s2_autocomplete_without_query_is_empty_list() {
    let app = app();
    let (status, json) = get_json(&app, "/api/v1/autocomplete").await;
    assert_eq!(status, StatusCode::OK);
    assert_envelope(&json);
    assert_eq!(json["ok"], true);
    assert_eq!(json["data"], serde_json::json!([]));
}

#[tokio::test]
async fn s3_categories_are_five_in_fixed_order() {
    let app = app();
    let (status, json) = get_json(&app, "/api/v1/categories").await;
    assert_eq!(status, StatusCode::OK);
    assert_envelope(&json);
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 5);
    let ids: Vec<&str> = data.iter().map(|c| c["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["general", "images", "videos", "news", "maps"]);
}

#[tokio::test]
async fn s4_healthz_txt_is_ok_with_single_newline() {
    let app = app();
    let (status, body, headers) = get(&app, "/api/v1/healthz.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK\n");
    assert_eq!(
        headers.get(header::CONTENT_TYPE).unwrap(),
        "text/plain; charset=utf-8"
    );
}

#[tokio::test]
async fn s5_autodiscover_rejects_post_with_405_envelope() {
    let app = app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/autodiscover")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_envelope(&json);
    assert_eq!(json["error"], "METHOD_NOT_ALLOWED");
}

#[tokio::test]
async fn s6_duplicate_url_across_engines_merges_to_one() {
    // Two scraping engines answer with the same URL; Wikipedia stays empty.
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<div class="result">
                 <a class="result__a" href="https://example.com/a">From DDG</a>
                 <a class="result__snippet">snippet</a>
               </div>"#,
        ))
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<div class="snippet" data-type="web">
                 <a href="https://example.com/a"><div class="title">From Brave</div></a>
                 <div class="snippet-description">other snippet</div>
               </div>"#,
        ))
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"query": {"search": []}})),
        )
        .mount(&upstream)
        .await;

    let client = reqwest::Client::new();
    let mut registry = EngineRegistry::new();
    registry.register(Arc::new(
        DuckDuckGoEngine::new(client.clone()).with_base_url(upstream.uri()),
    ));
    registry.register(Arc::new(
        BraveEngine::new(client.clone()).with_base_url(upstream.uri()),
    ));
    registry.register(Arc::new(
        WikipediaEngine::new(client.clone()).with_base_url(upstream.uri()),
    ));

    let app = build_app(deps_with(Config::for_tests(), registry));
    let (status, json) = get_json(&app, "/api/v1/search?q=rust").await;
    assert_eq!(status, StatusCode::OK);
    assert_envelope(&json);

    let data = &json["data"];
    assert_eq!(data["pagination"]["total"], 1);
    assert_eq!(data["results"][0]["duplicate_count"], 2);
    // First contributor in engine-id order wins the record.
    assert_eq!(data["results"][0]["engine"], "brave");
    let engines_used: Vec<&str> = data["engines_used"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e.as_str().unwrap())
        .collect();
    assert_eq!(engines_used, vec!["brave", "duckduckgo"]);
}

#[tokio::test]
async fn pagination_payload_uses_the_fixed_field_names() {
    let upstream = MockServer::start().await;
    let hits: Vec<Value> = (0..30)
        .map(|i| {
            serde_json::json!({
                "title": format!("Article {i}"),
                "snippet": "text",
                "timestamp": "2024-01-01T00:00:00Z",
            })
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"query": {"search": hits}})),
        )
        .mount(&upstream)
        .await;

    let client = reqwest::Client::new();
    let mut registry = EngineRegistry::new();
    registry.register(Arc::new(
        WikipediaEngine::new(client).with_base_url(upstream.uri()),
    ));

    let app = build_app(deps_with(Config::for_tests(), registry));

    // Out-of-range page and limit fall back to 1 and the default.
    let (status, json) = get_json(&app, "/api/v1/search?q=rust&page=-4&limit=500").await;
    assert_eq!(status, StatusCode::OK);
    let pagination = &json["data"]["pagination"];
    assert_eq!(pagination["page"], 1);
    assert_eq!(pagination["limit"], 20);
    assert_eq!(pagination["total"], 30);
    assert_eq!(pagination["pages"], 2);
    assert_eq!(json["data"]["results"].as_array().unwrap().len(), 20);

    let (_, json) = get_json(&app, "/api/v1/search?q=rust&limit=7").await;
    let pagination = &json["data"]["pagination"];
    assert_eq!(pagination["limit"], 7);
    assert_eq!(pagination["pages"], 5);
    assert_eq!(json["data"]["results"].as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn search_text_format_ends_with_one_newline() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "query": {"search": [{"title": "Rust", "snippet": "a language"}]}
        })))
        .mount(&upstream)
        .await;

    let client = reqwest::Client::new();
    let mut registry = EngineRegistry::new();
    registry.register(Arc::new(
        WikipediaEngine::new(client).with_base_url(upstream.uri()),
    ));
    let app = build_app(deps_with(Config::for_tests(), registry));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/search?q=rust")
                .header(header::ACCEPT, "text/plain")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/plain; charset=utf-8"
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.ends_with('\n'));
    assert!(!text.ends_with("\n\n"));
    assert!(text.contains("Rust"));

    // format=csv yields the fixed header.
    let (_, body, headers) = get(&app, "/api/v1/search?q=rust&format=csv").await;
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "text/csv; charset=utf-8");
    let csv = String::from_utf8(body).unwrap();
    assert!(csv.starts_with("Title,URL,Content,Engine,Category,Domain,Author,Published,Score\n"));

    // format=rss yields an RSS 2.0 document.
    let (_, body, _) = get(&app, "/api/v1/search?q=rust&format=rss").await;
    let rss = String::from_utf8(body).unwrap();
    assert!(rss.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\">"));
}

#[tokio::test]
async fn maintenance_mode_reports_503() {
    let mut config = Config::for_tests();
    config.maintenance_mode = true;
    let app = build_app(deps_with(config, default_registry()));

    let (status, json) = get_json(&app, "/api/v1/healthz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_envelope(&json);
    assert_eq!(json["data"]["status"], "maintenance");

    let (status, body, _) = get(&app, "/api/v1/healthz.txt").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, b"ERROR: maintenance\n");
}

#[tokio::test]
async fn healthz_json_reports_check_names() {
    let app = app();
    let (status, json) = get_json(&app, "/api/v1/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "healthy");
    let names: Vec<&str> = json["data"]["checks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["engines", "http_client", "scheduler"]);
}

#[tokio::test]
async fn bang_queries_redirect_to_the_upstream() {
    let app = app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/search?q=%21g%20rust%20async")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "https://www.google.com/search?q=rust%20async"
    );
}

#[tokio::test]
async fn instant_answers_short_circuit_search() {
    let app = app();
    let (status, json) = get_json(&app, "/api/v1/search?q=hash:%20abc").await;
    assert_eq!(status, StatusCode::OK);
    assert_envelope(&json);
    assert_eq!(json["data"]["answer_type"], "hash");
    assert_eq!(
        json["data"]["content"],
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    assert_eq!(json["data"]["cache_ttl_seconds"], 86400);
}

#[tokio::test]
async fn instant_endpoint_returns_null_without_a_match() {
    let app = app();
    let (status, json) = get_json(&app, "/api/v1/instant?q=ordinary%20query").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], Value::Null);

    let (status, json) = get_json(&app, "/api/v1/instant").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "BAD_REQUEST");
}

#[tokio::test]
async fn direct_endpoint_validates_type_and_term() {
    let app = app();

    let (status, json) = get_json(&app, "/api/v1/direct/hash/abc").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["answer_type"], "hash");

    let (status, json) = get_json(&app, "/api/v1/direct/nosuch/abc").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "NOT_FOUND");

    let (status, json) = get_json(&app, "/api/v1/direct/hash/%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "BAD_REQUEST");
}

#[tokio::test]
async fn engine_discovery_lists_and_resolves_ids() {
    let app = app();

    let (status, json) = get_json(&app, "/api/v1/engines").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 7);

    // Trailing slash (empty id) falls through to the list.
    let (status, json) = get_json(&app, "/api/v1/engines/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["data"].is_array());

    let (status, json) = get_json(&app, "/api/v1/engines/duckduckgo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["id"], "duckduckgo");
    assert_eq!(json["data"]["priority"], 80);

    let (status, json) = get_json(&app, "/api/v1/engines/nosuch").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "NOT_FOUND");
}

#[tokio::test]
async fn bangs_endpoint_filters_by_category_and_search() {
    let app = app();

    let (status, json) = get_json(&app, "/api/v1/bangs").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["data"].as_array().unwrap().len() > 10);

    let (_, json) = get_json(&app, "/api/v1/bangs?category=videos").await;
    for bang in json["data"].as_array().unwrap() {
        assert_eq!(bang["category"], "videos");
    }

    let (_, json) = get_json(&app, "/api/v1/bangs?search=github").await;
    let shortcuts: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["shortcut"].as_str().unwrap())
        .collect();
    assert!(shortcuts.contains(&"gh"));

    let (status, json) = get_json(&app, "/api/v1/bangs?category=nosuch").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "BAD_REQUEST");
}

#[tokio::test]
async fn validation_errors_use_the_error_envelope() {
    let app = app();

    let (status, json) = get_json(&app, "/api/v1/search?q=rust&engines=nosuch").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_envelope(&json);
    assert_eq!(json["error"], "BAD_REQUEST");

    let (status, _) = get_json(&app, "/api/v1/search?q=rust&sort=bogus").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(&app, "/api/v1/search?q=rust&category=nope").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(&app, "/api/v1/search?q=rust&page=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_paths_get_the_404_envelope() {
    let app = app();
    let (status, json) = get_json(&app, "/api/v1/definitely/not/here").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_envelope(&json);
    assert_eq!(json["error"], "NOT_FOUND");
}

#[tokio::test]
async fn autodiscover_document_has_the_agreed_shape() {
    let app = app();
    let (status, json) = get_json(&app, "/api/autodiscover").await;
    assert_eq!(status, StatusCode::OK);
    assert_envelope(&json);
    let data = &json["data"];
    assert_eq!(data["server"]["features"]["search"], true);
    assert_eq!(data["server"]["features"]["auth"], false);
    assert_eq!(data["api"]["version"], "v1");
    assert_eq!(data["api"]["base_path"], "/api/v1");
    assert!(data["cluster"]["nodes"].is_array());
}

#[tokio::test]
async fn every_response_carries_version_and_request_id_headers() {
    let app = app();
    let (_, _, headers) = get(&app, "/api/v1/categories").await;
    assert_eq!(headers.get("x-api-version").unwrap(), "v1");
    assert!(headers.get("x-request-id").is_some());

    // A caller-provided request id is preserved in headers and body meta.
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/nope")
                .header("x-request-id", "req-abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers().get("x-request-id").unwrap(), "req-abc-123");
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["meta"]["request_id"], "req-abc-123");
}

#[tokio::test]
async fn json_responses_are_pretty_printed_utf8() {
    let app = app();
    let (_, body, headers) = get(&app, "/api/v1/categories").await;
    assert_eq!(
        headers.get(header::CONTENT_TYPE).unwrap(),
        "application/json; charset=utf-8"
    );
    let text = String::from_utf8(body).unwrap();
    assert!(text.starts_with("{\n  \"ok\": true"));
}

#[tokio::test]
async fn post_search_accepts_a_json_body() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "query": {"search": [{"title": "Rust", "snippet": "a language"}]}
        })))
        .mount(&upstream)
        .await;

    let client = reqwest::Client::new();
    let mut registry = EngineRegistry::new();
    registry.register(Arc::new(
        WikipediaEngine::new(client).with_base_url(upstream.uri()),
    ));
    let app = build_app(deps_with(Config::for_tests(), registry));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/search")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({"query": "rust", "limit": 5}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["data"]["pagination"]["limit"], 5);
    assert_eq!(json["data"]["pagination"]["total"], 1);

    // A missing body is a client error in the envelope, not a 415/422 blob.
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/search")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

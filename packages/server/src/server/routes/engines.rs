//! Discovery endpoints: engines, categories and bangs.

use std::sync::Arc;

use axum::extract::{Extension, Path, Query as QueryParams};
use axum::response::Response;
use serde::{Deserialize, Serialize};

use crate::common::envelope::{json_error, json_ok, ApiError, RequestMeta};
use crate::domains::query::Category;
use crate::kernel::scheduled_tasks::EngineStatus;
use crate::kernel::{Engine, ServerDeps};

#[derive(Debug, Serialize)]
pub struct EngineInfo {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub priority: u8,
    pub categories: Vec<&'static str>,
    pub timeout_seconds: u64,
    pub max_results: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EngineStatus>,
}

impl EngineInfo {
    fn from_engine(engine: &Arc<dyn Engine>, deps: &ServerDeps) -> Self {
        let config = engine.config();
        Self {
            id: config.id.clone(),
            name: config.display_name.clone(),
            enabled: config.enabled,
            priority: config.priority,
            categories: config.categories.ids(),
            timeout_seconds: config.timeout.as_secs(),
            max_results: config.max_results,
            status: deps.status_board.get(&config.id),
        }
    }
}

/// GET /api/v1/engines (also the `/engines/` trailing-slash form).
pub async fn list_engines(
    Extension(deps): Extension<Arc<ServerDeps>>,
    Extension(meta): Extension<RequestMeta>,
) -> Response {
    let engines: Vec<EngineInfo> = deps
        .registry
        .all()
        .iter()
        .map(|e| EngineInfo::from_engine(e, &deps))
        .collect();
    json_ok(&meta, engines)
}

/// GET /api/v1/engines/{id}
pub async fn get_engine(
    Extension(deps): Extension<Arc<ServerDeps>>,
    Extension(meta): Extension<RequestMeta>,
    Path(id): Path<String>,
) -> Response {
    let id = id.trim().to_ascii_lowercase();
    match deps.registry.get(&id) {
        Some(engine) => json_ok(&meta, EngineInfo::from_engine(&engine, &deps)),
        None => json_error(&meta, ApiError::not_found(format!("Engine not found: {id}"))),
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryInfo {
    pub id: &'static str,
    pub name: &'static str,
}

/// GET /api/v1/categories — the five fixed categories, in order.
pub async fn list_categories(Extension(meta): Extension<RequestMeta>) -> Response {
    let categories: Vec<CategoryInfo> = Category::ALL
        .iter()
        .map(|c| CategoryInfo {
            id: c.as_str(),
            name: c.display_name(),
        })
        .collect();
    json_ok(&meta, categories)
}

#[derive(Debug, Default, Deserialize)]
pub struct BangParams {
    pub category: Option<String>,
    pub search: Option<String>,
}

/// GET /api/v1/bangs?category=&search=
pub async fn list_bangs(
    Extension(deps): Extension<Arc<ServerDeps>>,
    Extension(meta): Extension<RequestMeta>,
    QueryParams(params): QueryParams<BangParams>,
) -> Response {
    let category = match params.category.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(value) => match Category::parse(value) {
            Some(category) => Some(category),
            None => {
                return json_error(
                    &meta,
                    ApiError::bad_request(format!("Unknown category: {value}")),
                );
            }
        },
    };
    let search = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let bangs = deps.bangs.filtered(category, search);
    json_ok(&meta, bangs)
}

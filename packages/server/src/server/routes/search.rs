//! Query endpoints: search, autocomplete, related, instant and direct.

use std::sync::Arc;

use axum::extract::{Extension, Path, Query as QueryParams};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use crate::common::envelope::{json_error, json_ok, ApiError, RequestMeta};
use crate::domains::instant::AnswerError;
use crate::domains::query::{Category, Query, SortOrder, TimeRange};
use crate::domains::results::{export, SearchResults};
use crate::domains::search::SearchError;
use crate::kernel::ServerDeps;
use crate::server::format::{self, negotiate, OutputFormat};

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub safe_search: Option<String>,
    pub lang: Option<String>,
    pub sort: Option<String>,
    pub time_range: Option<String>,
    /// Comma-separated engine ids.
    pub engines: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchBody {
    pub query: Option<String>,
    pub category: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub engines: Vec<String>,
    pub safe_search: Option<i64>,
    pub time_range: Option<String>,
    pub language: Option<String>,
    pub sort: Option<String>,
    pub format: Option<String>,
}

fn parse_number(name: &str, value: &str) -> Result<i64, ApiError> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("{name} must be a number")))
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

struct Overrides {
    category: Option<String>,
    page: Option<i64>,
    limit: Option<i64>,
    safe_search: Option<i64>,
    language: Option<String>,
    sort: Option<String>,
    time_range: Option<String>,
    engines: Vec<String>,
    format: Option<String>,
}

impl TryFrom<SearchParams> for Overrides {
    type Error = ApiError;

    fn try_from(params: SearchParams) -> Result<Self, ApiError> {
        Ok(Self {
            category: non_empty(params.category.as_ref()).map(String::from),
            page: non_empty(params.page.as_ref())
                .map(|v| parse_number("page", v))
                .transpose()?,
            limit: non_empty(params.limit.as_ref())
                .map(|v| parse_number("limit", v))
                .transpose()?,
            safe_search: non_empty(params.safe_search.as_ref())
                .map(|v| parse_number("safe_search", v))
                .transpose()?,
            language: non_empty(params.lang.as_ref()).map(String::from),
            sort: non_empty(params.sort.as_ref()).map(String::from),
            time_range: non_empty(params.time_range.as_ref()).map(String::from),
            engines: params
                .engines
                .as_deref()
                .unwrap_or_default()
                .split(',')
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect(),
            format: non_empty(params.format.as_ref()).map(String::from),
        })
    }
}

impl From<SearchBody> for Overrides {
    fn from(body: SearchBody) -> Self {
        Self {
            category: body.category.filter(|c| !c.trim().is_empty()),
            page: body.page,
            limit: body.limit,
            safe_search: body.safe_search,
            language: body.language.filter(|l| !l.trim().is_empty()),
            sort: body.sort.filter(|s| !s.trim().is_empty()),
            time_range: body.time_range.filter(|t| !t.trim().is_empty()),
            engines: body.engines,
            format: body.format,
        }
    }
}

fn build_query(deps: &ServerDeps, raw: &str, overrides: &Overrides) -> Result<Query, ApiError> {
    let mut query = Query::parse(raw)
        .map_err(|_| ApiError::bad_request("Query contains no searchable text"))?;

    if let Some(category) = &overrides.category {
        query.category = Category::parse(category)
            .ok_or_else(|| ApiError::bad_request(format!("Unknown category: {category}")))?;
    }
    if let Some(page) = overrides.page {
        query = query.with_page(page);
    }
    if let Some(limit) = overrides.limit {
        query = query.with_per_page(limit);
    }
    if let Some(level) = overrides.safe_search {
        query = query.with_safe_search(level);
    }
    if let Some(language) = &overrides.language {
        query = query.with_language(language.clone());
    }
    if let Some(sort) = &overrides.sort {
        let sort = SortOrder::parse(sort)
            .ok_or_else(|| ApiError::bad_request(format!("Unknown sort order: {sort}")))?;
        query = query.with_sort(sort);
    }
    if let Some(time_range) = &overrides.time_range {
        let time_range = TimeRange::parse(time_range)
            .ok_or_else(|| ApiError::bad_request(format!("Unknown time range: {time_range}")))?;
        query = query.with_time_range(time_range);
    }
    if !overrides.engines.is_empty() {
        for id in &overrides.engines {
            let id = id.trim().to_ascii_lowercase();
            if deps.registry.get(&id).is_none() {
                return Err(ApiError::bad_request(format!("Unknown engine: {id}")));
            }
        }
        query = query.with_engines(overrides.engines.clone());
    }
    Ok(query)
}

fn redirect_found(location: &str) -> Response {
    let mut response = Response::builder().status(StatusCode::FOUND);
    if let Ok(value) = HeaderValue::from_str(location) {
        response = response.header(header::LOCATION, value);
    }
    response.body(axum::body::Body::empty()).unwrap_or_default()
}

fn render_text(results: &SearchResults) -> String {
    let mut out = format!(
        "Results for \"{}\" ({} total, {} ms)\n\n",
        results.query, results.pagination.total, results.search_time_ms
    );
    let offset = (results.pagination.page.saturating_sub(1)) * results.pagination.limit;
    for (i, result) in results.results.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", offset + i + 1, result.title));
        out.push_str(&format!("   {}\n", result.url));
        if !result.content.is_empty() {
            out.push_str(&format!("   {}\n", result.content));
        }
    }
    out
}

async fn run_search(
    deps: &ServerDeps,
    meta: &RequestMeta,
    headers: &HeaderMap,
    raw: Option<&str>,
    overrides: Overrides,
) -> Response {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return json_error(meta, ApiError::bad_request("Query parameter is required"));
    }

    // Bang shortcuts skip the metasearch entirely.
    if let Some(url) = deps.bangs.resolve(raw) {
        return redirect_found(&url);
    }

    let query = match build_query(deps, raw, &overrides) {
        Ok(query) => query,
        Err(e) => return json_error(meta, e),
    };

    let output = negotiate(headers, overrides.format.as_deref());

    // Instant answers short-circuit a first-page JSON search.
    if output == OutputFormat::Json && query.page == 1 {
        if let Some(answer) = deps.instant.dispatch(raw).await {
            return json_ok(meta, answer);
        }
    }

    let results = match deps.aggregator.search(&query).await {
        Ok(results) => results,
        Err(SearchError::NoEngines) => {
            return json_error(
                meta,
                ApiError::bad_request("No engines available for this query"),
            );
        }
        Err(SearchError::Cancelled) => {
            return json_error(
                meta,
                ApiError::service_unavailable("Search cancelled before any engine completed"),
            );
        }
    };

    match output {
        OutputFormat::Json => json_ok(meta, results),
        OutputFormat::Text => format::plain(StatusCode::OK, render_text(&results)),
        OutputFormat::Csv => format::csv(export::to_csv(&results)),
        OutputFormat::Rss => format::rss(export::to_rss(&results, &deps.config.public_url)),
        OutputFormat::Atom => format::atom(export::to_atom(&results, &deps.config.public_url)),
    }
}

/// GET /api/v1/search
pub async fn search_get(
    Extension(deps): Extension<Arc<ServerDeps>>,
    Extension(meta): Extension<RequestMeta>,
    headers: HeaderMap,
    QueryParams(params): QueryParams<SearchParams>,
) -> Response {
    let raw = params.q.clone();
    let overrides = match Overrides::try_from(params) {
        Ok(overrides) => overrides,
        Err(e) => return json_error(&meta, e),
    };
    run_search(&deps, &meta, &headers, raw.as_deref(), overrides).await
}

/// POST /api/v1/search
pub async fn search_post(
    Extension(deps): Extension<Arc<ServerDeps>>,
    Extension(meta): Extension<RequestMeta>,
    headers: HeaderMap,
    body: Option<Json<SearchBody>>,
) -> Response {
    let Some(Json(body)) = body else {
        return json_error(&meta, ApiError::bad_request("Invalid JSON body"));
    };
    let raw = body.query.clone();
    run_search(&deps, &meta, &headers, raw.as_deref(), body.into()).await
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestParams {
    pub q: Option<String>,
}

/// GET /api/v1/autocomplete — an empty query yields an empty list, and
/// upstream failures degrade to the same, never to an error.
pub async fn autocomplete(
    Extension(deps): Extension<Arc<ServerDeps>>,
    Extension(meta): Extension<RequestMeta>,
    QueryParams(params): QueryParams<SuggestParams>,
) -> Response {
    let suggestions = match non_empty(params.q.as_ref()) {
        Some(q) => deps.autocomplete.suggest(q).await,
        None => Vec::new(),
    };
    json_ok(&meta, suggestions)
}

/// GET /api/v1/related
pub async fn related(
    Extension(deps): Extension<Arc<ServerDeps>>,
    Extension(meta): Extension<RequestMeta>,
    QueryParams(params): QueryParams<SuggestParams>,
) -> Response {
    let related = match non_empty(params.q.as_ref()) {
        Some(q) => deps.autocomplete.related(q).await,
        None => Vec::new(),
    };
    json_ok(&meta, related)
}

/// GET /api/v1/instant — `data` is null when no handler matches.
pub async fn instant(
    Extension(deps): Extension<Arc<ServerDeps>>,
    Extension(meta): Extension<RequestMeta>,
    QueryParams(params): QueryParams<SuggestParams>,
) -> Response {
    let Some(q) = non_empty(params.q.as_ref()) else {
        return json_error(&meta, ApiError::bad_request("Query parameter is required"));
    };
    match deps.instant.dispatch(q).await {
        Some(answer) => json_ok(&meta, answer),
        None => json_ok(&meta, serde_json::Value::Null),
    }
}

/// GET /api/v1/direct/{type}/{term}
pub async fn direct(
    Extension(deps): Extension<Arc<ServerDeps>>,
    Extension(meta): Extension<RequestMeta>,
    Path((answer_type, term)): Path<(String, String)>,
) -> Response {
    let term = term.trim();
    if term.is_empty() {
        return json_error(&meta, ApiError::bad_request("Term is required"));
    }
    match deps.instant.direct(answer_type.trim(), term).await {
        None => json_error(
            &meta,
            ApiError::not_found(format!("Unknown answer type: {answer_type}")),
        ),
        Some(Ok(Some(answer))) => json_ok(&meta, answer),
        Some(Ok(None)) => json_error(
            &meta,
            ApiError::not_found(format!("No answer for term: {term}")),
        ),
        Some(Err(AnswerError::NotFound(what))) => {
            json_error(&meta, ApiError::not_found(format!("{what} not found")))
        }
        Some(Err(AnswerError::Lookup(detail))) => {
            json_error(&meta, ApiError::not_found(detail))
        }
    }
}

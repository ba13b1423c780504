//! GraphQL dev surface over the query pipeline.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use juniper::{graphql_object, EmptyMutation, EmptySubscription, FieldError, FieldResult, GraphQLObject, RootNode};

use crate::domains::query::{Category, Query};
use crate::domains::results::{SearchResult, SearchResults};
use crate::kernel::ServerDeps;

/// Per-request GraphQL context: shared process services.
#[derive(Clone)]
pub struct GraphQLContext {
    pub deps: Arc<ServerDeps>,
}

impl juniper::Context for GraphQLContext {}

#[derive(GraphQLObject)]
#[graphql(description = "A single merged search result")]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub content: String,
    pub engine: String,
    pub domain: String,
    pub score: f64,
    pub duplicate_count: i32,
    pub published_at: Option<DateTime<Utc>>,
}

impl From<SearchResult> for SearchHit {
    fn from(result: SearchResult) -> Self {
        Self {
            title: result.title,
            url: result.url,
            content: result.content,
            engine: result.engine,
            domain: result.domain,
            score: result.score,
            duplicate_count: result.duplicate_count as i32,
            published_at: result.published_at,
        }
    }
}

#[derive(GraphQLObject)]
#[graphql(description = "A merged, paginated search response")]
pub struct SearchPage {
    pub query: String,
    pub results: Vec<SearchHit>,
    pub page: i32,
    pub limit: i32,
    pub total: i32,
    pub pages: i32,
    pub search_time_ms: i32,
    pub engines_used: Vec<String>,
}

impl From<SearchResults> for SearchPage {
    fn from(results: SearchResults) -> Self {
        Self {
            query: results.query,
            page: results.pagination.page as i32,
            limit: results.pagination.limit as i32,
            total: results.pagination.total as i32,
            pages: results.pagination.pages as i32,
            search_time_ms: results.search_time_ms as i32,
            engines_used: results.engines_used,
            results: results.results.into_iter().map(SearchHit::from).collect(),
        }
    }
}

#[derive(GraphQLObject)]
pub struct EngineEntry {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub priority: i32,
    pub categories: Vec<String>,
}

#[derive(GraphQLObject)]
pub struct CategoryEntry {
    pub id: String,
    pub name: String,
}

#[derive(GraphQLObject)]
pub struct BangEntry {
    pub shortcut: String,
    pub name: String,
    pub url_template: String,
    pub category: String,
    pub aliases: Vec<String>,
}

pub struct QueryRoot;

#[graphql_object(context = GraphQLContext)]
impl QueryRoot {
    /// Run a metasearch.
    async fn search(
        context: &GraphQLContext,
        query: String,
        category: Option<String>,
        page: Option<i32>,
        limit: Option<i32>,
    ) -> FieldResult<SearchPage> {
        let mut parsed =
            Query::parse(&query).map_err(|e| FieldError::from(e.to_string()))?;
        if let Some(category) = category {
            parsed.category = Category::parse(&category)
                .ok_or_else(|| FieldError::from(format!("unknown category: {category}")))?;
        }
        if let Some(page) = page {
            parsed = parsed.with_page(page as i64);
        }
        if let Some(limit) = limit {
            parsed = parsed.with_per_page(limit as i64);
        }

        let results = context
            .deps
            .aggregator
            .search(&parsed)
            .await
            .map_err(|e| FieldError::from(e.to_string()))?;
        Ok(results.into())
    }

    /// Registered engines.
    fn engines(context: &GraphQLContext) -> Vec<EngineEntry> {
        context
            .deps
            .registry
            .all()
            .iter()
            .map(|e| {
                let config = e.config();
                EngineEntry {
                    id: config.id.clone(),
                    name: config.display_name.clone(),
                    enabled: config.enabled,
                    priority: config.priority as i32,
                    categories: config.categories.ids().iter().map(|s| s.to_string()).collect(),
                }
            })
            .collect()
    }

    /// The fixed result categories.
    fn categories() -> Vec<CategoryEntry> {
        Category::ALL
            .iter()
            .map(|c| CategoryEntry {
                id: c.as_str().to_string(),
                name: c.display_name().to_string(),
            })
            .collect()
    }

    /// Bang shortcuts, optionally filtered.
    fn bangs(
        context: &GraphQLContext,
        category: Option<String>,
        search: Option<String>,
    ) -> Vec<BangEntry> {
        let category = category.as_deref().and_then(Category::parse);
        context
            .deps
            .bangs
            .filtered(category, search.as_deref())
            .into_iter()
            .map(|b| BangEntry {
                shortcut: b.shortcut.to_string(),
                name: b.name.to_string(),
                url_template: b.url_template.to_string(),
                category: b.category.as_str().to_string(),
                aliases: b.aliases.iter().map(|a| a.to_string()).collect(),
            })
            .collect()
    }
}

pub type Schema =
    RootNode<'static, QueryRoot, EmptyMutation<GraphQLContext>, EmptySubscription<GraphQLContext>>;

pub fn create_schema() -> Schema {
    Schema::new(
        QueryRoot,
        EmptyMutation::<GraphQLContext>::new(),
        EmptySubscription::<GraphQLContext>::new(),
    )
}

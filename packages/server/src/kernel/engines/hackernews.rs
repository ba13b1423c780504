//! Hacker News engine via the Algolia search API.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::domains::query::{Category, Query, SortOrder, TimeRange};
use crate::domains::results::SearchResult;

use super::{CategorySet, Engine, EngineConfig, EngineError};

const DEFAULT_BASE_URL: &str = "https://hn.algolia.com";
const PAGE_SIZE: usize = 30;

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    hits: Vec<ApiHit>,
}

#[derive(Debug, Deserialize)]
struct ApiHit {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    points: Option<i64>,
    #[serde(default)]
    num_comments: Option<i64>,
    #[serde(rename = "objectID")]
    object_id: String,
    #[serde(default)]
    story_text: Option<String>,
}

pub struct HackerNewsEngine {
    config: EngineConfig,
    client: reqwest::Client,
}

impl HackerNewsEngine {
    pub fn new(client: reqwest::Client) -> Self {
        let config = EngineConfig::new("hackernews", "Hacker News")
            .priority(65)
            .categories(CategorySet::Only(vec![Category::News]))
            .base_url(DEFAULT_BASE_URL)
            .normalize();
        Self { config, client }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    fn created_after(range: TimeRange) -> Option<DateTime<Utc>> {
        let delta = match range {
            TimeRange::Any => return None,
            TimeRange::Day => Duration::days(1),
            TimeRange::Week => Duration::weeks(1),
            TimeRange::Month => Duration::days(30),
            TimeRange::Year => Duration::days(365),
        };
        Some(Utc::now() - delta)
    }
}

#[async_trait]
impl Engine for HackerNewsEngine {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn search(&self, query: &Query) -> Result<Vec<SearchResult>, EngineError> {
        // Algolia exposes relevance and recency under different paths.
        let path = match query.sort_by {
            SortOrder::Date | SortOrder::DateAsc => "/api/v1/search_by_date",
            _ => "/api/v1/search",
        };
        let mut params: Vec<(&str, String)> = vec![
            ("query", query.search_text()),
            ("page", (query.page.saturating_sub(1)).to_string()),
            ("hitsPerPage", PAGE_SIZE.min(self.config.max_results).to_string()),
            ("tags", "story".to_string()),
        ];
        if let Some(cutoff) = Self::created_after(query.time_range) {
            params.push((
                "numericFilters",
                format!("created_at_i>{}", cutoff.timestamp()),
            ));
        }

        let response = self
            .client
            .get(format!("{}{}", self.config.base_url, path))
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(EngineError::Status(response.status()));
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Parse(e.to_string()))?;

        let results = parsed
            .hits
            .into_iter()
            .enumerate()
            .filter_map(|(position, hit)| {
                let title = hit.title?;
                let url = hit.url.unwrap_or_else(|| {
                    format!("https://news.ycombinator.com/item?id={}", hit.object_id)
                });
                let mut result =
                    SearchResult::new(title, url, self.config.id.clone(), Category::News);
                result.content = hit.story_text.unwrap_or_default();
                result.author = hit.author;
                result.published_at = hit
                    .created_at
                    .as_deref()
                    .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                    .map(|d| d.with_timezone(&Utc));
                result.popularity = hit.points.map(|p| p as f64);
                if let Some(comments) = hit.num_comments {
                    result
                        .metadata
                        .insert("comments".to_string(), serde_json::json!(comments));
                }
                result.position = position;
                Some(result)
            })
            .collect();
        Ok(results)
    }
}

//! Wikipedia engine via the MediaWiki search API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::domains::query::{Category, Query};
use crate::domains::results::SearchResult;

use super::{CategorySet, Engine, EngineConfig, EngineError};

const DEFAULT_BASE_URL: &str = "https://en.wikipedia.org";
/// Article links always point at the canonical host, even when the API
/// endpoint is overridden (self-hosted mirror, tests).
const ARTICLE_BASE_URL: &str = "https://en.wikipedia.org";
const PAGE_SIZE: usize = 20;

lazy_static! {
    static ref MARKUP: Regex = Regex::new(r"<[^>]+>").expect("valid regex");
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    query: Option<ApiQuery>,
}

#[derive(Debug, Deserialize)]
struct ApiQuery {
    #[serde(default)]
    search: Vec<ApiHit>,
}

#[derive(Debug, Deserialize)]
struct ApiHit {
    title: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    wordcount: Option<u64>,
}

pub struct WikipediaEngine {
    config: EngineConfig,
    client: reqwest::Client,
}

impl WikipediaEngine {
    pub fn new(client: reqwest::Client) -> Self {
        let config = EngineConfig::new("wikipedia", "Wikipedia")
            .priority(60)
            .categories(CategorySet::Only(vec![Category::General]))
            .base_url(DEFAULT_BASE_URL)
            .normalize();
        Self { config, client }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    fn article_url(&self, title: &str) -> String {
        format!(
            "{}/wiki/{}",
            ARTICLE_BASE_URL,
            urlencoding::encode(&title.replace(' ', "_"))
        )
    }
}

#[async_trait]
impl Engine for WikipediaEngine {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn search(&self, query: &Query) -> Result<Vec<SearchResult>, EngineError> {
        let limit = PAGE_SIZE.min(self.config.max_results);
        let offset = (query.page.saturating_sub(1)) * limit;
        let params: Vec<(&str, String)> = vec![
            ("action", "query".to_string()),
            ("list", "search".to_string()),
            ("format", "json".to_string()),
            ("srsearch", query.search_text()),
            ("srlimit", limit.to_string()),
            ("sroffset", offset.to_string()),
            ("srprop", "snippet|timestamp|wordcount".to_string()),
        ];

        let response = self
            .client
            .get(format!("{}/w/api.php", self.config.base_url))
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

        let hits = parsed.query.map(|q| q.search).unwrap_or_default();
        let results = hits
            .into_iter()
            .enumerate()
            .map(|(position, hit)| {
                let mut result = SearchResult::new(
                    hit.title.clone(),
                    self.article_url(&hit.title),
                    self.config.id.clone(),
                    Category::General,
                );
                result.content = MARKUP.replace_all(&hit.snippet, "").into_owned();
                result.published_at = hit
                    .timestamp
                    .as_deref()
                    .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                    .map(|d| d.with_timezone(&Utc));
                if let Some(words) = hit.wordcount {
                    result
                        .metadata
                        .insert("wordcount".to_string(), serde_json::json!(words));
                }
                result.language = Some("en".to_string());
                result.position = position;
                result
            })
            .collect();
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_url_encodes_spaces_as_underscores() {
        let engine = WikipediaEngine::new(reqwest::Client::new());
        assert_eq!(
            engine.article_url("Rust (programming language)"),
            "https://en.wikipedia.org/wiki/Rust_%28programming_language%29"
        );
    }

    #[test]
    fn snippet_markup_is_stripped() {
        let snippet = "The <span class=\"searchmatch\">Rust</span> language";
        assert_eq!(
            MARKUP.replace_all(snippet, "").into_owned(),
            "The Rust language"
        );
    }
}

//! Brave Search engine, scraping the result page markup.

use async_trait::async_trait;
use lazy_static::lazy_static;
use scraper::{Html, Selector};

use crate::domains::query::{Category, Query};
use crate::domains::results::SearchResult;

use super::{CategorySet, Engine, EngineConfig, EngineError};

const DEFAULT_BASE_URL: &str = "https://search.brave.com";

lazy_static! {
    static ref SNIPPET: Selector =
        Selector::parse("div.snippet[data-type=\"web\"]").expect("valid selector");
    static ref LINK: Selector = Selector::parse("a").expect("valid selector");
    static ref TITLE: Selector = Selector::parse(".title").expect("valid selector");
    static ref DESCRIPTION: Selector =
        Selector::parse(".snippet-description").expect("valid selector");
}

pub struct BraveEngine {
    config: EngineConfig,
    client: reqwest::Client,
}

impl BraveEngine {
    pub fn new(client: reqwest::Client) -> Self {
        let config = EngineConfig::new("brave", "Brave Search")
            .priority(70)
            .categories(CategorySet::Only(vec![Category::General]))
            .base_url(DEFAULT_BASE_URL)
            .normalize();
        Self { config, client }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    fn parse_results(&self, body: &str) -> Vec<SearchResult> {
        let document = Html::parse_document(body);
        let mut results = Vec::new();

        for (position, node) in document.select(&SNIPPET).enumerate() {
            let Some(link) = node.select(&LINK).next() else {
                continue;
            };
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            if !href.starts_with("http") {
                continue;
            }
            let title = node
                .select(&TITLE)
                .next()
                .map(|t| t.text().collect::<String>())
                .unwrap_or_default();
            if title.trim().is_empty() {
                continue;
            }

            let mut result = SearchResult::new(
                title,
                href.to_string(),
                self.config.id.clone(),
                Category::General,
            );
            result.content = node
                .select(&DESCRIPTION)
                .next()
                .map(|d| d.text().collect::<String>())
                .unwrap_or_default();
            result.position = position;
            results.push(result);
        }
        results
    }
}

#[async_trait]
impl Engine for BraveEngine {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn search(&self, query: &Query) -> Result<Vec<SearchResult>, EngineError> {
        let params: Vec<(&str, String)> = vec![
            ("q", query.search_text()),
            ("offset", (query.page.saturating_sub(1)).to_string()),
            ("safesearch", match query.safe_search {
                2 => "strict".to_string(),
                1 => "moderate".to_string(),
                _ => "off".to_string(),
            }),
        ];

        let response = self
            .client
            .get(format!("{}/search", self.config.base_url))
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(EngineError::Status(response.status()));
        }

        let body = response.text().await?;
        let mut results = self.parse_results(&body);
        results.truncate(self.config.max_results);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_results_reads_brave_snippets() {
        let engine = BraveEngine::new(reqwest::Client::new());
        let body = r#"
            <div class="snippet" data-type="web">
              <a href="https://example.com/a"><div class="title">Hit one</div></a>
              <div class="snippet-description">Description one.</div>
            </div>
            <div class="snippet" data-type="web">
              <a href="/internal">skipped</a>
            </div>
        "#;
        let results = engine.parse_results(body);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Hit one");
        assert_eq!(results[0].content, "Description one.");
        assert_eq!(results[0].url, "https://example.com/a");
    }
}

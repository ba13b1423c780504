//! DuckDuckGo engine, scraping the HTML (non-JS) endpoint.

use async_trait::async_trait;
use lazy_static::lazy_static;
use scraper::{Html, Selector};

use crate::domains::query::{Category, Query, TimeRange};
use crate::domains::results::SearchResult;

use super::{CategorySet, Engine, EngineConfig, EngineError};

const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com";
const RESULTS_PER_PAGE: usize = 30;

lazy_static! {
    static ref RESULT: Selector = Selector::parse("div.result").expect("valid selector");
    static ref TITLE_LINK: Selector = Selector::parse("a.result__a").expect("valid selector");
    static ref SNIPPET: Selector = Selector::parse("a.result__snippet").expect("valid selector");
}

pub struct DuckDuckGoEngine {
    config: EngineConfig,
    client: reqwest::Client,
}

impl DuckDuckGoEngine {
    pub fn new(client: reqwest::Client) -> Self {
        let config = EngineConfig::new("duckduckgo", "DuckDuckGo")
            .priority(80)
            .categories(CategorySet::Only(vec![Category::General]))
            .base_url(DEFAULT_BASE_URL)
            .normalize();
        Self { config, client }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    fn time_filter(range: TimeRange) -> Option<&'static str> {
        match range {
            TimeRange::Any => None,
            TimeRange::Day => Some("d"),
            TimeRange::Week => Some("w"),
            TimeRange::Month => Some("m"),
            TimeRange::Year => Some("y"),
        }
    }

    fn safe_search_param(level: u8) -> &'static str {
        match level {
            2 => "1",
            1 => "-1",
            _ => "-2",
        }
    }

    /// DuckDuckGo wraps outbound links in a redirect carrying the real URL
    /// in the `uddg` parameter.
    fn unwrap_redirect(href: &str) -> String {
        if let Some(idx) = href.find("uddg=") {
            let encoded = &href[idx + 5..];
            let encoded = encoded.split('&').next().unwrap_or(encoded);
            if let Ok(decoded) = urlencoding::decode(encoded) {
                return decoded.into_owned();
            }
        }
        if let Some(stripped) = href.strip_prefix("//") {
            return format!("https://{stripped}");
        }
        href.to_string()
    }

    fn parse_results(&self, body: &str) -> Vec<SearchResult> {
        let document = Html::parse_document(body);
        let mut results = Vec::new();

        for (position, node) in document.select(&RESULT).enumerate() {
            let Some(link) = node.select(&TITLE_LINK).next() else {
                continue;
            };
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let title: String = link.text().collect::<String>();
            if title.trim().is_empty() {
                continue;
            }

            let content = node
                .select(&SNIPPET)
                .next()
                .map(|s| s.text().collect::<String>())
                .unwrap_or_default();

            let mut result = SearchResult::new(
                title,
                Self::unwrap_redirect(href),
                self.config.id.clone(),
                Category::General,
            );
            result.content = content;
            result.position = position;
            results.push(result);
        }
        results
    }
}

#[async_trait]
impl Engine for DuckDuckGoEngine {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn search(&self, query: &Query) -> Result<Vec<SearchResult>, EngineError> {
        let offset = (query.page.saturating_sub(1)) * RESULTS_PER_PAGE;
        let mut params: Vec<(&str, String)> = vec![
            ("q", query.search_text()),
            ("s", offset.to_string()),
            ("kp", Self::safe_search_param(query.safe_search).to_string()),
        ];
        if let Some(df) = Self::time_filter(query.time_range) {
            params.push(("df", df.to_string()));
        }

        let response = self
            .client
            .get(format!("{}/html/", self.config.base_url))
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

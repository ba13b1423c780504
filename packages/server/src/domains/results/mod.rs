//! Canonical result records and the aggregated result set.

pub mod export;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::common::pagination::PageInfo;
use crate::domains::query::{Category, SortOrder};

/// A single item returned by an upstream engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
    /// Id of the first engine that produced this record.
    pub engine: String,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    /// Host part of `url` without a leading `www.`.
    #[serde(default)]
    pub domain: String,

    // Media fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,

    // Scoring fields.
    #[serde(default)]
    pub score: f64,
    /// 0-based rank the first contributing engine reported.
    #[serde(default)]
    pub position: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<f64>,
    /// Number of engines that produced this record; always ≥ 1 after merge.
    #[serde(default = "one")]
    pub duplicate_count: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

fn one() -> usize {
    1
}

impl SearchResult {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        engine: impl Into<String>,
        category: Category,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            engine: engine.into(),
            category,
            duplicate_count: 1,
            ..Default::default()
        }
    }

    /// Trim text fields and derive `domain` from `url`.
    pub fn sanitize(&mut self) {
        trim_in_place(&mut self.title);
        trim_in_place(&mut self.url);
        trim_in_place(&mut self.content);
        trim_option(&mut self.thumbnail);
        trim_option(&mut self.author);
        trim_option(&mut self.language);
        self.domain = extract_domain(&self.url);
        if self.duplicate_count == 0 {
            self.duplicate_count = 1;
        }
    }
}

fn trim_in_place(s: &mut String) {
    let trimmed = s.trim();
    if trimmed.len() != s.len() {
        *s = trimmed.to_string();
    }
}

fn trim_option(opt: &mut Option<String>) {
    if let Some(s) = opt {
        trim_in_place(s);
        if s.is_empty() {
            *opt = None;
        }
    }
}

/// Host part of a URL, lowercased, with a leading `www.` removed.
pub fn extract_domain(raw: &str) -> String {
    match Url::parse(raw.trim()) {
        Ok(url) => url
            .host_str()
            .map(|h| {
                let host = h.to_ascii_lowercase();
                host.strip_prefix("www.").unwrap_or(&host).to_string()
            })
            .unwrap_or_default(),
        Err(_) => String::new(),
    }
}

/// Canonical form used for deduplication: scheme stripped, host lowercased,
/// default ports removed, fragment dropped, trailing slash removed.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(mut url) => {
            url.set_fragment(None);
            let host = url.host_str().unwrap_or("").to_ascii_lowercase();
            // Url::port() is already None for the scheme's default port.
            let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
            let path = url.path().trim_end_matches('/');
            let query = url
                .query()
                .map(|q| format!("?{q}"))
                .unwrap_or_default();
            format!("{host}{port}{path}{query}")
        }
        Err(_) => {
            let stripped = trimmed
                .split_once("://")
                .map(|(_, rest)| rest)
                .unwrap_or(trimmed);
            let stripped = stripped.split('#').next().unwrap_or(stripped);
            stripped.trim_end_matches('/').to_ascii_lowercase()
        }
    }
}

/// Facet maps computed over the full merged list, before pagination.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Facets {
    pub domains: HashMap<String, usize>,
    pub languages: HashMap<String, usize>,
}

/// Aggregated, merged and paginated search output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    /// The query text as the user typed it.
    pub query: String,
    pub category: Category,
    pub results: Vec<SearchResult>,
    pub pagination: PageInfo,
    pub search_time_ms: u64,
    /// Engine ids that contributed at least one result.
    pub engines_used: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
    pub sort: SortOrder,
    pub facets: Facets,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_trims_and_derives_domain() {
        let mut result = SearchResult::new(
            "  Title  ",
            " https://www.Example.com/a ",
            "wikipedia",
            Category::General,
        );
        result.content = "\tbody text\n".to_string();
        result.author = Some("   ".to_string());
        result.sanitize();

        assert_eq!(result.title, "Title");
        assert_eq!(result.content, "body text");
        assert_eq!(result.domain, "example.com");
        assert_eq!(result.author, None);
        assert_eq!(result.duplicate_count, 1);
    }

    #[test]
    fn extract_domain_strips_www_and_lowercases() {
        assert_eq!(extract_domain("https://WWW.Example.COM/path?x=1"), "example.com");
        assert_eq!(extract_domain("http://sub.example.org"), "sub.example.org");
        assert_eq!(extract_domain("not a url"), "");
    }

    #[test]
    fn normalize_url_canonicalizes_equivalent_forms() {
        let forms = [
            "https://Example.com/a/",
            "http://example.com/a",
            "https://example.com:443/a",
            "https://example.com/a#section",
        ];
        let normalized: Vec<String> = forms.iter().map(|f| normalize_url(f)).collect();
        for n in &normalized {
            assert_eq!(n, "example.com/a");
        }
    }

    #[test]
    fn normalize_url_keeps_query_and_explicit_port() {
        assert_eq!(
            normalize_url("https://example.com:8443/a?b=1"),
            "example.com:8443/a?b=1"
        );
        assert_ne!(
            normalize_url("https://example.com/a?b=1"),
            normalize_url("https://example.com/a?b=2")
        );
    }
}

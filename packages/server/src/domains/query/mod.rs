//! Canonical query object.
//!
//! A `Query` is created per HTTP request, mutated only by parsing and
//! validation, consumed by the aggregator and discarded with the response.

pub mod operators;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::common::pagination::{clamp_limit, clamp_page, DEFAULT_LIMIT};

/// Result categories. Controls which engines are eligible and which media
/// fields are meaningful.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    General,
    Images,
    Videos,
    News,
    Maps,
}

impl Category {
    /// All categories, in their fixed public order.
    pub const ALL: [Category; 5] = [
        Category::General,
        Category::Images,
        Category::Videos,
        Category::News,
        Category::Maps,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Some(Category::General),
            "images" => Some(Category::Images),
            "videos" => Some(Category::Videos),
            "news" => Some(Category::News),
            "maps" => Some(Category::Maps),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Images => "images",
            Category::Videos => "videos",
            Category::News => "news",
            Category::Maps => "maps",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Category::General => "General",
            Category::Images => "Images",
            Category::Videos => "Videos",
            Category::News => "News",
            Category::Maps => "Maps",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Relevance,
    Date,
    DateAsc,
    Popularity,
    Random,
}

impl SortOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relevance" => Some(SortOrder::Relevance),
            "date" => Some(SortOrder::Date),
            "date_asc" => Some(SortOrder::DateAsc),
            "popularity" => Some(SortOrder::Popularity),
            "random" => Some(SortOrder::Random),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    #[default]
    Any,
    Day,
    Week,
    Month,
    Year,
}

impl TimeRange {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "any" => Some(TimeRange::Any),
            "day" => Some(TimeRange::Day),
            "week" => Some(TimeRange::Week),
            "month" => Some(TimeRange::Month),
            "year" => Some(TimeRange::Year),
            _ => None,
        }
    }
}

/// Filters derived from query operators (`site:`, `-term`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilters {
    pub site: Option<String>,
    pub exclude_sites: Vec<String>,
    pub file_types: Vec<String>,
    pub in_url: Option<String>,
    pub in_title: Option<String>,
    pub in_text: Option<String>,
    pub exact_phrases: Vec<String>,
    pub exclude_terms: Vec<String>,
    pub date_before: Option<NaiveDate>,
    pub date_after: Option<NaiveDate>,
}

impl QueryFilters {
    pub fn is_empty(&self) -> bool {
        *self == QueryFilters::default()
    }
}

/// Media-specific filters, meaningful only for image/video categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFilters {
    pub image_size: Option<String>,
    pub image_type: Option<String>,
    pub image_color: Option<String>,
    pub image_aspect: Option<String>,
    pub video_length: Option<String>,
    pub video_quality: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum QueryError {
    #[error("query text is empty")]
    EmptyText,
}

/// User input plus filters, normalized and ready for the aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    /// Cleaned text: operators stripped, whitespace collapsed.
    pub text: String,
    /// The raw text as the user typed it.
    pub raw: String,
    pub category: Category,
    pub language: String,
    pub region: Option<String>,
    /// 0 = off, 1 = moderate, 2 = strict.
    pub safe_search: u8,
    pub page: usize,
    pub per_page: usize,
    pub sort_by: SortOrder,
    pub time_range: TimeRange,
    pub filters: QueryFilters,
    pub media: MediaFilters,
    /// Explicit engine selection; empty means "all eligible".
    pub engines: Vec<String>,
    pub exclude_engines: Vec<String>,
}

impl Query {
    /// Parse raw user text into a normalized query.
    ///
    /// Operators are stripped into `filters`; the remaining text becomes
    /// `text`. Empty cleaned text is an error.
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        let raw = raw.trim();
        let parsed = operators::tokenize(raw);
        if parsed.text.is_empty() && parsed.filters.exact_phrases.is_empty() {
            return Err(QueryError::EmptyText);
        }
        Ok(Self {
            text: parsed.text,
            raw: raw.to_string(),
            category: Category::General,
            language: "en".to_string(),
            region: None,
            safe_search: 0,
            page: 1,
            per_page: DEFAULT_LIMIT,
            sort_by: SortOrder::Relevance,
            time_range: TimeRange::Any,
            filters: parsed.filters,
            media: MediaFilters::default(),
            engines: Vec::new(),
            exclude_engines: Vec::new(),
        })
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_page(mut self, page: i64) -> Self {
        self.page = clamp_page(page);
        self
    }

    pub fn with_per_page(mut self, per_page: i64) -> Self {
        self.per_page = clamp_limit(per_page);
        self
    }

    pub fn with_safe_search(mut self, level: i64) -> Self {
        self.safe_search = level.clamp(0, 2) as u8;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        let language = language.into();
        if !language.trim().is_empty() {
            self.language = language.trim().to_string();
        }
        self
    }

    pub fn with_sort(mut self, sort_by: SortOrder) -> Self {
        self.sort_by = sort_by;
        self
    }

    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = time_range;
        self
    }

    /// Text sent to upstream engines: the cleaned text plus any exact
    /// phrases re-quoted, since the tokenizer stripped them out.
    pub fn search_text(&self) -> String {
        if self.filters.exact_phrases.is_empty() {
            return self.text.clone();
        }
        let mut parts = Vec::with_capacity(1 + self.filters.exact_phrases.len());
        if !self.text.is_empty() {
            parts.push(self.text.clone());
        }
        for phrase in &self.filters.exact_phrases {
            parts.push(format!("\"{phrase}\""));
        }
        parts.join(" ")
    }

    pub fn with_engines(mut self, engines: Vec<String>) -> Self {
        self.engines = engines
            .into_iter()
            .map(|e| e.trim().to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }
}

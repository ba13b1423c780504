//! Video search through an Invidious instance.

use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;

use crate::domains::query::{Category, Query};
use crate::domains::results::SearchResult;

use super::{CategorySet, Engine, EngineConfig, EngineError};

const DEFAULT_BASE_URL: &str = "https://invidious.snopyta.org";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiVideo {
    #[serde(default)]
    title: String,
    video_id: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    length_seconds: Option<u32>,
    #[serde(default)]
    view_count: Option<u64>,
    #[serde(default)]
    published: Option<i64>,
    #[serde(default)]
    video_thumbnails: Vec<ApiThumbnail>,
}

#[derive(Debug, Deserialize)]
struct ApiThumbnail {
    #[serde(default)]
    url: String,
}

pub struct InvidiousEngine {
    config: EngineConfig,
    client: reqwest::Client,
}

impl InvidiousEngine {
    pub fn new(client: reqwest::Client) -> Self {
        let config = EngineConfig::new("invidious", "Invidious")
            .priority(60)
            .categories(CategorySet::Only(vec![Category::Videos]))
            .base_url(DEFAULT_BASE_URL)
            .normalize();
        Self { config, client }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Engine for InvidiousEngine {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn search(&self, query: &Query) -> Result<Vec<SearchResult>, EngineError> {
        let params: Vec<(&str, String)> = vec![
            ("q", query.search_text()),
            ("page", query.page.to_string()),
            ("type", "video".to_string()),
        ];

        let response = self
            .client
            .get(format!("{}/api/v1/search", self.config.base_url))
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(EngineError::Status(response.status()));
        }

        let videos: Vec<ApiVideo> = response
            .json()
            .await
            .map_err(|e| EngineError::Parse(e.to_string()))?;

        let results = videos
            .into_iter()
            .enumerate()
            .filter(|(_, v)| !v.title.is_empty())
            .map(|(position, video)| {
                let mut result = SearchResult::new(
                    video.title,
                    format!("https://www.youtube.com/watch?v={}", video.video_id),
                    self.config.id.clone(),
                    Category::Videos,
                );
                result.content = video.description.unwrap_or_default();
                result.author = video.author;
                result.thumbnail = video
                    .video_thumbnails
                    .into_iter()
                    .map(|t| t.url)
                    .find(|u| !u.is_empty());
                result.duration_seconds = video.length_seconds;
                result.view_count = video.view_count;
                result.published_at = video
                    .published
                    .and_then(|ts| DateTime::from_timestamp(ts, 0));
                result.position = position;
                result
            })
            .collect();
        Ok(results)
    }
}

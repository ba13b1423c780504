//! Openverse engine for openly-licensed images.

use async_trait::async_trait;
use serde::Deserialize;

use crate::domains::query::{Category, Query};
use crate::domains::results::SearchResult;

use super::{CategorySet, Engine, EngineConfig, EngineError};

const DEFAULT_BASE_URL: &str = "https://api.openverse.org";
const PAGE_SIZE: usize = 20;

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    results: Vec<ApiImage>,
}

#[derive(Debug, Deserialize)]
struct ApiImage {
    #[serde(default)]
    title: Option<String>,
    url: String,
    #[serde(default)]
    foreign_landing_url: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    creator: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    filetype: Option<String>,
    #[serde(default)]
    filesize: Option<u64>,
    #[serde(default)]
    license: Option<String>,
}

pub struct OpenverseEngine {
    config: EngineConfig,
    client: reqwest::Client,
}

impl OpenverseEngine {
    pub fn new(client: reqwest::Client) -> Self {
        let config = EngineConfig::new("openverse", "Openverse")
            .priority(70)
            .categories(CategorySet::Only(vec![Category::Images]))
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
impl Engine for OpenverseEngine {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn search(&self, query: &Query) -> Result<Vec<SearchResult>, EngineError> {
        let mut params: Vec<(&str, String)> = vec![
            ("q", query.search_text()),
            ("page", query.page.to_string()),
            ("page_size", PAGE_SIZE.min(self.config.max_results).to_string()),
        ];
        if query.safe_search == 0 {
            params.push(("mature", "true".to_string()));
        }
        if let Some(size) = &query.media.image_size {
            params.push(("size", size.clone()));
        }
        if let Some(aspect) = &query.media.image_aspect {
            params.push(("aspect_ratio", aspect.clone()));
        }

        let response = self
            .client
            .get(format!("{}/v1/images/", self.config.base_url))
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
            .results
            .into_iter()
            .enumerate()
            .map(|(position, image)| {
                let landing = image.foreign_landing_url.unwrap_or_else(|| image.url.clone());
                let mut result = SearchResult::new(
                    image.title.unwrap_or_else(|| "Untitled".to_string()),
                    landing,
                    self.config.id.clone(),
                    Category::Images,
                );
                result.thumbnail = image.thumbnail.or(Some(image.url));
                result.author = image.creator;
                result.width = image.width;
                result.height = image.height;
                result.format = image.filetype.clone();
                result.file_type = image.filetype;
                result.file_size = image.filesize;
                if let Some(license) = image.license {
                    result
                        .metadata
                        .insert("license".to_string(), serde_json::json!(license));
                }
                result.position = position;
                result
            })
            .collect();
        Ok(results)
    }
}

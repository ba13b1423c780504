//! Map/place search via OSM Nominatim.

use async_trait::async_trait;
use serde::Deserialize;

use crate::domains::query::{Category, Query};
use crate::domains::results::SearchResult;

use super::{CategorySet, Engine, EngineConfig, EngineError};

const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";
const PAGE_SIZE: usize = 50;

#[derive(Debug, Deserialize)]
struct ApiPlace {
    #[serde(default)]
    osm_type: Option<String>,
    #[serde(default)]
    osm_id: Option<u64>,
    #[serde(default)]
    lat: Option<String>,
    #[serde(default)]
    lon: Option<String>,
    #[serde(default)]
    name: Option<String>,
    display_name: String,
    #[serde(rename = "type", default)]
    place_type: Option<String>,
    #[serde(default)]
    importance: Option<f64>,
}

pub struct NominatimEngine {
    config: EngineConfig,
    client: reqwest::Client,
}

impl NominatimEngine {
    pub fn new(client: reqwest::Client) -> Self {
        let config = EngineConfig::new("nominatim", "OpenStreetMap")
            .priority(80)
            .categories(CategorySet::Only(vec![Category::Maps]))
            .base_url(DEFAULT_BASE_URL)
            .normalize();
        Self { config, client }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    fn place_url(place: &ApiPlace) -> Option<String> {
        let osm_type = place.osm_type.as_deref()?;
        let osm_id = place.osm_id?;
        Some(format!("https://www.openstreetmap.org/{osm_type}/{osm_id}"))
    }
}

#[async_trait]
impl Engine for NominatimEngine {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn search(&self, query: &Query) -> Result<Vec<SearchResult>, EngineError> {
        let params: Vec<(&str, String)> = vec![
            ("q", query.search_text()),
            ("format", "jsonv2".to_string()),
            ("limit", PAGE_SIZE.min(self.config.max_results).to_string()),
            ("accept-language", query.language.clone()),
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

        let places: Vec<ApiPlace> = response
            .json()
            .await
            .map_err(|e| EngineError::Parse(e.to_string()))?;

        let results = places
            .into_iter()
            .enumerate()
            .filter_map(|(position, place)| {
                let url = Self::place_url(&place)?;
                let title = place
                    .name
                    .clone()
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| place.display_name.clone());
                let mut result =
                    SearchResult::new(title, url, self.config.id.clone(), Category::Maps);
                result.content = place.display_name.clone();
                result.popularity = place.importance;
                if let (Some(lat), Some(lon)) = (&place.lat, &place.lon) {
                    result
                        .metadata
                        .insert("lat".to_string(), serde_json::json!(lat));
                    result
                        .metadata
                        .insert("lon".to_string(), serde_json::json!(lon));
                }
                if let Some(place_type) = place.place_type {
                    result
                        .metadata
                        .insert("place_type".to_string(), serde_json::json!(place_type));
                }
                result.position = position;
                Some(result)
            })
            .collect();
        Ok(results)
    }
}

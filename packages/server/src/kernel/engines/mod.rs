//! Upstream search engine abstraction.
//!
//! Each upstream provider is one `Engine` implementation registered in the
//! `EngineRegistry`. The registry is initialized at startup and read-only
//! afterwards, so lookups take no lock.

pub mod brave;
pub mod duckduckgo;
pub mod hackernews;
pub mod invidious;
pub mod nominatim;
pub mod openverse;
pub mod wikipedia;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::domains::query::{Category, Query};
use crate::domains::results::SearchResult;

pub use brave::BraveEngine;
pub use duckduckgo::DuckDuckGoEngine;
pub use hackernews::HackerNewsEngine;
pub use invidious::InvidiousEngine;
pub use nominatim::NominatimEngine;
pub use openverse::OpenverseEngine;
pub use wikipedia::WikipediaEngine;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_RESULTS: usize = 100;

/// Which categories an engine serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategorySet {
    All,
    Only(Vec<Category>),
}

impl CategorySet {
    pub fn contains(&self, category: Category) -> bool {
        match self {
            CategorySet::All => true,
            CategorySet::Only(cats) => cats.contains(&category),
        }
    }

    pub fn ids(&self) -> Vec<&'static str> {
        match self {
            CategorySet::All => vec!["all"],
            CategorySet::Only(cats) => cats.iter().map(|c| c.as_str()).collect(),
        }
    }
}

/// Declarative per-engine parameters.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub id: String,
    pub display_name: String,
    pub enabled: bool,
    /// 1–100; higher priority means a stronger vote during merging.
    pub priority: u8,
    pub categories: CategorySet,
    pub language: Option<String>,
    pub timeout: Duration,
    pub max_results: usize,
    pub tor_capable: bool,
    pub tor_enabled: bool,
    /// Requests allowed per minute against the upstream, when it cares.
    pub rate_limit_per_minute: Option<u32>,
    pub settings: HashMap<String, serde_json::Value>,
    /// Upstream origin, probed by the liveness job.
    pub base_url: String,
}

impl EngineConfig {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            enabled: true,
            priority: 50,
            categories: CategorySet::Only(vec![Category::General]),
            language: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_results: DEFAULT_MAX_RESULTS,
            tor_capable: false,
            tor_enabled: false,
            rate_limit_per_minute: None,
            settings: HashMap::new(),
            base_url: String::new(),
        }
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.priority = priority.clamp(1, 100);
        self
    }

    pub fn categories(mut self, categories: CategorySet) -> Self {
        self.categories = categories;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        if secs > 0 {
            self.timeout = Duration::from_secs(secs);
        }
        self
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        if max_results > 0 {
            self.max_results = max_results;
        }
        self
    }

    /// Apply defaults to zeroed fields, keeping the config invariants.
    pub fn normalize(mut self) -> Self {
        if self.timeout.is_zero() {
            self.timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
        }
        if self.max_results == 0 {
            self.max_results = DEFAULT_MAX_RESULTS;
        }
        self.priority = self.priority.clamp(1, 100);
        self
    }
}

/// Errors raised while querying an upstream engine. The aggregator absorbs
/// these; they never surface to the client.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("request to upstream failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("upstream returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("failed to parse upstream response: {0}")]
    Parse(String),
}

/// One upstream search provider.
#[async_trait]
pub trait Engine: Send + Sync {
    fn config(&self) -> &EngineConfig;

    fn id(&self) -> &str {
        &self.config().id
    }

    fn display_name(&self) -> &str {
        &self.config().display_name
    }

    fn enabled(&self) -> bool {
        self.config().enabled
    }

    fn priority(&self) -> u8 {
        self.config().priority
    }

    fn categories(&self) -> &CategorySet {
        &self.config().categories
    }

    /// Fetch results for a query. Implementations must honor the query's
    /// page and the engine's `max_results`, and must not panic on malformed
    /// upstream payloads.
    async fn search(&self, query: &Query) -> Result<Vec<SearchResult>, EngineError>;
}

/// Id → engine map with stable insertion-order iteration.
#[derive(Default)]
pub struct EngineRegistry {
    engines: IndexMap<String, Arc<dyn Engine>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, engine: Arc<dyn Engine>) {
        let id = engine.id().to_string();
        if self.engines.insert(id.clone(), engine).is_some() {
            tracing::warn!(engine = %id, "engine registered twice, keeping the last one");
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Engine>> {
        self.engines.get(id).cloned()
    }

    pub fn all(&self) -> Vec<Arc<dyn Engine>> {
        self.engines.values().cloned().collect()
    }

    pub fn enabled(&self) -> Vec<Arc<dyn Engine>> {
        self.engines
            .values()
            .filter(|e| e.enabled())
            .cloned()
            .collect()
    }

    pub fn for_category(&self, category: Category) -> Vec<Arc<dyn Engine>> {
        self.engines
            .values()
            .filter(|e| e.enabled() && e.categories().contains(category))
            .cloned()
            .collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.engines.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

/// Build the registry of bundled engines, skipping any id in `disabled`.
pub fn build_registry(client: &reqwest::Client, disabled: &[String]) -> EngineRegistry {
    let mut registry = EngineRegistry::new();
    let engines: Vec<Arc<dyn Engine>> = vec![
        Arc::new(DuckDuckGoEngine::new(client.clone())),
        Arc::new(BraveEngine::new(client.clone())),
        Arc::new(WikipediaEngine::new(client.clone())),
        Arc::new(HackerNewsEngine::new(client.clone())),
        Arc::new(OpenverseEngine::new(client.clone())),
        Arc::new(InvidiousEngine::new(client.clone())),
        Arc::new(NominatimEngine::new(client.clone())),
    ];
    for engine in engines {
        if disabled.iter().any(|d| d == engine.id()) {
            tracing::info!(engine = %engine.id(), "engine disabled by configuration");
            continue;
        }
        registry.register(engine);
    }
    registry
}

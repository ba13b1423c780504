//! Process-wide services: the engine registry, upstream clients and the
//! shared dependency container handed to the HTTP layer.

pub mod autocomplete;
pub mod engines;
pub mod health;
pub mod scheduled_tasks;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::domains::bangs::BangTable;
use crate::domains::instant::InstantDispatcher;
use crate::domains::search::Aggregator;

pub use autocomplete::AutocompleteClient;
pub use engines::{build_registry, Engine, EngineRegistry};
pub use health::{HealthChecker, HealthStatus};
pub use scheduled_tasks::{EngineStatusBoard, SchedulerHandle};

const USER_AGENT: &str = concat!("Periscope/", env!("CARGO_PKG_VERSION"));

/// Shared upstream HTTP client. One per process; engines clone the handle.
/// No cookie store: requests carry nothing identifying across upstreams.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")
}

/// Everything the HTTP surface needs, built once at startup.
pub struct ServerDeps {
    pub config: Config,
    pub registry: Arc<EngineRegistry>,
    pub aggregator: Aggregator,
    pub instant: InstantDispatcher,
    pub bangs: BangTable,
    pub autocomplete: AutocompleteClient,
    pub health: HealthChecker,
    pub status_board: Arc<EngineStatusBoard>,
    pub scheduler_handle: SchedulerHandle,
    pub started_at: DateTime<Utc>,
}

impl ServerDeps {
    /// Wire up all process-wide services from configuration.
    pub fn build(config: Config) -> Result<Self> {
        let client = http_client()?;
        let registry = Arc::new(build_registry(&client, &config.disabled_engines));
        let aggregator = Aggregator::new(registry.clone())
            .with_max_timeout(Duration::from_secs(config.max_search_timeout_secs));
        let instant = InstantDispatcher::with_builtin_handlers();
        let bangs = BangTable::builtin();
        let autocomplete = AutocompleteClient::new(client.clone())
            .with_timeout(Duration::from_millis(config.autocomplete_timeout_ms));

        let status_board = Arc::new(EngineStatusBoard::new());
        let scheduler_handle = SchedulerHandle::new();

        let mut health = HealthChecker::new(config.maintenance_mode);
        health.register(Arc::new(health::EnginesCheck::new(registry.clone())));
        health.register(Arc::new(health::HttpClientCheck));
        health.register(Arc::new(health::SchedulerCheck::new(
            scheduler_handle.clone(),
        )));

        Ok(Self {
            config,
            registry,
            aggregator,
            instant,
            bangs,
            autocomplete,
            health,
            status_board,
            scheduler_handle,
            started_at: Utc::now(),
        })
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

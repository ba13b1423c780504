//! Scheduled engine liveness probe.
//!
//! An hourly job pings each enabled engine's upstream origin and records
//! status and latency on a shared board, surfaced by the engines endpoint
//! and by the `scheduler` health check.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, info, warn};

use super::engines::EngineRegistry;

const PROBE_SCHEDULE: &str = "0 7 * * * *"; // hourly, seven past
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    pub checked_at: DateTime<Utc>,
}

/// Last probe outcome per engine id. Written by the probe job, read by the
/// engines endpoint.
#[derive(Default)]
pub struct EngineStatusBoard {
    statuses: RwLock<HashMap<String, EngineStatus>>,
}

impl EngineStatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, engine_id: &str, status: EngineStatus) {
        let mut statuses = self.statuses.write().unwrap_or_else(|e| e.into_inner());
        statuses.insert(engine_id.to_string(), status);
    }

    pub fn get(&self, engine_id: &str) -> Option<EngineStatus> {
        let statuses = self.statuses.read().unwrap_or_else(|e| e.into_inner());
        statuses.get(engine_id).cloned()
    }
}

/// Liveness flag for the probe scheduler, consumed by the health check.
#[derive(Clone, Default)]
pub struct SchedulerHandle {
    running: Arc<AtomicBool>,
}

impl SchedulerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_running(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Ping every enabled engine's base URL once and record the outcome.
pub async fn probe_engines(
    registry: &EngineRegistry,
    client: &reqwest::Client,
    board: &EngineStatusBoard,
) {
    for engine in registry.enabled() {
        let base_url = engine.config().base_url.clone();
        if base_url.is_empty() {
            continue;
        }
        let started = Instant::now();
        let outcome = client
            .get(&base_url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await;
        let latency = started.elapsed().as_millis() as u64;

        let status = match outcome {
            Ok(response) if !response.status().is_server_error() => {
                debug!(engine = %engine.id(), latency_ms = latency, "engine probe ok");
                EngineStatus {
                    reachable: true,
                    latency_ms: Some(latency),
                    checked_at: Utc::now(),
                }
            }
            Ok(response) => {
                warn!(engine = %engine.id(), status = %response.status(), "engine probe got server error");
                EngineStatus {
                    reachable: false,
                    latency_ms: Some(latency),
                    checked_at: Utc::now(),
                }
            }
            Err(e) => {
                warn!(engine = %engine.id(), error = %e, "engine probe failed");
                EngineStatus {
                    reachable: false,
                    latency_ms: None,
                    checked_at: Utc::now(),
                }
            }
        };
        board.record(engine.id(), status);
    }
}

/// Start the hourly probe job and run one probe immediately in the
/// background. Returns the scheduler so it stays alive with the process.
pub async fn start_scheduler(
    registry: Arc<EngineRegistry>,
    client: reqwest::Client,
    board: Arc<EngineStatusBoard>,
    handle: SchedulerHandle,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new()
        .await
        .context("Failed to create job scheduler")?;

    let job_registry = registry.clone();
    let job_client = client.clone();
    let job_board = board.clone();
    let job = Job::new_async(PROBE_SCHEDULE, move |_id, _lock| {
        let registry = job_registry.clone();
        let client = job_client.clone();
        let board = job_board.clone();
        Box::pin(async move {
            probe_engines(&registry, &client, &board).await;
        })
    })
    .context("Failed to create engine probe job")?;

    scheduler
        .add(job)
        .await
        .context("Failed to schedule engine probe job")?;
    scheduler
        .start()
        .await
        .context("Failed to start job scheduler")?;
    handle.mark_running();
    info!("engine probe scheduler started");

    // Seed the board without blocking startup.
    tokio::spawn(async move {
        probe_engines(&registry, &client, &board).await;
    });

    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn board_records_and_returns_statuses() {
        let board = EngineStatusBoard::new();
        assert!(board.get("duckduckgo").is_none());
        board.record(
            "duckduckgo",
            EngineStatus {
                reachable: true,
                latency_ms: Some(12),
                checked_at: Utc::now(),
            },
        );
        let status = board.get("duckduckgo").unwrap();
        assert!(status.reachable);
        assert_eq!(status.latency_ms, Some(12));
    }

    #[test]
    fn handle_flips_to_running() {
        let handle = SchedulerHandle::new();
        assert!(!handle.is_running());
        handle.mark_running();
        assert!(handle.is_running());
    }

    #[tokio::test]
    async fn probe_marks_reachable_upstreams() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        // Point a real adapter at the mock server; disable all the others.
        let mut registry = crate::kernel::engines::EngineRegistry::new();
        registry.register(std::sync::Arc::new(
            crate::kernel::engines::WikipediaEngine::new(client.clone())
                .with_base_url(server.uri()),
        ));
        let board = EngineStatusBoard::new();

        probe_engines(&registry, &client, &board).await;
        let status = board.get("wikipedia").unwrap();
        assert!(status.reachable);
    }

    #[tokio::test]
    async fn probe_marks_unreachable_upstreams() {
        let client = reqwest::Client::new();
        let mut registry = crate::kernel::engines::EngineRegistry::new();
        registry.register(std::sync::Arc::new(
            crate::kernel::engines::WikipediaEngine::new(client.clone())
                .with_base_url("http://127.0.0.1:1"),
        ));
        let board = EngineStatusBoard::new();

        probe_engines(&registry, &client, &board).await;
        let status = board.get("wikipedia").unwrap();
        assert!(!status.reachable);
    }
}

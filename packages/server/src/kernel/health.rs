//! Health model: maintenance mode plus named subsystem checks.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::engines::EngineRegistry;
use super::scheduled_tasks::SchedulerHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Maintenance,
}

impl HealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Maintenance => "maintenance",
        }
    }
}

/// One compulsory subsystem check.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    fn name(&self) -> &'static str;
    async fn check(&self) -> Result<(), String>;
}

#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub name: &'static str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub checks: Vec<CheckReport>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// Runs all registered checks; healthy iff not in maintenance mode and
/// every check passes.
pub struct HealthChecker {
    maintenance: bool,
    checks: Vec<Arc<dyn HealthCheck>>,
}

impl HealthChecker {
    pub fn new(maintenance: bool) -> Self {
        Self {
            maintenance,
            checks: Vec::new(),
        }
    }

    pub fn register(&mut self, check: Arc<dyn HealthCheck>) {
        self.checks.push(check);
    }

    pub async fn status(&self) -> HealthReport {
        if self.maintenance {
            return HealthReport {
                status: HealthStatus::Maintenance,
                checks: Vec::new(),
            };
        }

        let mut reports = Vec::with_capacity(self.checks.len());
        let mut all_ok = true;
        for check in &self.checks {
            match check.check().await {
                Ok(()) => reports.push(CheckReport {
                    name: check.name(),
                    status: "ok",
                    error: None,
                }),
                Err(e) => {
                    all_ok = false;
                    reports.push(CheckReport {
                        name: check.name(),
                        status: "error",
                        error: Some(e),
                    });
                }
            }
        }

        HealthReport {
            status: if all_ok {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy
            },
            checks: reports,
        }
    }
}

/// At least one engine must be registered and enabled.
pub struct EnginesCheck {
    registry: Arc<EngineRegistry>,
}

impl EnginesCheck {
    pub fn new(registry: Arc<EngineRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl HealthCheck for EnginesCheck {
    fn name(&self) -> &'static str {
        "engines"
    }

    async fn check(&self) -> Result<(), String> {
        if self.registry.is_empty() {
            return Err("no engines registered".to_string());
        }
        if self.registry.enabled().is_empty() {
            return Err("all engines are disabled".to_string());
        }
        Ok(())
    }
}

/// The shared upstream HTTP client must exist.
pub struct HttpClientCheck;

#[async_trait]
impl HealthCheck for HttpClientCheck {
    fn name(&self) -> &'static str {
        "http_client"
    }

    async fn check(&self) -> Result<(), String> {
        // The client is constructed at startup; reaching this check means
        // it exists and the runtime is serving requests.
        Ok(())
    }
}

/// The engine probe scheduler must have started.
pub struct SchedulerCheck {
    handle: SchedulerHandle,
}

impl SchedulerCheck {
    pub fn new(handle: SchedulerHandle) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl HealthCheck for SchedulerCheck {
    fn name(&self) -> &'static str {
        "scheduler"
    }

    async fn check(&self) -> Result<(), String> {
        if self.handle.is_running() {
            Ok(())
        } else {
            Err("engine probe scheduler is not running".to_string())
        }
    }
}

//! Parallel fan-out across the selected engines.
//!
//! Every engine runs in its own task under `min(global, engine)` timeout.
//! Failures, timeouts and panics are absorbed per engine; the merge runs
//! over whatever arrived before the global deadline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::AbortHandle;
use tracing::{debug, error, warn};

use crate::common::pagination::{paginate, PageInfo};
use crate::domains::query::Query;
use crate::domains::results::SearchResults;
use crate::kernel::engines::{Engine, EngineRegistry};

use super::merge::{merge, EngineBatch};

const DEFAULT_MAX_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, thiserror::Error)]
pub enum SearchError {
    #[error("no engines available for this query")]
    NoEngines,
    #[error("search was cancelled before any engine completed")]
    Cancelled,
}

/// Aborts still-running engine tasks if the aggregator itself is dropped
/// (client went away), so in-flight upstream fetches are not leaked.
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

pub struct Aggregator {
    registry: Arc<EngineRegistry>,
    max_timeout: Duration,
}

impl Aggregator {
    pub fn new(registry: Arc<EngineRegistry>) -> Self {
        Self {
            registry,
            max_timeout: DEFAULT_MAX_TIMEOUT,
        }
    }

    pub fn with_max_timeout(mut self, max_timeout: Duration) -> Self {
        if !max_timeout.is_zero() {
            self.max_timeout = max_timeout;
        }
        self
    }

    /// Explicit `query.engines` wins (intersected with enabled engines);
    /// otherwise every enabled engine serving the query's category.
    fn select_engines(&self, query: &Query) -> Vec<Arc<dyn Engine>> {
        let mut selected: Vec<Arc<dyn Engine>> = if query.engines.is_empty() {
            self.registry.for_category(query.category)
        } else {
            query
                .engines
                .iter()
                .filter_map(|id| self.registry.get(id))
                .filter(|e| e.enabled())
                .collect()
        };
        if !query.exclude_engines.is_empty() {
            selected.retain(|e| !query.exclude_engines.iter().any(|x| x == e.id()));
        }
        selected
    }

    /// Run the query against all selected engines and merge the outcome.
    ///
    /// `budget` further caps the global deadline, modeling the caller's own
    /// remaining time. Partial results are a success; the only errors are an
    /// empty engine selection and cancellation before any engine reported.
    pub async fn search(&self, query: &Query) -> Result<SearchResults, SearchError> {
        self.search_with_budget(query, None).await
    }

    pub async fn search_with_budget(
        &self,
        query: &Query,
        budget: Option<Duration>,
    ) -> Result<SearchResults, SearchError> {
        let started = Instant::now();
        let engines = self.select_engines(query);
        if engines.is_empty() {
            return Err(SearchError::NoEngines);
        }

        let global_timeout = match budget {
            Some(budget) if budget < self.max_timeout => budget,
            _ => self.max_timeout,
        };

        debug!(
            query = %query.text,
            category = query.category.as_str(),
            engines = engines.len(),
            timeout_ms = global_timeout.as_millis() as u64,
            "dispatching search"
        );

        let buffer: Arc<Mutex<Vec<EngineBatch>>> = Arc::new(Mutex::new(Vec::new()));
        let reported = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(engines.len());
        let mut abort_handles = Vec::with_capacity(engines.len());

        for engine in engines {
            let engine_timeout = global_timeout.min(engine.config().timeout);
            let max_results = engine.config().max_results;
            let priority = engine.priority();
            let engine_id = engine.id().to_string();
            let query = query.clone();
            let buffer = Arc::clone(&buffer);
            let reported = Arc::clone(&reported);

            let handle = tokio::spawn(async move {
                let outcome = tokio::time::timeout(engine_timeout, engine.search(&query)).await;
                reported.fetch_add(1, Ordering::SeqCst);
                match outcome {
                    Ok(Ok(mut results)) => {
                        results.truncate(max_results);
                        let count = results.len();
                        debug!(engine = %engine_id, results = count, "engine succeeded");
                        let mut buffer = buffer.lock().unwrap_or_else(|e| e.into_inner());
                        buffer.push(EngineBatch {
                            engine_id,
                            priority,
                            results,
                        });
                    }
                    Ok(Err(e)) => {
                        warn!(engine = %engine_id, error = %e, "engine search failed");
                    }
                    Err(_) => {
                        warn!(
                            engine = %engine_id,
                            timeout_ms = engine_timeout.as_millis() as u64,
                            "engine timed out"
                        );
                    }
                }
            });
            abort_handles.push(handle.abort_handle());
            handles.push(handle);
        }

        let guard = AbortOnDrop(abort_handles);

        let wait_all = async {
            for joined in futures::future::join_all(handles).await {
                match joined {
                    Ok(()) => {}
                    Err(e) if e.is_panic() => {
                        error!(error = %e, "engine task panicked, treating as failed");
                    }
                    Err(_) => {}
                }
            }
        };

        if tokio::time::timeout(global_timeout, wait_all).await.is_err() {
            warn!("global search deadline reached, merging partial results");
            drop(guard); // cancel the stragglers
            if reported.load(Ordering::SeqCst) == 0 {
                return Err(SearchError::Cancelled);
            }
        } else {
            drop(guard);
        }

        let batches = {
            let mut buffer = buffer.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *buffer)
        };
        let merged = merge(query, batches);

        let total = merged.results.len();
        let pagination = PageInfo::new(query.page, query.per_page, total);
        let results = paginate(merged.results, query.page, query.per_page);

        Ok(SearchResults {
            query: query.raw.clone(),
            category: query.category,
            results,
            pagination,
            search_time_ms: started.elapsed().as_millis() as u64,
            engines_used: merged.engines_used,
            suggestions: None,
            sort: query.sort_by,
            facets: merged.facets,
        })
    }
}

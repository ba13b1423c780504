//! Instant / direct answer dispatch.
//!
//! Handlers register pattern matchers against the query text; the first
//! match wins, in registration order. A handler returning `None` or an
//! error lets the pipeline continue to a full search.

pub mod handlers;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use handlers::{HashHandler, ResolveHandler, TimeHandler, UuidHandler};

/// A zero-click answer.
///
/// Either `content` or `error` is non-empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub answer_type: String,
    pub query: String,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, serde_json::Value>,
    pub source: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub cache_ttl_seconds: u64,
}

impl Answer {
    pub fn new(answer_type: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            answer_type: answer_type.into(),
            query: query.into(),
            title: String::new(),
            content: String::new(),
            data: HashMap::new(),
            source: String::new(),
            source_url: String::new(),
            error: None,
            cache_ttl_seconds: 300,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnswerError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("lookup failed: {0}")]
    Lookup(String),
}

/// One instant-answer producer.
#[async_trait]
pub trait InstantHandler: Send + Sync {
    /// Identifier used by the `direct/{type}/{term}` endpoint.
    fn answer_type(&self) -> &'static str;

    /// Compiled matchers against the full query text. The first capture
    /// group, when present, is the extracted term.
    fn patterns(&self) -> &[Regex];

    /// Seconds an upstream cache may keep this answer type.
    fn cache_ttl(&self) -> u64 {
        300
    }

    /// Produce an answer for an already-extracted term.
    async fn handle_term(&self, term: &str) -> Result<Option<Answer>, AnswerError>;
}

/// Registration-ordered dispatcher over instant handlers.
#[derive(Default)]
pub struct InstantDispatcher {
    handlers: Vec<Arc<dyn InstantHandler>>,
}

impl InstantDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatcher with all bundled handlers registered.
    pub fn with_builtin_handlers() -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register(Arc::new(ResolveHandler::new()));
        dispatcher.register(Arc::new(HashHandler::new()));
        dispatcher.register(Arc::new(TimeHandler::new()));
        dispatcher.register(Arc::new(UuidHandler::new()));
        dispatcher
    }

    pub fn register(&mut self, handler: Arc<dyn InstantHandler>) {
        self.handlers.push(handler);
    }

    pub fn handler(&self, answer_type: &str) -> Option<Arc<dyn InstantHandler>> {
        self.handlers
            .iter()
            .find(|h| h.answer_type() == answer_type)
            .cloned()
    }

    pub fn answer_types(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.answer_type()).collect()
    }

    /// Match the query against registered handlers, first match wins.
    /// Handler errors are logged and treated as "no answer".
    pub async fn dispatch(&self, query_text: &str) -> Option<Answer> {
        let query_text = query_text.trim();
        if query_text.is_empty() {
            return None;
        }
        for handler in &self.handlers {
            for pattern in handler.patterns() {
                let Some(captures) = pattern.captures(query_text) else {
                    continue;
                };
                let term = captures
                    .get(1)
                    .map(|m| m.as_str())
                    .unwrap_or(query_text)
                    .trim();
                match handler.handle_term(term).await {
                    Ok(Some(mut answer)) => {
                        answer.query = query_text.to_string();
                        answer.cache_ttl_seconds = handler.cache_ttl();
                        return Some(answer);
                    }
                    Ok(None) => return None,
                    Err(e) => {
                        warn!(
                            handler = handler.answer_type(),
                            error = %e,
                            "instant handler failed, continuing to full search"
                        );
                        return None;
                    }
                }
            }
        }
        None
    }

    /// Invoke a producer by type for the `direct/{type}/{term}` endpoint.
    pub async fn direct(
        &self,
        answer_type: &str,
        term: &str,
    ) -> Option<Result<Option<Answer>, AnswerError>> {
        let handler = self.handler(answer_type)?;
        let mut result = handler.handle_term(term).await;
        if let Ok(Some(answer)) = &mut result {
            answer.query = term.to_string();
            answer.cache_ttl_seconds = handler.cache_ttl();
        }
        Some(result)
    }
}

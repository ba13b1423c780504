//! Bundled instant-answer producers.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

use super::{Answer, AnswerError, InstantHandler};

lazy_static! {
    static ref RESOLVE_PATTERNS: Vec<Regex> =
        vec![Regex::new(r"(?i)^(?:resolve|dns)[:\s]+(\S+)$").expect("valid regex")];
    static ref HASH_PATTERNS: Vec<Regex> =
        vec![Regex::new(r"(?i)^(?:hash|sha256)[:\s]+(.+)$").expect("valid regex")];
    static ref TIME_PATTERNS: Vec<Regex> =
        vec![Regex::new(r"(?i)^(?:time|now|utc)$").expect("valid regex")];
    static ref UUID_PATTERNS: Vec<Regex> =
        vec![Regex::new(r"(?i)^uuid$").expect("valid regex")];
}

/// `resolve example.com` — DNS lookup through the runtime's resolver.
#[derive(Default)]
pub struct ResolveHandler;

impl ResolveHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl InstantHandler for ResolveHandler {
    fn answer_type(&self) -> &'static str {
        "resolve"
    }

    fn patterns(&self) -> &[Regex] {
        &RESOLVE_PATTERNS
    }

    fn cache_ttl(&self) -> u64 {
        3600
    }

    async fn handle_term(&self, term: &str) -> Result<Option<Answer>, AnswerError> {
        let host = term.trim().trim_end_matches('.');
        if host.is_empty() {
            return Ok(None);
        }

        let mut answer = Answer::new("resolve", host);
        answer.title = format!("DNS records for {host}");
        answer.source = "DNS".to_string();

        // Port is required by lookup_host but irrelevant to the answer.
        match tokio::net::lookup_host((host, 443)).await {
            Ok(addrs) => {
                let ips: Vec<String> = addrs.map(|a| a.ip().to_string()).collect();
                if ips.is_empty() {
                    answer.error = Some(format!("no records found for {host}"));
                } else {
                    answer.content = ips.join(", ");
                    answer
                        .data
                        .insert("addresses".to_string(), serde_json::json!(ips));
                    answer
                        .data
                        .insert("host".to_string(), serde_json::json!(host));
                }
                Ok(Some(answer))
            }
            Err(e) => Err(AnswerError::Lookup(format!("{host}: {e}"))),
        }
    }
}

/// `hash: some text` — SHA-256 digest of the term.
#[derive(Default)]
pub struct HashHandler;

impl HashHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl InstantHandler for HashHandler {
    fn answer_type(&self) -> &'static str {
        "hash"
    }

    fn patterns(&self) -> &[Regex] {
        &HASH_PATTERNS
    }

    fn cache_ttl(&self) -> u64 {
        86400
    }

    async fn handle_term(&self, term: &str) -> Result<Option<Answer>, AnswerError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(None);
        }
        let digest = hex::encode(Sha256::digest(term.as_bytes()));

        let mut answer = Answer::new("hash", term);
        answer.title = format!("SHA-256 of \"{term}\"");
        answer.content = digest.clone();
        answer.source = "sha2".to_string();
        answer
            .data
            .insert("algorithm".to_string(), serde_json::json!("sha256"));
        answer
            .data
            .insert("digest".to_string(), serde_json::json!(digest));
        Ok(Some(answer))
    }
}

/// `time` / `now` — current UTC time.
#[derive(Default)]
pub struct TimeHandler;

impl TimeHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl InstantHandler for TimeHandler {
    fn answer_type(&self) -> &'static str {
        "time"
    }

    fn patterns(&self) -> &[Regex] {
        &TIME_PATTERNS
    }

    fn cache_ttl(&self) -> u64 {
        0
    }

    async fn handle_term(&self, _term: &str) -> Result<Option<Answer>, AnswerError> {
        let now = Utc::now();
        let mut answer = Answer::new("time", "time");
        answer.title = "Current UTC time".to_string();
        answer.content = now.to_rfc3339_opts(SecondsFormat::Secs, true);
        answer.source = "system clock".to_string();
        answer
            .data
            .insert("unix".to_string(), serde_json::json!(now.timestamp()));
        Ok(Some(answer))
    }
}

/// `uuid` — a fresh v4 identifier.
#[derive(Default)]
pub struct UuidHandler;

impl UuidHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl InstantHandler for UuidHandler {
    fn answer_type(&self) -> &'static str {
        "uuid"
    }

    fn patterns(&self) -> &[Regex] {
        &UUID_PATTERNS
    }

    fn cache_ttl(&self) -> u64 {
        0
    }

    async fn handle_term(&self, _term: &str) -> Result<Option<Answer>, AnswerError> {
        let id = uuid::Uuid::new_v4();
        let mut answer = Answer::new("uuid", "uuid");
        answer.title = "Random UUID (v4)".to_string();
        answer.content = id.to_string();
        answer.source = "uuid".to_string();
        Ok(Some(answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_answer_is_the_sha256_hex_digest() {
        let handler = HashHandler::new();
        let answer = handler.handle_term("abc").await.unwrap().unwrap();
        assert_eq!(
            answer.content,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(answer.data["algorithm"], serde_json::json!("sha256"));
    }

    #[tokio::test]
    async fn hash_of_nothing_is_no_answer() {
        let handler = HashHandler::new();
        assert!(handler.handle_term("   ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn time_answer_has_content() {
        let handler = TimeHandler::new();
        let answer = handler.handle_term("").await.unwrap().unwrap();
        assert!(!answer.content.is_empty());
        assert_eq!(handler.cache_ttl(), 0);
    }

    #[tokio::test]
    async fn resolve_localhost_yields_addresses() {
        let handler = ResolveHandler::new();
        let answer = handler.handle_term("localhost").await.unwrap().unwrap();
        assert!(answer.error.is_some() || !answer.content.is_empty());
    }

    #[test]
    fn patterns_match_expected_forms() {
        assert!(RESOLVE_PATTERNS[0].is_match("resolve example.com"));
        assert!(RESOLVE_PATTERNS[0].is_match("dns: example.com"));
        assert!(HASH_PATTERNS[0].is_match("sha256 hello world"));
        assert!(TIME_PATTERNS[0].is_match("now"));
        assert!(!RESOLVE_PATTERNS[0].is_match("resolver configuration"));
    }
}

//! Server-side autocomplete proxy.
//!
//! Fetches suggestions from the upstream on behalf of the client so no
//! client PII (cookies, user agent, originating IP) reaches the upstream.
//! Every failure degrades to an empty list; the typing UI never sees an
//! HTTP error.

use std::time::Duration;

use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://duckduckgo.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
const MAX_SUGGESTIONS: usize = 10;

pub struct AutocompleteClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl AutocompleteClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.timeout = timeout;
        }
        self
    }

    /// Up to ten suggestions for a partial query. Upstream shape is
    /// `["query", ["s1", "s2", ...]]`.
    pub async fn suggest(&self, query: &str) -> Vec<String> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let request = self
            .client
            .get(format!("{}/ac/", self.base_url))
            .query(&[("q", query), ("type", "list")])
            .timeout(self.timeout);

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "autocomplete upstream unreachable");
                return Vec::new();
            }
        };
        if !response.status().is_success() {
            debug!(status = %response.status(), "autocomplete upstream error");
            return Vec::new();
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(error = %e, "autocomplete body read failed");
                return Vec::new();
            }
        };

        match serde_json::from_str::<(String, Vec<String>)>(&body) {
            Ok((_echo, mut suggestions)) => {
                suggestions.truncate(MAX_SUGGESTIONS);
                suggestions
            }
            Err(e) => {
                debug!(error = %e, "autocomplete decode failed");
                Vec::new()
            }
        }
    }

    /// Related queries: the suggestion list minus the query itself.
    pub async fn related(&self, query: &str) -> Vec<String> {
        let query = query.trim();
        self.suggest(query)
            .await
            .into_iter()
            .filter(|s| !s.eq_ignore_ascii_case(query))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn suggestions_are_parsed_and_capped() {
        let server = MockServer::start().await;
        let many: Vec<String> = (0..15).map(|i| format!("rust {i}")).collect();
        Mock::given(method("GET"))
            .and(path("/ac/"))
            .and(query_param("q", "rust"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!(["rust", many])),
            )
            .mount(&server)
            .await;

        let client = AutocompleteClient::new(reqwest::Client::new()).with_base_url(server.uri());
        let suggestions = client.suggest("rust").await;
        assert_eq!(suggestions.len(), 10);
        assert_eq!(suggestions[0], "rust 0");
    }

    #[tokio::test]
    async fn upstream_errors_degrade_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ac/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = AutocompleteClient::new(reqwest::Client::new()).with_base_url(server.uri());
        assert!(client.suggest("rust").await.is_empty());
    }

    #[tokio::test]
    async fn malformed_payload_degrades_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ac/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = AutocompleteClient::new(reqwest::Client::new()).with_base_url(server.uri());
        assert!(client.suggest("rust").await.is_empty());
    }

    #[tokio::test]
    async fn empty_query_short_circuits() {
        let client = AutocompleteClient::new(reqwest::Client::new())
            .with_base_url("http://127.0.0.1:1".to_string());
        assert!(client.suggest("   ").await.is_empty());
    }

    #[tokio::test]
    async fn related_drops_the_query_itself() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ac/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                "rust",
                ["rust", "rust async", "rust tokio"]
            ])))
            .mount(&server)
            .await;

        let client = AutocompleteClient::new(reqwest::Client::new()).with_base_url(server.uri());
        let related = client.related("rust").await;
        assert_eq!(related, vec!["rust async", "rust tokio"]);
    }
}

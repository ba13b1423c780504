use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub public_url: String,
    pub instance_name: String,
    pub max_search_timeout_secs: u64,
    pub autocomplete_timeout_ms: u64,
    pub maintenance_mode: bool,
    pub disabled_engines: Vec<String>,
    pub allowed_origins: Vec<String>,
}

fn env_list(key: &str) -> Vec<String> {
    env::var(key)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_flag(key: &str) -> bool {
    matches!(
        env::var(key).unwrap_or_default().trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("PORT must be a valid number")?;

        Ok(Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            public_url: env::var("PUBLIC_URL")
                .unwrap_or_else(|_| format!("http://localhost:{port}")),
            instance_name: env::var("INSTANCE_NAME")
                .unwrap_or_else(|_| "Periscope".to_string()),
            max_search_timeout_secs: env::var("MAX_SEARCH_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("MAX_SEARCH_TIMEOUT_SECS must be a valid number")?,
            autocomplete_timeout_ms: env::var("AUTOCOMPLETE_TIMEOUT_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()
                .context("AUTOCOMPLETE_TIMEOUT_MS must be a valid number")?,
            maintenance_mode: env_flag("MAINTENANCE_MODE"),
            disabled_engines: env_list("DISABLED_ENGINES"),
            allowed_origins: env_list("ALLOWED_ORIGINS"),
        })
    }

    /// Defaults without touching the environment; used by tests.
    pub fn for_tests() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 0,
            public_url: "http://localhost:8080".to_string(),
            instance_name: "Periscope".to_string(),
            max_search_timeout_secs: 30,
            autocomplete_timeout_ms: 2000,
            maintenance_mode: false,
            disabled_engines: Vec::new(),
            allowed_origins: Vec::new(),
        }
    }
}

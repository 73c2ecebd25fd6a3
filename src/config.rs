//! Configuration module for StatusWatch.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::time::Duration;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port for the web server (default: 8080)
    pub http_port: u16,
    /// Path to the SQLite database file (default: "statuswatch.db")
    pub db_path: String,
    /// Base URL of a remote datastore. When unset the local store is polled.
    pub api_url: Option<String>,
    /// Bearer token for the datastore API.
    pub api_token: Option<String>,
    /// Seconds between refresh cycles (default: 60)
    pub refresh_secs: u64,
    /// Upper bound in seconds on a single datastore call (default: 10)
    pub fetch_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            db_path: "statuswatch.db".to_string(),
            api_url: None,
            api_token: None,
            refresh_secs: 60,
            fetch_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `STATUSWATCH_HTTP_PORT`: HTTP port (default: 8080)
    /// - `STATUSWATCH_DB_PATH`: Database file path (default: "statuswatch.db")
    /// - `STATUSWATCH_API_URL`: Remote datastore base URL (default: unset)
    /// - `STATUSWATCH_API_TOKEN`: Bearer token (default: unset)
    /// - `STATUSWATCH_REFRESH_SECS`: Polling interval (default: 60)
    /// - `STATUSWATCH_FETCH_TIMEOUT_SECS`: Datastore call timeout (default: 10)
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(port) = lookup("STATUSWATCH_HTTP_PORT").and_then(|s| s.parse().ok()) {
            cfg.http_port = port;
        }

        if let Some(db_path) = lookup("STATUSWATCH_DB_PATH") {
            cfg.db_path = db_path;
        }

        cfg.api_url = lookup("STATUSWATCH_API_URL").filter(|s| !s.trim().is_empty());
        cfg.api_token = lookup("STATUSWATCH_API_TOKEN").filter(|s| !s.trim().is_empty());

        if let Some(secs) = parse_positive(lookup("STATUSWATCH_REFRESH_SECS")) {
            cfg.refresh_secs = secs;
        }

        if let Some(secs) = parse_positive(lookup("STATUSWATCH_FETCH_TIMEOUT_SECS")) {
            cfg.fetch_timeout_secs = secs;
        }

        cfg
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn parse_positive(value: Option<String>) -> Option<u64> {
    value.and_then(|s| s.parse::<u64>().ok()).filter(|v| *v > 0)
}

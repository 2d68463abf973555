//! Configuration module for iotsentry.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Largest CSV file the upload form accepts (10 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Delay before a successful upload clears itself.
pub const UPLOAD_CLEAR_DELAY: Duration = Duration::from_millis(3000);

/// Dashboard configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// HTTP port for the dashboard (default: 3000)
    pub http_port: u16,
    /// Base URL of the scoring backend (default: "http://localhost:8000")
    pub backend_url: String,
    /// Alert polling interval (default: 5000 ms)
    pub poll_interval: Duration,
    /// Per-request timeout towards the backend (default: 30 s)
    pub request_timeout: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            http_port: 3000,
            backend_url: "http://localhost:8000".to_string(),
            poll_interval: Duration::from_millis(5000),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `IOTSENTRY_HTTP_PORT`: HTTP port (default: 3000)
    /// - `IOTSENTRY_BACKEND_URL`: backend base URL (default: "http://localhost:8000")
    /// - `IOTSENTRY_POLL_INTERVAL_MS`: polling interval in ms (default: 5000)
    /// - `IOTSENTRY_REQUEST_TIMEOUT_SECS`: backend request timeout (default: 30)
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(port) = parse_var::<u16>(&lookup, "IOTSENTRY_HTTP_PORT") {
            cfg.http_port = port;
        }

        if let Some(url) = lookup("IOTSENTRY_BACKEND_URL") {
            let url = url.trim().trim_end_matches('/');
            if !url.is_empty() {
                cfg.backend_url = url.to_string();
            }
        }

        if let Some(ms) = parse_var::<u64>(&lookup, "IOTSENTRY_POLL_INTERVAL_MS") {
            if ms > 0 {
                cfg.poll_interval = Duration::from_millis(ms);
            } else {
                tracing::warn!("IOTSENTRY_POLL_INTERVAL_MS must be positive, keeping default");
            }
        }

        if let Some(secs) = parse_var::<u64>(&lookup, "IOTSENTRY_REQUEST_TIMEOUT_SECS") {
            if secs > 0 {
                cfg.request_timeout = Duration::from_secs(secs);
            }
        }

        cfg
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring invalid {}={:?}", key, raw);
            None
        }
    }
}

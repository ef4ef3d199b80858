//! Client-side sync configuration.

use crate::storage::{DEFAULT_AUTOSAVE_DELAY_MS, DEFAULT_RECENT_LIMIT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default progress API endpoint.
pub const DEFAULT_API_URL: &str = "http://localhost:3040";

/// Settings for the persistence and sync client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncConfig {
    /// Base URL of the progress API.
    pub api_url: String,
    /// Quiet period before an autosave, in milliseconds.
    pub autosave_delay_ms: u64,
    /// Cap on the recently-saved index.
    pub recent_limit: usize,
    /// Per-request timeout, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            autosave_delay_ms: DEFAULT_AUTOSAVE_DELAY_MS,
            recent_limit: DEFAULT_RECENT_LIMIT,
            request_timeout_secs: 10,
        }
    }
}

impl SyncConfig {
    /// Defaults overridden by `TINTBOOK_API_URL`, `TINTBOOK_AUTOSAVE_MS`,
    /// `TINTBOOK_RECENT_LIMIT` and `TINTBOOK_HTTP_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup("TINTBOOK_API_URL") {
            config.api_url = url;
        }
        if let Some(ms) = parse_var(&lookup, "TINTBOOK_AUTOSAVE_MS") {
            config.autosave_delay_ms = ms;
        }
        if let Some(limit) = parse_var(&lookup, "TINTBOOK_RECENT_LIMIT") {
            config.recent_limit = limit;
        }
        if let Some(secs) = parse_var(&lookup, "TINTBOOK_HTTP_TIMEOUT_SECS") {
            config.request_timeout_secs = secs;
        }
        config
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring invalid {}={:?}", name, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.autosave_delay(), Duration::from_secs(1));
        assert_eq!(config.recent_limit, 20);
    }

    #[test]
    fn test_overrides() {
        let config = SyncConfig::from_lookup(|name| match name {
            "TINTBOOK_API_URL" => Some("https://paint.example".to_string()),
            "TINTBOOK_AUTOSAVE_MS" => Some("250".to_string()),
            "TINTBOOK_RECENT_LIMIT" => Some("many".to_string()),
            _ => None,
        });

        assert_eq!(config.api_url, "https://paint.example");
        assert_eq!(config.autosave_delay_ms, 250);
        assert_eq!(config.recent_limit, DEFAULT_RECENT_LIMIT);
    }

    #[test]
    fn test_partial_json() {
        let config: SyncConfig = serde_json::from_str(r#"{"apiUrl": "http://10.0.0.2:3040"}"#).unwrap();
        assert_eq!(config.api_url, "http://10.0.0.2:3040");
        assert_eq!(config.request_timeout_secs, 10);
    }
}

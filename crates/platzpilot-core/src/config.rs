//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: the
//! server base URL and the tunables for timeouts, retries, cache freshness
//! and auto-refresh.
//!
//! Configuration is stored at `~/.config/platzpilot/config.json`; the
//! `PLATZPILOT_API_URL` environment variable overrides the base URL.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "platzpilot";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the server base URL
const ENV_BASE_URL: &str = "PLATZPILOT_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server base URL, without a trailing slash.
    pub base_url: String,
    /// Dataset fetch timeout.
    pub request_timeout_secs: u64,
    /// Health check timeout. Shorter than the dataset timeout.
    pub health_timeout_secs: u64,
    /// Total attempts for a dataset fetch, including the first.
    pub retry_attempts: u32,
    /// Base delay between retries; attempt `n` waits `n * base`.
    pub retry_base_delay_ms: u64,
    /// How long a fetched snapshot counts as fresh.
    pub cache_duration_secs: u64,
    /// Period of the background refresh task.
    pub auto_refresh_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout_secs: 10,
            health_timeout_secs: 5,
            retry_attempts: 3,
            retry_base_delay_ms: 1000,
            cache_duration_secs: 5 * 60,
            auto_refresh_interval_secs: 2 * 60,
        }
    }
}

impl Config {
    /// Load the config file if present, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env_base_url(std::env::var(ENV_BASE_URL).ok());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the durable key-value store.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Set the server base URL, stripping any trailing slash.
    pub fn set_base_url(&mut self, url: &str) {
        self.base_url = url.trim_end_matches('/').to_string();
    }

    fn apply_env_base_url(&mut self, value: Option<String>) {
        if let Some(url) = value {
            if !url.is_empty() {
                self.set_base_url(&url);
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn cache_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_duration_secs as i64)
    }

    pub fn auto_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.auto_refresh_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.health_timeout(), Duration::from_secs(5));
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_base_delay(), Duration::from_secs(1));
        assert_eq!(config.cache_duration(), chrono::Duration::minutes(5));
        assert_eq!(config.auto_refresh_interval(), Duration::from_secs(120));
    }

    #[test]
    fn test_env_override_wins_and_strips_trailing_slash() {
        let mut config = Config::default();
        config.apply_env_base_url(Some("https://seats.example.edu/".to_string()));
        assert_eq!(config.base_url, "https://seats.example.edu");

        // Empty and absent values leave the configured URL alone
        config.apply_env_base_url(Some(String::new()));
        assert_eq!(config.base_url, "https://seats.example.edu");
        config.apply_env_base_url(None);
        assert_eq!(config.base_url, "https://seats.example.edu");
    }

    #[test]
    fn test_partial_config_file_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"base_url": "http://10.0.0.5:8080"}"#).unwrap();
        assert_eq!(config.base_url, "http://10.0.0.5:8080");
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.cache_duration_secs, 300);
    }
}

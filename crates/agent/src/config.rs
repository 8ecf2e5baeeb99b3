//! Agent configuration

use alert_lib::fetcher::{FetcherConfig, DEFAULT_ALERTS_URL, DEFAULT_HISTORY_URL};
use alert_lib::WatcherSettings;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Name attached to structured log events
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// API server port for health/metrics/manual checks
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Active alerts endpoint
    #[serde(default = "default_alerts_url")]
    pub alerts_url: String,

    /// Alert history endpoint
    #[serde(default = "default_history_url")]
    pub history_url: String,

    /// Timeout for the active alerts request in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Timeout for the history request in seconds
    #[serde(default = "default_history_timeout")]
    pub history_timeout_secs: u64,

    /// Optional webhook every event is POSTed to
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Capacity of the channel between watcher and forwarder
    #[serde(default = "default_event_buffer")]
    pub event_buffer_size: usize,

    /// Watcher behaviour
    #[serde(default)]
    pub watcher: WatcherSettings,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "red-alert-agent".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_alerts_url() -> String {
    DEFAULT_ALERTS_URL.to_string()
}

fn default_history_url() -> String {
    DEFAULT_HISTORY_URL.to_string()
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_history_timeout() -> u64 {
    15
}

fn default_event_buffer() -> usize {
    256
}

impl AgentConfig {
    /// Load configuration from an optional file and `REDALERT_*` variables.
    ///
    /// The file path comes from `REDALERT_CONFIG`. Nested watcher settings
    /// use a double underscore, e.g. `REDALERT_WATCHER__TRIGGER_MODE`.
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Ok(path) = std::env::var("REDALERT_CONFIG") {
            builder = builder.add_source(config::File::with_name(&path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("REDALERT")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("watcher.area_filter")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid agent configuration")
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            alerts_url: self.alerts_url.clone(),
            history_url: self.history_url.clone(),
            current_timeout: Duration::from_secs(self.fetch_timeout_secs),
            history_timeout: Duration::from_secs(self.history_timeout_secs),
            ..FetcherConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_source() {
        let config: AgentConfig = config::Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.api_port, 8080);
        assert_eq!(config.alerts_url, DEFAULT_ALERTS_URL);
        assert!(config.webhook_url.is_none());
        assert_eq!(config.watcher.check_interval_secs, 10);
        assert!(config.watcher.trigger_on_clear);
    }

    #[test]
    fn test_fetcher_config_timeouts() {
        let config: AgentConfig = config::Config::builder()
            .set_override("fetch_timeout_secs", 7)
            .unwrap()
            .set_override("history_timeout_secs", 3)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        let fetcher = config.fetcher_config();
        assert_eq!(fetcher.current_timeout, Duration::from_secs(7));
        assert_eq!(fetcher.history_timeout, Duration::from_secs(3));
    }
}

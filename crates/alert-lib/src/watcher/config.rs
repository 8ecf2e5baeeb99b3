//! Watcher configuration surface

use crate::error::ConfigError;
use crate::filter::{parse_location_list, FilterConfig};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

pub const MIN_INTERVAL_SECS: u64 = 5;
pub const MAX_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_INTERVAL_SECS: u64 = 10;

/// How the watcher decides to emit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    /// Emit when a new alert id shows up
    #[default]
    #[serde(alias = "newAlerts")]
    NewAlerts,
    /// Emit on every tick while alerts are active
    #[serde(rename = "all_alerts", alias = "allAlerts", alias = "all_active")]
    AllActive,
    /// Emit whenever the id or location count changes
    #[serde(alias = "statusChange")]
    StatusChange,
}

impl TriggerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerMode::NewAlerts => "new_alerts",
            TriggerMode::AllActive => "all_alerts",
            TriggerMode::StatusChange => "status_change",
        }
    }
}

impl std::fmt::Display for TriggerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "new_alerts" | "newAlerts" | "new-alerts" => Ok(TriggerMode::NewAlerts),
            "all_alerts" | "allAlerts" | "all-alerts" | "all_active" => Ok(TriggerMode::AllActive),
            "status_change" | "statusChange" | "status-change" => Ok(TriggerMode::StatusChange),
            other => Err(ConfigError::UnknownTriggerMode(other.to_string())),
        }
    }
}

/// Raw settings as provided by the host, read once at construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherSettings {
    #[serde(default)]
    pub trigger_mode: TriggerMode,

    /// Polling interval in seconds, clamped to 5..=300
    #[serde(default = "default_interval_secs")]
    pub check_interval_secs: u64,

    #[serde(default)]
    pub filter_by_location: bool,

    /// Comma-separated location substrings
    #[serde(default)]
    pub location_filter: String,

    #[serde(default)]
    pub filter_by_area: bool,

    #[serde(default)]
    pub area_filter: Vec<String>,

    #[serde(default)]
    pub include_history: bool,

    #[serde(default = "default_true")]
    pub trigger_on_clear: bool,

    #[serde(default = "default_true")]
    pub enhanced_location_data: bool,
}

fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}

fn default_true() -> bool {
    true
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            trigger_mode: TriggerMode::default(),
            check_interval_secs: default_interval_secs(),
            filter_by_location: false,
            location_filter: String::new(),
            filter_by_area: false,
            area_filter: Vec::new(),
            include_history: false,
            trigger_on_clear: true,
            enhanced_location_data: true,
        }
    }
}

impl WatcherSettings {
    /// Resolve into the immutable watcher configuration
    pub fn into_config(self) -> WatcherConfig {
        let location_substrings = if self.filter_by_location {
            parse_location_list(&self.location_filter)
        } else {
            Vec::new()
        };

        let area_tags = self
            .area_filter
            .iter()
            .map(|area| area.trim())
            .filter(|area| !area.is_empty())
            .map(str::to_string)
            .collect();

        WatcherConfig {
            mode: self.trigger_mode,
            interval: clamp_interval(self.check_interval_secs),
            filter: FilterConfig {
                filter_by_location: self.filter_by_location,
                location_substrings,
                filter_by_area: self.filter_by_area,
                area_tags,
                trigger_on_clear: self.trigger_on_clear,
                include_history: self.include_history,
                enhanced_location_data: self.enhanced_location_data,
            },
        }
    }
}

/// Clamp a requested interval to the supported range
pub fn clamp_interval(secs: u64) -> Duration {
    Duration::from_secs(secs.clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS))
}

/// Immutable watcher configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    pub mode: TriggerMode,
    pub interval: Duration,
    pub filter: FilterConfig,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        WatcherSettings::default().into_config()
    }
}

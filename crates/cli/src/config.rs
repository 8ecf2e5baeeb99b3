//! Configuration management for the CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI configuration, read from `~/.config/redalert/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Agent API URL
    pub agent_url: Option<String>,
    /// Default output format (`table` or `json`)
    pub default_format: Option<String>,
    /// Comma-separated location substrings used by `watch` when no flag is given
    pub location_filter: Option<String>,
    /// Area tags used by `watch` when no flag is given
    #[serde(default)]
    pub area_filter: Vec<String>,
}

impl Config {
    /// Load configuration from the default path, or defaults when absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).context("Failed to read config file")?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Get the configuration file path
    fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("redalert").join("config.json"))
    }
}

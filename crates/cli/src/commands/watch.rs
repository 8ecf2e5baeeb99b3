//! Foreground watcher

use alert_lib::{
    fetcher::OrefFetcher, observability::StructuredLogger, AlertWatcherBuilder, TriggerMode,
    WatcherSettings,
};
use anyhow::{Context, Result};
use clap::Args;
use std::sync::Arc;

use crate::config::Config;
use crate::output::{print_info, OutputFormat};
use crate::sink::TerminalSink;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Flags accepted by `redalert watch`
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// When to emit: new_alerts, all_alerts or status_change
    #[arg(long, short, default_value = "new_alerts")]
    pub mode: TriggerMode,

    /// Polling interval in seconds (clamped to 5..=300)
    #[arg(long, short, default_value_t = 10)]
    pub interval: u64,

    /// Comma-separated location substrings to watch
    #[arg(long, short)]
    pub location: Option<String>,

    /// Area tags to watch (repeatable or comma-separated)
    #[arg(long, short, value_delimiter = ',')]
    pub area: Vec<String>,

    /// Attach the most recent history entries to each alert event
    #[arg(long)]
    pub include_history: bool,

    /// Do not emit an event when alerts clear
    #[arg(long)]
    pub no_clear: bool,

    /// Omit per-location details
    #[arg(long)]
    pub no_enhanced: bool,
}

impl WatchArgs {
    /// Combine flags with the config file; flags win
    pub fn into_settings(self, config: &Config) -> WatcherSettings {
        let location_filter = self
            .location
            .or_else(|| config.location_filter.clone())
            .unwrap_or_default();
        let area_filter = if self.area.is_empty() {
            config.area_filter.clone()
        } else {
            self.area
        };

        WatcherSettings {
            trigger_mode: self.mode,
            check_interval_secs: self.interval,
            filter_by_location: !location_filter.trim().is_empty(),
            location_filter,
            filter_by_area: !area_filter.is_empty(),
            area_filter,
            include_history: self.include_history,
            trigger_on_clear: !self.no_clear,
            enhanced_location_data: !self.no_enhanced,
        }
    }
}

/// Run the watcher until Ctrl-C
pub async fn run_watch(
    fetcher: OrefFetcher,
    settings: WatcherSettings,
    format: OutputFormat,
) -> Result<()> {
    let watcher_config = settings.into_config();
    let logger = StructuredLogger::new("redalert-cli");
    logger.log_startup(
        VERSION,
        watcher_config.mode.as_str(),
        watcher_config.interval.as_secs(),
    );

    let watcher = AlertWatcherBuilder::new()
        .fetcher(Arc::new(fetcher))
        .sink(Arc::new(TerminalSink::new(format)))
        .config(watcher_config)
        .build()?;

    if format == OutputFormat::Table {
        print_info("Watching for alerts, press Ctrl-C to stop");
    }
    watcher.start().await?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    watcher.stop();
    logger.log_shutdown("SIGINT received");
    Ok(())
}

//! One-shot manual check against the feed

use alert_lib::{fetcher::OrefFetcher, AlertWatcherBuilder};
use anyhow::Result;
use std::sync::Arc;

use crate::output::OutputFormat;
use crate::sink::TerminalSink;

/// Fetch the current batch once and print it as a `manual_trigger` event
pub async fn run_check(fetcher: OrefFetcher, format: OutputFormat) -> Result<()> {
    let watcher = AlertWatcherBuilder::new()
        .fetcher(Arc::new(fetcher))
        .sink(Arc::new(TerminalSink::new(format)))
        .build()?;

    watcher.manual_check().await?;
    Ok(())
}

//! Recent alert history

use alert_lib::fetcher::{OrefFetcher, SnapshotFetcher};
use anyhow::{Context, Result};

use crate::output::{print_history, OutputFormat};

/// Print up to `limit` of the most recent history entries
pub async fn show_history(fetcher: &OrefFetcher, limit: usize, format: OutputFormat) -> Result<()> {
    let mut records = fetcher
        .fetch_history()
        .await
        .context("Failed to fetch alert history")?;
    records.truncate(limit);

    print_history(&records, format);
    Ok(())
}

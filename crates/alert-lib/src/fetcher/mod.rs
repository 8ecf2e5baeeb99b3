//! Fetching alert snapshots from the feed
//!
//! The watcher only depends on the [`SnapshotFetcher`] trait; [`OrefFetcher`]
//! is the HTTP implementation against the Home Front Command endpoints.

mod http;


pub use http::{FetcherConfig, OrefFetcher, DEFAULT_ALERTS_URL, DEFAULT_HISTORY_URL};

use crate::error::FetchError;
use crate::models::{HistoryRecord, Snapshot};

pub use async_trait::async_trait;

/// Source of alert snapshots
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    /// Fetch the active alert batch, `None` when nothing is active
    async fn fetch_current(&self) -> Result<Option<Snapshot>, FetchError>;

    /// Fetch the most recent history entries
    async fn fetch_history(&self) -> Result<Vec<HistoryRecord>, FetchError>;
}

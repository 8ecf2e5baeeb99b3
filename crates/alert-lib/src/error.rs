//! Error types for fetching and watching

use thiserror::Error;

/// Failure while fetching from the alert feed
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response body: {0}")]
    Decode(String),
}

/// Errors surfaced by the watcher lifecycle hooks
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("manual check failed: {0}")]
    ManualCheck(#[source] FetchError),

    #[error("watcher is already running")]
    AlreadyRunning,

    #[error("watcher has been stopped")]
    Stopped,
}

/// Invalid configuration values
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown trigger mode '{0}' (expected new_alerts, all_alerts or status_change)")]
    UnknownTriggerMode(String),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

//! Alert watcher library
//!
//! This crate provides the core functionality for:
//! - Fetching the active alert batch and recent history from the feed
//! - Deciding on each tick whether to emit (new alert, status change, all-clear)
//! - Location and area filtering
//! - Event sinks for the downstream consumer
//! - Health checks and observability

pub mod error;
pub mod fetcher;
pub mod filter;
pub mod health;
pub mod models;
pub mod observability;
pub mod sink;
pub mod watcher;

pub use error::{ConfigError, FetchError, WatcherError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{StructuredLogger, WatcherMetrics};
pub use sink::{ChannelSink, Sink};
pub use watcher::{AlertWatcher, AlertWatcherBuilder, TriggerMode, WatcherConfig, WatcherSettings};

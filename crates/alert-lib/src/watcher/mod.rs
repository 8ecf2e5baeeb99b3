//! Alert watcher
//!
//! Polls the feed on a fixed period, decides whether each tick warrants an
//! event and hands events to a [`Sink`]. The polling task owns the
//! [`TrackedState`]; cycles run one at a time inside that task, so a slow
//! fetch delays the next tick instead of overlapping with it.

mod config;
mod cycle;
mod decision;

#[cfg(test)]
mod tests;

pub use config::{
    clamp_interval, TriggerMode, WatcherConfig, WatcherSettings, DEFAULT_INTERVAL_SECS,
    MAX_INTERVAL_SECS, MIN_INTERVAL_SECS,
};
pub use cycle::{Cycle, HISTORY_ERROR_MESSAGE, HISTORY_LIMIT};
pub use decision::{decide, TrackedState};

use crate::error::WatcherError;
use crate::fetcher::SnapshotFetcher;
use crate::filter::{AreaResolver, SnapshotFilter, StaticAreaTable};
use crate::health::{components, HealthRegistry};
use crate::models::EmittedEvent;
use crate::sink::Sink;
use anyhow::Result;
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{info, Level};

/// Externally visible lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    Running,
    Stopped,
}

enum Lifecycle {
    Idle,
    Running {
        shutdown_tx: broadcast::Sender<()>,
        handle: Option<JoinHandle<()>>,
    },
    Stopped,
}

/// Stateful poller exposing `start`, `stop` and `manual_check` to the host
pub struct AlertWatcher {
    cycle: Cycle,
    lifecycle: Mutex<Lifecycle>,
}

impl AlertWatcher {
    pub fn new(cycle: Cycle) -> Self {
        Self {
            cycle,
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    pub fn config(&self) -> &WatcherConfig {
        self.cycle.config()
    }

    pub fn state(&self) -> WatcherState {
        match *self.lock() {
            Lifecycle::Idle => WatcherState::Idle,
            Lifecycle::Running { .. } => WatcherState::Running,
            Lifecycle::Stopped => WatcherState::Stopped,
        }
    }

    /// Run one cycle immediately, then keep polling every interval.
    ///
    /// Only valid from `Idle`.
    pub async fn start(&self) -> Result<(), WatcherError> {
        let shutdown_rx = {
            let mut lifecycle = self.lock();
            match *lifecycle {
                Lifecycle::Idle => {}
                Lifecycle::Running { .. } => return Err(WatcherError::AlreadyRunning),
                Lifecycle::Stopped => return Err(WatcherError::Stopped),
            }
            let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
            *lifecycle = Lifecycle::Running {
                shutdown_tx,
                handle: None,
            };
            shutdown_rx
        };

        let config = self.cycle.config();
        info!(
            trigger_mode = %config.mode,
            interval_secs = config.interval.as_secs(),
            "Starting alert monitoring"
        );
        self.cycle.sink().log(
            Level::INFO,
            "Starting monitoring for alerts",
            json!({
                "trigger_mode": config.mode.as_str(),
                "interval_secs": config.interval.as_secs(),
            }),
        );

        let state = self.cycle.run(TrackedState::default()).await;

        let mut lifecycle = self.lock();
        if let Lifecycle::Running { handle, .. } = &mut *lifecycle {
            let task = tokio::spawn(poll_loop(
                self.cycle.clone(),
                state,
                config.interval,
                shutdown_rx,
            ));
            *handle = Some(task);
        }

        Ok(())
    }

    /// Cancel the schedule. Idempotent and valid before `start`.
    ///
    /// A cycle already in flight finishes and may still emit.
    pub fn stop(&self) {
        let previous = std::mem::replace(&mut *self.lock(), Lifecycle::Stopped);
        if let Lifecycle::Running { shutdown_tx, .. } = previous {
            let _ = shutdown_tx.send(());
            self.cycle
                .sink()
                .log(Level::INFO, "Stopped monitoring", json!({}));
        }
    }

    /// Fetch once and emit a `manual_trigger` event.
    ///
    /// Independent of the periodic schedule and its tracking state. Fetch
    /// failures are returned rather than emitted.
    pub async fn manual_check(&self) -> Result<EmittedEvent, WatcherError> {
        if self.state() == WatcherState::Stopped {
            return Err(WatcherError::Stopped);
        }

        self.cycle
            .sink()
            .log(Level::INFO, "Manual trigger executed", json!({}));
        self.cycle.manual().await.map_err(WatcherError::ManualCheck)
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        // The guarded data stays consistent even if a holder panicked
        self.lifecycle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for AlertWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop(
    cycle: Cycle,
    mut state: TrackedState,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.recv() => break,
            _ = ticker.tick() => {
                state = cycle.run(state).await;
            }
        }

        // No new cycle once stop() has been called, even if a tick is ready
        if !matches!(shutdown.try_recv(), Err(TryRecvError::Empty)) {
            break;
        }
    }

    info!("Shutting down alert polling loop");
}

/// Builder for assembling a watcher
pub struct AlertWatcherBuilder {
    fetcher: Option<Arc<dyn SnapshotFetcher>>,
    sink: Option<Arc<dyn Sink>>,
    config: WatcherConfig,
    area_resolver: Arc<dyn AreaResolver>,
    health: Option<HealthRegistry>,
}

impl AlertWatcherBuilder {
    pub fn new() -> Self {
        Self {
            fetcher: None,
            sink: None,
            config: WatcherConfig::default(),
            area_resolver: Arc::new(StaticAreaTable),
            health: None,
        }
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn SnapshotFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(mut self, config: WatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the static area table with another lookup
    pub fn area_resolver(mut self, resolver: Arc<dyn AreaResolver>) -> Self {
        self.area_resolver = resolver;
        self
    }

    /// Report fetch outcomes into a health registry
    pub fn health(mut self, registry: HealthRegistry) -> Self {
        self.health = Some(registry);
        self
    }

    pub fn build(self) -> Result<AlertWatcher> {
        let fetcher = self
            .fetcher
            .ok_or_else(|| anyhow::anyhow!("Fetcher is required"))?;
        let sink = self.sink.ok_or_else(|| anyhow::anyhow!("Sink is required"))?;

        let filter = SnapshotFilter::with_resolver(self.config.filter.clone(), self.area_resolver);
        let cycle = Cycle::new(fetcher, sink, Arc::new(self.config), filter, self.health);

        Ok(AlertWatcher::new(cycle))
    }
}

impl Default for AlertWatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Register the components a running watcher reports on
pub async fn register_health(registry: &HealthRegistry) {
    registry.register(components::FETCHER).await;
    registry.register(components::WATCHER).await;
}

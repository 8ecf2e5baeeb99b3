//! One decide → filter → emit cycle

use super::config::WatcherConfig;
use super::decision::{decide, TrackedState};
use crate::error::FetchError;
use crate::fetcher::SnapshotFetcher;
use crate::filter::SnapshotFilter;
use crate::health::{components, HealthRegistry};
use crate::models::{EmittedEvent, EventType, LocationDetail, Snapshot};
use crate::observability::WatcherMetrics;
use crate::sink::Sink;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, Level};

/// Number of history records attached to an event
pub const HISTORY_LIMIT: usize = 5;

/// Diagnostic attached when the history fetch fails
pub const HISTORY_ERROR_MESSAGE: &str = "Failed to fetch recent history";

/// Everything a cycle needs. Holds no tracking state of its own; callers
/// pass the previous [`TrackedState`] in and keep the returned one.
#[derive(Clone)]
pub struct Cycle {
    fetcher: Arc<dyn SnapshotFetcher>,
    sink: Arc<dyn Sink>,
    config: Arc<WatcherConfig>,
    filter: SnapshotFilter,
    metrics: WatcherMetrics,
    health: Option<HealthRegistry>,
}

impl Cycle {
    pub fn new(
        fetcher: Arc<dyn SnapshotFetcher>,
        sink: Arc<dyn Sink>,
        config: Arc<WatcherConfig>,
        filter: SnapshotFilter,
        health: Option<HealthRegistry>,
    ) -> Self {
        Self {
            fetcher,
            sink,
            config,
            filter,
            metrics: WatcherMetrics::new(),
            health,
        }
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    pub(crate) fn sink(&self) -> &Arc<dyn Sink> {
        &self.sink
    }

    /// Run one periodic cycle and return the state for the next one.
    ///
    /// A failed snapshot fetch emits a single `error` event and hands back
    /// `state` untouched. Nothing escapes this function.
    pub async fn run(&self, state: TrackedState) -> TrackedState {
        self.metrics.inc_cycles();

        let started = Instant::now();
        let fetched = self.fetcher.fetch_current().await;
        self.metrics
            .observe_fetch_latency(started.elapsed().as_secs_f64());

        let current = match fetched {
            Ok(current) => {
                if let Some(health) = &self.health {
                    health.record_success(components::FETCHER).await;
                }
                current
            }
            Err(e) => {
                self.report_fetch_failure(&e).await;
                return state;
            }
        };

        let current_count = current.as_ref().map(Snapshot::location_count).unwrap_or(0);
        self.metrics.set_active_locations(current_count as i64);

        if let Some(event) = self.evaluate(&state, current.as_ref()).await {
            self.sink.log(
                Level::INFO,
                &format!("Triggered due to {}", event.event_type),
                json!({
                    "alert_id": current.as_ref().map(|s| s.id.as_str()),
                    "alert_count": current_count,
                }),
            );
            self.emit(event).await;
        }

        TrackedState::observe(current.as_ref())
    }

    /// Fetch once and emit a `manual_trigger` event regardless of history.
    ///
    /// Neither reads nor produces tracking state. Fetch failures are
    /// returned to the caller instead of being emitted.
    pub async fn manual(&self) -> Result<EmittedEvent, FetchError> {
        let current = self.fetcher.fetch_current().await.map_err(|e| {
            self.metrics.inc_fetch_errors();
            e
        })?;

        let event = match &current {
            Some(snapshot) => EmittedEvent::with_alert(EventType::ManualTrigger, snapshot),
            None => EmittedEvent::without_alert(EventType::ManualTrigger, 0),
        };

        self.emit(event.clone()).await;
        Ok(event)
    }

    /// Build the event for this tick, or `None` when nothing should be sent
    async fn evaluate(
        &self,
        state: &TrackedState,
        current: Option<&Snapshot>,
    ) -> Option<EmittedEvent> {
        let filter = &self.config.filter;
        let reason = decide(self.config.mode, filter.trigger_on_clear, state, current)?;

        let mut event = match current {
            Some(snapshot) => {
                let Some(filtered) = self.filter.apply(snapshot) else {
                    debug!(alert_id = %snapshot.id, "Trigger cancelled by filters");
                    self.metrics.inc_filtered_out();
                    return None;
                };

                let mut event = EmittedEvent::with_alert(reason, &filtered);
                if filter.enhanced_location_data {
                    if let Some(alert) = event.alert.as_mut() {
                        alert.locations_detailed = Some(
                            filtered
                                .locations
                                .iter()
                                .map(|location| LocationDetail::placeholder(location))
                                .collect(),
                        );
                    }
                }
                event
            }
            None => EmittedEvent::without_alert(reason, state.last_location_count),
        };

        if filter.include_history {
            self.attach_history(&mut event).await;
        }

        Some(event)
    }

    async fn attach_history(&self, event: &mut EmittedEvent) {
        match self.fetcher.fetch_history().await {
            Ok(mut records) => {
                records.truncate(HISTORY_LIMIT);
                event.recent_history = Some(records);
            }
            Err(e) => {
                self.metrics.inc_history_errors();
                self.sink.log(
                    Level::WARN,
                    "Failed to fetch alert history",
                    json!({ "error": e.to_string() }),
                );
                event.history_error = Some(HISTORY_ERROR_MESSAGE.to_string());
            }
        }
    }

    async fn report_fetch_failure(&self, error: &FetchError) {
        self.metrics.inc_fetch_errors();
        if let Some(health) = &self.health {
            health
                .record_failure(components::FETCHER, error.to_string())
                .await;
        }

        self.sink.log(
            Level::ERROR,
            "Error checking for alerts",
            json!({ "error": error.to_string() }),
        );
        self.emit(EmittedEvent::api_error(error.to_string())).await;
    }

    async fn emit(&self, event: EmittedEvent) {
        self.metrics.inc_events_emitted(event.event_type.as_str());
        self.sink.emit(vec![event]).await;
    }
}

//! Observability infrastructure for the alert watcher
//!
//! Provides:
//! - Prometheus metrics (cycle counts, fetch latency, emitted events by type)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for feed fetch latency (in seconds)
const FETCH_LATENCY_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<WatcherMetricsInner> = OnceLock::new();

struct WatcherMetricsInner {
    cycles_total: IntCounter,
    fetch_errors_total: IntCounter,
    history_errors_total: IntCounter,
    events_emitted_total: IntCounterVec,
    filtered_out_total: IntCounter,
    fetch_latency_seconds: Histogram,
    active_locations: IntGauge,
}

impl WatcherMetricsInner {
    fn new() -> Self {
        Self {
            cycles_total: register_int_counter!(
                "red_alert_watcher_cycles_total",
                "Number of periodic watcher cycles run"
            )
            .expect("Failed to register cycles_total"),

            fetch_errors_total: register_int_counter!(
                "red_alert_watcher_fetch_errors_total",
                "Number of failed alert feed fetches"
            )
            .expect("Failed to register fetch_errors_total"),

            history_errors_total: register_int_counter!(
                "red_alert_watcher_history_errors_total",
                "Number of failed alert history fetches"
            )
            .expect("Failed to register history_errors_total"),

            events_emitted_total: register_int_counter_vec!(
                "red_alert_watcher_events_emitted_total",
                "Number of events emitted downstream",
                &["event_type"]
            )
            .expect("Failed to register events_emitted_total"),

            filtered_out_total: register_int_counter!(
                "red_alert_watcher_filtered_out_total",
                "Number of triggers cancelled by location or area filters"
            )
            .expect("Failed to register filtered_out_total"),

            fetch_latency_seconds: register_histogram!(
                "red_alert_watcher_fetch_latency_seconds",
                "Time spent fetching the alert feed",
                FETCH_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register fetch_latency_seconds"),

            active_locations: register_int_gauge!(
                "red_alert_watcher_active_locations",
                "Number of locations in the current alert batch"
            )
            .expect("Failed to register active_locations"),
        }
    }
}

/// Watcher metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the same
/// underlying metrics.
#[derive(Clone)]
pub struct WatcherMetrics {
    _private: (),
}

impl Default for WatcherMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl WatcherMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(WatcherMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &WatcherMetricsInner {
        GLOBAL_METRICS.get_or_init(WatcherMetricsInner::new)
    }

    pub fn inc_cycles(&self) {
        self.inner().cycles_total.inc();
    }

    pub fn inc_fetch_errors(&self) {
        self.inner().fetch_errors_total.inc();
    }

    pub fn inc_history_errors(&self) {
        self.inner().history_errors_total.inc();
    }

    pub fn inc_events_emitted(&self, event_type: &str) {
        self.inner()
            .events_emitted_total
            .with_label_values(&[event_type])
            .inc();
    }

    pub fn inc_filtered_out(&self) {
        self.inner().filtered_out_total.inc();
    }

    pub fn observe_fetch_latency(&self, duration_secs: f64) {
        self.inner().fetch_latency_seconds.observe(duration_secs);
    }

    pub fn set_active_locations(&self, count: i64) {
        self.inner().active_locations.set(count);
    }

    /// Current value of the emitted-events counter for one event type
    pub fn events_emitted(&self, event_type: &str) -> u64 {
        self.inner()
            .events_emitted_total
            .with_label_values(&[event_type])
            .get()
    }
}

/// Structured logger for host lifecycle events
///
/// Keeps event names consistent across the agent and the CLI.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log watcher startup
    pub fn log_startup(&self, version: &str, mode: &str, interval_secs: u64) {
        info!(
            event = "watcher_started",
            instance = %self.instance,
            version = %version,
            trigger_mode = %mode,
            interval_secs = interval_secs,
            "Red alert watcher started"
        );
    }

    /// Log watcher shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "watcher_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Red alert watcher shutting down"
        );
    }

    /// Log an event handed to the downstream consumer
    pub fn log_forwarded(&self, event_type: &str, alert_count: u32, destination: &str) {
        info!(
            event = "event_forwarded",
            instance = %self.instance,
            event_type = %event_type,
            alert_count = alert_count,
            destination = %destination,
            "Forwarded alert event"
        );
    }

    /// Log a failed delivery to the downstream consumer
    pub fn log_forward_failed(&self, event_type: &str, destination: &str, error: &str) {
        warn!(
            event = "forward_failed",
            instance = %self.instance,
            event_type = %event_type,
            destination = %destination,
            error = %error,
            "Failed to forward alert event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watcher_metrics_creation() {
        let metrics = WatcherMetrics::new();

        metrics.inc_cycles();
        metrics.inc_fetch_errors();
        metrics.inc_history_errors();
        metrics.inc_filtered_out();
        metrics.observe_fetch_latency(0.2);
        metrics.set_active_locations(3);

        let before = metrics.events_emitted("manual_trigger");
        metrics.inc_events_emitted("manual_trigger");
        assert!(metrics.events_emitted("manual_trigger") > before);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-host");
        assert_eq!(logger.instance, "test-host");
    }
}

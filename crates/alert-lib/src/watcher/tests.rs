//! Behaviour tests for the watcher cycle and lifecycle
//!
//! A scripted fetcher replays one response per call and a recording sink
//! captures everything the watcher emits.

#[cfg(test)]
mod cycle_tests {
    use crate::error::{FetchError, WatcherError};
    use crate::fetcher::{async_trait, SnapshotFetcher};
    use crate::filter::FilterConfig;
    use crate::models::{EmittedEvent, EventType, HistoryRecord, Snapshot};
    use crate::sink::Sink;
    use crate::watcher::{
        AlertWatcher, AlertWatcherBuilder, TrackedState, TriggerMode, WatcherConfig,
        WatcherState, HISTORY_ERROR_MESSAGE,
    };
    use chrono::Utc;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    type FetchResult = Result<Option<Snapshot>, FetchError>;

    /// Replays scripted snapshot responses; repeats "no alerts" once drained
    struct ScriptedFetcher {
        current: Mutex<VecDeque<FetchResult>>,
        history_fails: bool,
        fetch_calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new(script: Vec<FetchResult>) -> Arc<Self> {
            Arc::new(Self {
                current: Mutex::new(script.into()),
                history_fails: false,
                fetch_calls: AtomicUsize::new(0),
            })
        }

        fn with_failing_history(script: Vec<FetchResult>) -> Arc<Self> {
            Arc::new(Self {
                current: Mutex::new(script.into()),
                history_fails: true,
                fetch_calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.fetch_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SnapshotFetcher for ScriptedFetcher {
        async fn fetch_current(&self) -> FetchResult {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            self.current.lock().unwrap().pop_front().unwrap_or(Ok(None))
        }

        async fn fetch_history(&self) -> Result<Vec<HistoryRecord>, FetchError> {
            if self.history_fails {
                return Err(FetchError::Timeout(Duration::from_secs(15)));
            }
            Ok((0..8)
                .map(|i| HistoryRecord {
                    alert_date: format!("2024-01-01 10:0{}:00", i),
                    title: "Rocket Fire".to_string(),
                    data: format!("location-{}", i),
                    category: 1,
                })
                .collect())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<EmittedEvent>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<EmittedEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sink for RecordingSink {
        async fn emit(&self, events: Vec<EmittedEvent>) {
            self.events.lock().unwrap().extend(events);
        }
    }

    fn alert(id: &str, locations: &[&str]) -> FetchResult {
        Ok(Some(Snapshot {
            id: id.to_string(),
            category: "1".to_string(),
            title: "Rocket Fire".to_string(),
            description: "Take shelter".to_string(),
            locations: locations.iter().map(|l| l.to_string()).collect(),
            observed_at: Utc::now(),
        }))
    }

    fn quiet() -> FetchResult {
        Ok(None)
    }

    fn failure() -> FetchResult {
        Err(FetchError::Network("connection reset".to_string()))
    }

    fn config(mode: TriggerMode) -> WatcherConfig {
        WatcherConfig {
            mode,
            interval: Duration::from_secs(10),
            filter: FilterConfig {
                enhanced_location_data: false,
                ..FilterConfig::default()
            },
        }
    }

    fn watcher(
        fetcher: Arc<ScriptedFetcher>,
        config: WatcherConfig,
    ) -> (AlertWatcher, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let watcher = AlertWatcherBuilder::new()
            .fetcher(fetcher)
            .sink(sink.clone())
            .config(config)
            .build()
            .unwrap();
        (watcher, sink)
    }

    /// Run `ticks` periodic cycles back to back, returning the final state
    async fn run_ticks(watcher: &AlertWatcher, ticks: usize) -> TrackedState {
        let mut state = TrackedState::default();
        for _ in 0..ticks {
            state = watcher.cycle.run(state).await;
        }
        state
    }

    fn assert_payload_invariants(events: &[EmittedEvent]) {
        for event in events {
            assert_eq!(event.has_active_alerts, event.alert.is_some());
            if let Some(alert) = &event.alert {
                assert_eq!(event.alert_count as usize, alert.locations.len());
            }
        }
    }

    #[tokio::test]
    async fn test_new_alerts_does_not_repeat_same_id() {
        let fetcher = ScriptedFetcher::new(vec![alert("1", &["Haifa"]), alert("1", &["Haifa"])]);
        let (watcher, sink) = watcher(fetcher, config(TriggerMode::NewAlerts));

        run_ticks(&watcher, 2).await;

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::NewAlert);
        assert_payload_invariants(&events);
    }

    #[tokio::test]
    async fn test_new_alerts_all_clear_after_active() {
        let fetcher = ScriptedFetcher::new(vec![alert("1", &["Haifa", "Acre"]), quiet()]);
        let (watcher, sink) = watcher(fetcher, config(TriggerMode::NewAlerts));

        run_ticks(&watcher, 2).await;

        let events = sink.events();
        assert_eq!(events.len(), 2);
        let clear = &events[1];
        assert_eq!(clear.event_type, EventType::AllClear);
        assert!(!clear.has_active_alerts);
        assert!(clear.alert.is_none());
        assert_eq!(clear.alert_count, 2);
    }

    #[tokio::test]
    async fn test_new_alerts_without_trigger_on_clear() {
        let mut config = config(TriggerMode::NewAlerts);
        config.filter.trigger_on_clear = false;
        let fetcher = ScriptedFetcher::new(vec![alert("1", &["Haifa"]), quiet()]);
        let (watcher, sink) = watcher(fetcher, config);

        run_ticks(&watcher, 2).await;

        assert_eq!(sink.events().len(), 1);
    }

    #[tokio::test]
    async fn test_all_active_emits_every_tick() {
        let fetcher = ScriptedFetcher::new(vec![
            alert("7", &["Sderot"]),
            alert("7", &["Sderot"]),
            alert("7", &["Sderot"]),
        ]);
        let (watcher, sink) = watcher(fetcher, config(TriggerMode::AllActive));

        run_ticks(&watcher, 3).await;

        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert!(events
            .iter()
            .all(|e| e.event_type == EventType::ActiveAlerts));
        assert_payload_invariants(&events);
    }

    #[tokio::test]
    async fn test_all_active_quiet_start_emits_nothing() {
        let fetcher = ScriptedFetcher::new(vec![quiet(), quiet()]);
        let (watcher, sink) = watcher(fetcher, config(TriggerMode::AllActive));

        run_ticks(&watcher, 2).await;

        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_status_change_tracks_count_changes() {
        let fetcher = ScriptedFetcher::new(vec![
            alert("1", &["A"]),
            alert("1", &["A"]),
            alert("1", &["A", "B"]),
            quiet(),
            quiet(),
        ]);
        let (watcher, sink) = watcher(fetcher, config(TriggerMode::StatusChange));

        run_ticks(&watcher, 5).await;

        let types: Vec<EventType> = sink.events().iter().map(|e| e.event_type).collect();
        assert_eq!(
            types,
            vec![
                EventType::StatusChanged,
                EventType::StatusChanged,
                EventType::AllClear
            ]
        );
    }

    #[tokio::test]
    async fn test_location_filter_narrows_alert() {
        let mut config = config(TriggerMode::NewAlerts);
        config.filter.filter_by_location = true;
        config.filter.location_substrings = vec!["Tel".to_string()];
        let fetcher = ScriptedFetcher::new(vec![alert("1", &["Tel Aviv", "Haifa"])]);
        let (watcher, sink) = watcher(fetcher, config);

        run_ticks(&watcher, 1).await;

        let events = sink.events();
        assert_eq!(events.len(), 1);
        let alert = events[0].alert.as_ref().unwrap();
        assert_eq!(alert.locations, vec!["Tel Aviv"]);
        assert_eq!(events[0].alert_count, 1);
    }

    #[tokio::test]
    async fn test_location_filter_without_match_is_silent() {
        let mut config = config(TriggerMode::NewAlerts);
        config.filter.filter_by_location = true;
        config.filter.location_substrings = vec!["Eilat".to_string()];
        let fetcher = ScriptedFetcher::new(vec![alert("1", &["Tel Aviv", "Haifa"])]);
        let (watcher, sink) = watcher(fetcher, config);

        let state = run_ticks(&watcher, 1).await;

        assert!(sink.events().is_empty());
        // The filtered-out alert still counts as seen
        assert_eq!(state.last_id.as_deref(), Some("1"));
        assert_eq!(state.last_location_count, 2);
    }

    #[tokio::test]
    async fn test_enhanced_location_data_attached() {
        let mut config = config(TriggerMode::NewAlerts);
        config.filter.enhanced_location_data = true;
        let fetcher = ScriptedFetcher::new(vec![alert("1", &["Tel Aviv", "Haifa"])]);
        let (watcher, sink) = watcher(fetcher, config);

        run_ticks(&watcher, 1).await;

        let events = sink.events();
        let detailed = events[0]
            .alert
            .as_ref()
            .and_then(|a| a.locations_detailed.as_ref())
            .unwrap();
        assert_eq!(detailed.len(), 2);
        assert_eq!(detailed[0].name, "Tel Aviv");
        assert_eq!(detailed[0].area, "unknown");
        assert_eq!(detailed[0].estimated_shelter_time, 15);
    }

    #[tokio::test]
    async fn test_history_attached_and_truncated() {
        let mut config = config(TriggerMode::NewAlerts);
        config.filter.include_history = true;
        let fetcher = ScriptedFetcher::new(vec![alert("1", &["Haifa"])]);
        let (watcher, sink) = watcher(fetcher, config);

        run_ticks(&watcher, 1).await;

        let events = sink.events();
        assert_eq!(events[0].recent_history.as_ref().unwrap().len(), 5);
        assert!(events[0].history_error.is_none());
    }

    #[tokio::test]
    async fn test_history_failure_keeps_primary_event() {
        let mut config = config(TriggerMode::NewAlerts);
        config.filter.include_history = true;
        let fetcher = ScriptedFetcher::with_failing_history(vec![alert("1", &["Haifa"])]);
        let (watcher, sink) = watcher(fetcher, config);

        let state = run_ticks(&watcher, 1).await;

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::NewAlert);
        assert!(events[0].recent_history.is_none());
        assert_eq!(events[0].history_error.as_deref(), Some(HISTORY_ERROR_MESSAGE));
        assert_eq!(state.last_id.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_fetch_failure_emits_error_and_keeps_state() {
        let fetcher = ScriptedFetcher::new(vec![
            alert("1", &["Haifa"]),
            failure(),
            alert("2", &["Haifa"]),
        ]);
        let (watcher, sink) = watcher(fetcher, config(TriggerMode::NewAlerts));

        let after_first = watcher.cycle.run(TrackedState::default()).await;
        let after_failure = watcher.cycle.run(after_first.clone()).await;
        assert_eq!(after_failure, after_first);

        watcher.cycle.run(after_failure).await;

        let events = sink.events();
        let types: Vec<EventType> = events.iter().map(|e| e.event_type).collect();
        assert_eq!(
            types,
            vec![EventType::NewAlert, EventType::Error, EventType::NewAlert]
        );
        assert_eq!(events[1].error_type.as_deref(), Some("api_error"));
        assert!(events[1].error.as_ref().unwrap().contains("connection reset"));
        assert_payload_invariants(&events);
    }

    #[tokio::test]
    async fn test_fetch_failure_on_first_tick_keeps_first_tick_flag() {
        let fetcher = ScriptedFetcher::new(vec![failure()]);
        let (watcher, sink) = watcher(fetcher, config(TriggerMode::AllActive));

        let state = run_ticks(&watcher, 1).await;

        assert_eq!(state, TrackedState::default());
        assert_eq!(sink.events().len(), 1);
    }

    #[tokio::test]
    async fn test_manual_check_bypasses_tracking() {
        let fetcher = ScriptedFetcher::new(vec![alert("1", &["Haifa"]), alert("1", &["Haifa"])]);
        let (watcher, sink) = watcher(fetcher, config(TriggerMode::NewAlerts));

        let first = watcher.manual_check().await.unwrap();
        let second = watcher.manual_check().await.unwrap();

        assert_eq!(first.event_type, EventType::ManualTrigger);
        assert_eq!(second.event_type, EventType::ManualTrigger);
        assert_eq!(sink.events().len(), 2);
        assert_payload_invariants(&sink.events());
    }

    #[tokio::test]
    async fn test_manual_check_when_quiet() {
        let fetcher = ScriptedFetcher::new(vec![quiet()]);
        let (watcher, sink) = watcher(fetcher, config(TriggerMode::NewAlerts));

        let event = watcher.manual_check().await.unwrap();

        assert!(!event.has_active_alerts);
        assert_eq!(event.alert_count, 0);
        assert_eq!(sink.events().len(), 1);
    }

    #[tokio::test]
    async fn test_manual_check_propagates_fetch_error() {
        let fetcher = ScriptedFetcher::new(vec![failure()]);
        let (watcher, sink) = watcher(fetcher, config(TriggerMode::NewAlerts));

        let result = watcher.manual_check().await;

        assert!(matches!(result, Err(WatcherError::ManualCheck(_))));
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_stop_before_start_is_harmless() {
        let fetcher = ScriptedFetcher::new(vec![]);
        let (watcher, _sink) = watcher(fetcher, config(TriggerMode::NewAlerts));

        watcher.stop();
        watcher.stop();

        assert_eq!(watcher.state(), WatcherState::Stopped);
        assert!(matches!(
            watcher.manual_check().await,
            Err(WatcherError::Stopped)
        ));
        assert!(matches!(watcher.start().await, Err(WatcherError::Stopped)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_runs_immediately_then_on_schedule() {
        let fetcher = ScriptedFetcher::new(vec![
            alert("1", &["Haifa"]),
            alert("2", &["Haifa"]),
            alert("3", &["Haifa"]),
        ]);
        let (watcher, sink) = watcher(fetcher.clone(), config(TriggerMode::NewAlerts));

        watcher.start().await.unwrap();
        assert_eq!(watcher.state(), WatcherState::Running);
        assert_eq!(sink.events().len(), 1);
        assert!(matches!(
            watcher.start().await,
            Err(WatcherError::AlreadyRunning)
        ));

        tokio::time::sleep(Duration::from_secs(25)).await;

        assert_eq!(fetcher.calls(), 3);
        let ids: Vec<String> = sink
            .events()
            .iter()
            .filter_map(|e| e.alert.as_ref().map(|a| a.id.clone()))
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);

        watcher.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_schedule() {
        let fetcher = ScriptedFetcher::new(vec![
            alert("1", &["Haifa"]),
            alert("2", &["Haifa"]),
        ]);
        let (watcher, sink) = watcher(fetcher.clone(), config(TriggerMode::NewAlerts));

        watcher.start().await.unwrap();
        watcher.stop();
        watcher.stop();

        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(sink.events().len(), 1);
        assert_eq!(watcher.state(), WatcherState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_failure_does_not_break_schedule() {
        let fetcher = ScriptedFetcher::new(vec![
            alert("1", &["Haifa"]),
            failure(),
            failure(),
            alert("1", &["Haifa"]),
            alert("2", &["Haifa"]),
        ]);
        let (watcher, sink) = watcher(fetcher.clone(), config(TriggerMode::NewAlerts));

        watcher.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(45)).await;
        watcher.stop();

        let types: Vec<EventType> = sink.events().iter().map(|e| e.event_type).collect();
        assert_eq!(
            types,
            vec![
                EventType::NewAlert,
                EventType::Error,
                EventType::Error,
                EventType::NewAlert
            ]
        );
    }

    /// Takes `delay` per fetch and records how many fetches overlap
    struct SlowFetcher {
        delay: Duration,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl SlowFetcher {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay,
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SnapshotFetcher for SlowFetcher {
        async fn fetch_current(&self) -> FetchResult {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(running, Ordering::SeqCst);

            tokio::time::sleep(self.delay).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            alert(&format!("slow-{}", call), &["Haifa"])
        }

        async fn fetch_history(&self) -> Result<Vec<HistoryRecord>, FetchError> {
            Ok(Vec::new())
        }
    }

    fn slow_watcher(fetcher: Arc<SlowFetcher>) -> (AlertWatcher, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let watcher = AlertWatcherBuilder::new()
            .fetcher(fetcher)
            .sink(sink.clone())
            .config(config(TriggerMode::NewAlerts))
            .build()
            .unwrap();
        (watcher, sink)
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_never_overlaps_next_cycle() {
        let fetcher = SlowFetcher::new(Duration::from_secs(15));
        let (watcher, sink) = slow_watcher(fetcher.clone());

        watcher.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(100)).await;
        watcher.stop();

        assert!(fetcher.calls() >= 3);
        assert_eq!(fetcher.max_in_flight.load(Ordering::SeqCst), 1);
        assert!(sink.events().len() <= fetcher.calls());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_slow_cycle_starts_no_new_fetch() {
        for _ in 0..20 {
            let fetcher = SlowFetcher::new(Duration::from_secs(15));
            let (watcher, sink) = slow_watcher(fetcher.clone());

            // First cycle ends at 15s, the next tick at 25s is in flight at 30s
            watcher.start().await.unwrap();
            tokio::time::sleep(Duration::from_secs(15)).await;

            let calls_at_stop = fetcher.calls();
            let events_at_stop = sink.events().len();
            watcher.stop();

            tokio::time::sleep(Duration::from_secs(120)).await;

            assert_eq!(calls_at_stop, 2);
            assert_eq!(fetcher.calls(), calls_at_stop);
            assert!(sink.events().len() <= events_at_stop + 1);
        }
    }
}

//! Trigger decision for a single tick

use super::config::TriggerMode;
use crate::models::{EventType, Snapshot};

/// What the watcher remembers about the previous tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedState {
    pub last_id: Option<String>,
    pub last_location_count: u32,
    pub is_first_tick: bool,
}

impl Default for TrackedState {
    fn default() -> Self {
        Self {
            last_id: None,
            last_location_count: 0,
            is_first_tick: true,
        }
    }
}

impl TrackedState {
    /// State after observing `snapshot`
    pub fn observe(snapshot: Option<&Snapshot>) -> Self {
        Self {
            last_id: snapshot.map(|s| s.id.clone()),
            last_location_count: snapshot.map(Snapshot::location_count).unwrap_or(0),
            is_first_tick: false,
        }
    }
}

/// Decide whether this tick triggers, and why.
///
/// Only looks at the unfiltered snapshot; filters may still cancel the
/// trigger afterwards.
pub fn decide(
    mode: TriggerMode,
    trigger_on_clear: bool,
    state: &TrackedState,
    current: Option<&Snapshot>,
) -> Option<EventType> {
    let current_id = current.map(|s| s.id.as_str());
    let current_count = current.map(Snapshot::location_count).unwrap_or(0);
    let id_changed = current_id != state.last_id.as_deref();

    match mode {
        TriggerMode::NewAlerts => {
            if current.is_some() && id_changed {
                Some(EventType::NewAlert)
            } else if trigger_on_clear && current.is_none() && state.last_location_count > 0 {
                Some(EventType::AllClear)
            } else {
                None
            }
        }
        TriggerMode::AllActive => {
            if current.is_some() {
                Some(EventType::ActiveAlerts)
            } else if trigger_on_clear && !state.is_first_tick && state.last_location_count > 0 {
                Some(EventType::AllClear)
            } else {
                None
            }
        }
        TriggerMode::StatusChange => {
            if current_count != state.last_location_count || id_changed {
                if current.is_some() {
                    Some(EventType::StatusChanged)
                } else {
                    Some(EventType::AllClear)
                }
            } else {
                None
            }
        }
    }
}

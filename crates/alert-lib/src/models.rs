//! Core data models for the alert watcher

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder shelter time attached to every location until a real
/// location database is wired in
pub const DEFAULT_SHELTER_TIME_SECS: u32 = 15;

/// Area tag attached to enhanced location records
pub const UNKNOWN_AREA: &str = "unknown";

/// Error type label carried by `error` events
pub const API_ERROR_TYPE: &str = "api_error";

/// The currently active alert batch as reported by the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub category: String,
    pub title: String,
    pub description: String,
    pub locations: Vec<String>,
    /// Assigned at fetch time, the feed does not carry it
    pub observed_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn location_count(&self) -> u32 {
        self.locations.len() as u32
    }

    /// Copy of this snapshot carrying only the given locations
    pub fn with_locations(&self, locations: Vec<String>) -> Self {
        Self {
            locations,
            ..self.clone()
        }
    }
}

/// Raw alert object as served by the feed
#[derive(Debug, Clone, Deserialize)]
pub struct RawAlert {
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(default)]
    pub cat: serde_json::Value,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub data: Vec<String>,
    #[serde(default)]
    pub desc: String,
}

impl RawAlert {
    /// Convert into a snapshot stamped with `observed_at`.
    ///
    /// Returns `None` when the id is missing or empty, which the feed uses
    /// to signal that nothing is active.
    pub fn into_snapshot(self, observed_at: DateTime<Utc>) -> Option<Snapshot> {
        let id = scalar_to_string(&self.id)?;
        Some(Snapshot {
            id,
            category: scalar_to_string(&self.cat).unwrap_or_default(),
            title: self.title,
            description: self.desc,
            locations: self.data,
            observed_at,
        })
    }
}

fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// One entry of the recent alert history feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(rename = "alertDate", default)]
    pub alert_date: String,
    #[serde(default)]
    pub title: String,
    /// Location the entry refers to
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub category: i64,
}

/// Kind of emitted event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    NewAlert,
    StatusChanged,
    ActiveAlerts,
    AllClear,
    ManualTrigger,
    Error,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::NewAlert => "new_alert",
            EventType::StatusChanged => "status_changed",
            EventType::ActiveAlerts => "active_alerts",
            EventType::AllClear => "all_clear",
            EventType::ManualTrigger => "manual_trigger",
            EventType::Error => "error",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-location detail attached when enhanced location data is enabled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationDetail {
    pub name: String,
    pub hebrew_name: String,
    pub estimated_shelter_time: u32,
    pub area: String,
}

impl LocationDetail {
    /// Stub record until a location database is available
    pub fn placeholder(location: &str) -> Self {
        Self {
            name: location.to_string(),
            hebrew_name: location.to_string(),
            estimated_shelter_time: DEFAULT_SHELTER_TIME_SECS,
            area: UNKNOWN_AREA.to_string(),
        }
    }
}

/// Alert section of an emitted event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    pub id: String,
    pub category: String,
    pub title: String,
    pub description: String,
    pub locations: Vec<String>,
    pub alert_timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations_detailed: Option<Vec<LocationDetail>>,
}

impl From<&Snapshot> for AlertPayload {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            id: snapshot.id.clone(),
            category: snapshot.category.clone(),
            title: snapshot.title.clone(),
            description: snapshot.description.clone(),
            locations: snapshot.locations.clone(),
            alert_timestamp: snapshot.observed_at,
            locations_detailed: None,
        }
    }
}

/// Normalized event handed to the downstream consumer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmittedEvent {
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub alert_count: u32,
    pub has_active_alerts: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert: Option<AlertPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_history: Option<Vec<HistoryRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl EmittedEvent {
    /// Event describing an active alert batch
    pub fn with_alert(event_type: EventType, snapshot: &Snapshot) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            alert_count: snapshot.location_count(),
            has_active_alerts: true,
            alert: Some(AlertPayload::from(snapshot)),
            recent_history: None,
            history_error: None,
            error: None,
            error_type: None,
        }
    }

    /// Event without an alert section, e.g. an all-clear
    pub fn without_alert(event_type: EventType, alert_count: u32) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            alert_count,
            has_active_alerts: false,
            alert: None,
            recent_history: None,
            history_error: None,
            error: None,
            error_type: None,
        }
    }

    /// Event reporting a failed primary fetch
    pub fn api_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            error_type: Some(API_ERROR_TYPE.to_string()),
            ..Self::without_alert(EventType::Error, 0)
        }
    }
}

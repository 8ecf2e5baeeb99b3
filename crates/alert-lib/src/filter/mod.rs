//! Location and area filtering for triggering snapshots
//!
//! Filters only ever narrow the location list of an active snapshot. When a
//! filter leaves nothing behind the whole trigger is cancelled.

mod areas;

pub use areas::{AreaResolver, StaticAreaTable, AREA_MARKERS, SELECTABLE_AREAS};

use crate::models::Snapshot;
use std::sync::Arc;

/// Immutable filter and enrichment options captured at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    pub filter_by_location: bool,
    /// Case-sensitive substrings, trimmed, empties dropped
    pub location_substrings: Vec<String>,
    pub filter_by_area: bool,
    pub area_tags: Vec<String>,
    pub trigger_on_clear: bool,
    pub include_history: bool,
    pub enhanced_location_data: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            filter_by_location: false,
            location_substrings: Vec::new(),
            filter_by_area: false,
            area_tags: Vec::new(),
            trigger_on_clear: true,
            include_history: false,
            enhanced_location_data: true,
        }
    }
}

impl FilterConfig {
    fn location_filter_active(&self) -> bool {
        self.filter_by_location && !self.location_substrings.is_empty()
    }

    fn area_filter_active(&self) -> bool {
        self.filter_by_area && !self.area_tags.is_empty()
    }
}

/// Split a comma-separated location list
pub fn parse_location_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|location| !location.is_empty())
        .map(str::to_string)
        .collect()
}

/// Applies the configured filters to a snapshot
#[derive(Clone)]
pub struct SnapshotFilter {
    config: FilterConfig,
    resolver: Arc<dyn AreaResolver>,
}

impl SnapshotFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self::with_resolver(config, Arc::new(StaticAreaTable))
    }

    pub fn with_resolver(config: FilterConfig, resolver: Arc<dyn AreaResolver>) -> Self {
        Self { config, resolver }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Narrow the snapshot to matching locations.
    ///
    /// The location filter runs first and the area filter runs on its
    /// output. Returns `None` when either filter empties the list.
    pub fn apply(&self, snapshot: &Snapshot) -> Option<Snapshot> {
        let mut locations = snapshot.locations.clone();

        if self.config.location_filter_active() {
            locations.retain(|location| {
                self.config
                    .location_substrings
                    .iter()
                    .any(|needle| location.contains(needle.as_str()))
            });
            if locations.is_empty() {
                return None;
            }
        }

        if self.config.area_filter_active() {
            locations.retain(|location| {
                self.config
                    .area_tags
                    .iter()
                    .any(|area| self.resolver.location_in_area(location, area))
            });
            if locations.is_empty() {
                return None;
            }
        }

        Some(snapshot.with_locations(locations))
    }
}

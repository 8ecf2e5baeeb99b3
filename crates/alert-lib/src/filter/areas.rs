//! Area tag matching
//!
//! There is no real location-to-area mapping yet. Each tag maps to one
//! marker substring and a location belongs to the tag if it contains the
//! marker. Tags missing from the table match nothing.

/// Fixed tag → marker table. Extend by editing this table only.
pub const AREA_MARKERS: &[(&str, &str)] = &[
    ("עוטף עזה", "עוטף"),
    ("תל אביב", "תל אביב"),
    ("ירושלים", "ירושלים"),
];

/// Area tags the configuration surface offers
pub const SELECTABLE_AREAS: &[&str] = &["עוטף עזה", "תל אביב", "ירושלים", "צפון", "מרכז", "דרום"];

/// Decides whether a location falls inside an area tag
pub trait AreaResolver: Send + Sync {
    fn location_in_area(&self, location: &str, area: &str) -> bool;
}

/// Resolver backed by [`AREA_MARKERS`]
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticAreaTable;

impl StaticAreaTable {
    pub fn marker(area: &str) -> Option<&'static str> {
        AREA_MARKERS
            .iter()
            .find(|(tag, _)| *tag == area)
            .map(|(_, marker)| *marker)
    }
}

impl AreaResolver for StaticAreaTable {
    fn location_in_area(&self, location: &str, area: &str) -> bool {
        Self::marker(area).is_some_and(|marker| location.contains(marker))
    }
}

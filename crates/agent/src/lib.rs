//! Red alert agent
//!
//! Runs the watcher as a long-lived service, forwards its events and
//! exposes health, metrics and manual checks over HTTP.

pub mod api;
pub mod config;
pub mod forwarder;

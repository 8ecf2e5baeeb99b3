//! Output formatting utilities

use alert_lib::{EmittedEvent, EventType, HistoryRecord, LocationDetail};
use chrono::{DateTime, Local, Utc};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Parse a format name from the config file
    pub fn from_name(name: &str) -> Option<Self> {
        Self::from_str(name, true).ok()
    }
}

#[derive(Tabled)]
struct LocationRow {
    #[tabled(rename = "Location")]
    name: String,
    #[tabled(rename = "Area")]
    area: String,
    #[tabled(rename = "Shelter")]
    shelter: String,
}

impl From<&LocationDetail> for LocationRow {
    fn from(detail: &LocationDetail) -> Self {
        Self {
            name: detail.name.clone(),
            area: detail.area.clone(),
            shelter: format!("{}s", detail.estimated_shelter_time),
        }
    }
}

#[derive(Tabled)]
pub struct HistoryRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Category")]
    category: i64,
}

impl From<&HistoryRecord> for HistoryRow {
    fn from(record: &HistoryRecord) -> Self {
        Self {
            date: record.alert_date.clone(),
            title: record.title.clone(),
            location: record.data.clone(),
            category: record.category,
        }
    }
}

/// Print a value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => print_error(&format!("Failed to serialize output: {}", e)),
    }
}

/// Print a table from a list of items
pub fn print_table<T: Tabled>(items: &[T]) {
    if items.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    let table = Table::new(items).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print history records
pub fn print_history(records: &[HistoryRecord], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&records),
        OutputFormat::Table => {
            let rows: Vec<HistoryRow> = records.iter().map(HistoryRow::from).collect();
            print_table(&rows);
        }
    }
}

/// Print one emitted event
pub fn print_event(event: &EmittedEvent, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(event),
        OutputFormat::Table => print_event_summary(event),
    }
}

fn print_event_summary(event: &EmittedEvent) {
    println!(
        "{} {}  {} location(s)",
        format_timestamp(&event.timestamp).dimmed(),
        color_event_type(event.event_type),
        event.alert_count
    );

    if let Some(error) = &event.error {
        print_error(error);
        return;
    }

    let Some(alert) = &event.alert else {
        if event.event_type == EventType::AllClear {
            print_success("All clear");
        } else {
            print_info("No active alerts");
        }
        return;
    };

    println!("{}", alert.title.bold());
    if !alert.description.is_empty() {
        println!("{}", alert.description);
    }
    println!(
        "ID: {}  Category: {}",
        alert.id.cyan(),
        alert.category.cyan()
    );

    match &alert.locations_detailed {
        Some(details) => {
            let rows: Vec<LocationRow> = details.iter().map(LocationRow::from).collect();
            print_table(&rows);
        }
        None => println!("Locations: {}", alert.locations.join(", ")),
    }

    if let Some(history) = &event.recent_history {
        println!("{}", "Recent history".bold());
        let rows: Vec<HistoryRow> = history.iter().map(HistoryRow::from).collect();
        print_table(&rows);
    }
    if let Some(history_error) = &event.history_error {
        print_warning(history_error);
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a UTC timestamp in local time
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Color an event type by severity
pub fn color_event_type(event_type: EventType) -> String {
    let label = event_type.as_str();
    match event_type {
        EventType::NewAlert | EventType::StatusChanged | EventType::ActiveAlerts => {
            label.red().bold().to_string()
        }
        EventType::AllClear => label.green().bold().to_string(),
        EventType::ManualTrigger => label.blue().bold().to_string(),
        EventType::Error => label.yellow().bold().to_string(),
    }
}

/// Color a health status
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" => status.green().to_string(),
        "degraded" => status.yellow().to_string(),
        "unhealthy" => status.red().to_string(),
        _ => status.to_string(),
    }
}

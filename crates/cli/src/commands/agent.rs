//! Commands against a running agent

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::AgentClient;
use crate::output::{color_status, format_timestamp, print_event, print_json, print_table, OutputFormat};

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Failures")]
    failures: u32,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Last check")]
    last_check: String,
}

/// Show the agent's component health
pub async fn show_health(client: &AgentClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health),
        OutputFormat::Table => {
            println!(
                "{} {}",
                "Agent status:".bold(),
                color_status(health.status.as_str())
            );

            let mut rows: Vec<ComponentRow> = health
                .components
                .iter()
                .map(|(name, component)| ComponentRow {
                    name: name.clone(),
                    status: color_status(component.status.as_str()),
                    failures: component.consecutive_failures,
                    message: component.message.clone().unwrap_or_default(),
                    last_check: chrono::DateTime::from_timestamp(component.last_check_timestamp, 0)
                        .map(|ts| format_timestamp(&ts))
                        .unwrap_or_default(),
                })
                .collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name));
            print_table(&rows);
        }
    }

    Ok(())
}

/// Ask the agent to run a manual check and print the result
pub async fn run_check(client: &AgentClient, format: OutputFormat) -> Result<()> {
    let event = client.check().await?;
    print_event(&event, format);
    Ok(())
}

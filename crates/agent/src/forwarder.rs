//! Delivers emitted events to the downstream consumer
//!
//! Every event is written to stdout as one JSON line. When a webhook is
//! configured the event is also POSTed there; delivery is best effort.

use alert_lib::health::{components, HealthRegistry};
use alert_lib::{EmittedEvent, StructuredLogger};
use anyhow::{Context, Result};
use reqwest::Client;
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use url::Url;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Forwarder {
    client: Client,
    webhook_url: Option<Url>,
    health: HealthRegistry,
    logger: StructuredLogger,
}

impl Forwarder {
    pub fn new(
        webhook_url: Option<String>,
        health: HealthRegistry,
        logger: StructuredLogger,
    ) -> Result<Self> {
        let webhook_url = webhook_url
            .map(|raw| Url::parse(&raw).with_context(|| format!("Invalid webhook URL '{}'", raw)))
            .transpose()?;

        let client = Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .context("Failed to create webhook client")?;

        Ok(Self {
            client,
            webhook_url,
            health,
            logger,
        })
    }

    /// Consume events until the channel closes
    pub async fn run(self, mut events_rx: mpsc::Receiver<EmittedEvent>) {
        info!(webhook = self.webhook_url.is_some(), "Starting event forwarder");

        while let Some(event) = events_rx.recv().await {
            self.forward(&event).await;
        }

        info!("Event channel closed, forwarder exiting");
    }

    pub async fn forward(&self, event: &EmittedEvent) {
        let event_type = event.event_type.as_str();

        let written = write_json_line(&mut std::io::stdout().lock(), event);
        match written {
            Ok(()) => self
                .logger
                .log_forwarded(event_type, event.alert_count, "stdout"),
            Err(e) => self
                .logger
                .log_forward_failed(event_type, "stdout", &e.to_string()),
        }

        let Some(url) = &self.webhook_url else {
            return;
        };

        match self.post(url, event).await {
            Ok(()) => {
                self.health.record_success(components::FORWARDER).await;
                self.logger
                    .log_forwarded(event_type, event.alert_count, "webhook");
            }
            Err(e) => {
                self.health
                    .record_failure(components::FORWARDER, e.to_string())
                    .await;
                self.logger
                    .log_forward_failed(event_type, "webhook", &format!("{:#}", e));
            }
        }
    }

    async fn post(&self, url: &Url, event: &EmittedEvent) -> Result<()> {
        let response = self
            .client
            .post(url.clone())
            .json(event)
            .send()
            .await
            .context("Failed to send webhook request")?;

        if !response.status().is_success() {
            anyhow::bail!("Webhook returned {}", response.status());
        }

        Ok(())
    }
}

/// Wait for a forwarder to drain its channel once every sender is gone.
///
/// Returns `false` if the grace period ran out first; the task is then
/// aborted.
pub async fn finish(handle: JoinHandle<()>, grace: Duration) -> bool {
    let abort = handle.abort_handle();
    match tokio::time::timeout(grace, handle).await {
        Ok(_) => true,
        Err(_) => {
            warn!(grace_secs = grace.as_secs(), "Forwarder did not drain in time");
            abort.abort();
            false
        }
    }
}

/// Write one event as a single JSON line
pub fn write_json_line<W: Write>(writer: &mut W, event: &EmittedEvent) -> Result<()> {
    serde_json::to_writer(&mut *writer, event).context("Failed to serialize event")?;
    writer.write_all(b"\n").context("Failed to write event")?;
    writer.flush().context("Failed to flush event")?;
    Ok(())
}

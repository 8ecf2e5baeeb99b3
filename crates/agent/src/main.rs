//! Red alert agent - long-running alert feed watcher
//!
//! Polls the feed, forwards emitted events as JSON lines (and optionally
//! to a webhook) and serves health, metrics and manual checks.

use alert_lib::{
    fetcher::OrefFetcher,
    health::{components, HealthRegistry},
    observability::{StructuredLogger, WatcherMetrics},
    watcher, AlertWatcherBuilder, ChannelSink,
};
use anyhow::{Context, Result};
use red_alert_agent::{api, config::AgentConfig, forwarder::{self, Forwarder}};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Upper bound on draining queued events at shutdown
const FORWARDER_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs go to stderr so stdout carries only events
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .init();

    info!("Starting red-alert-agent");

    let config = AgentConfig::load()?;
    let watcher_config = config.watcher.clone().into_config();
    info!(instance = %config.instance_name, "Agent configured");

    let health_registry = HealthRegistry::new();
    watcher::register_health(&health_registry).await;
    health_registry.register(components::FORWARDER).await;

    // Registers the collectors before the first scrape
    let _metrics = WatcherMetrics::new();

    let logger = StructuredLogger::new(&config.instance_name);
    logger.log_startup(
        AGENT_VERSION,
        watcher_config.mode.as_str(),
        watcher_config.interval.as_secs(),
    );

    let fetcher = OrefFetcher::new(config.fetcher_config())?;
    let (sink, events_rx) = ChannelSink::new(config.event_buffer_size);

    let event_forwarder = Forwarder::new(
        config.webhook_url.clone(),
        health_registry.clone(),
        logger.clone(),
    )?;
    let forwarder_handle = tokio::spawn(event_forwarder.run(events_rx));

    let watcher = Arc::new(
        AlertWatcherBuilder::new()
            .fetcher(Arc::new(fetcher))
            .sink(Arc::new(sink))
            .config(watcher_config)
            .health(health_registry.clone())
            .build()?,
    );
    watcher.start().await?;

    health_registry.set_ready(true).await;

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        Arc::clone(&watcher),
    ));
    let mut api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            logger.log_shutdown("SIGINT received");
        }
        result = &mut api_handle => {
            match result {
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
                Ok(Ok(())) => {}
            }
            logger.log_shutdown("API server exited");
        }
    }

    watcher.stop();
    health_registry.set_ready(false).await;
    health_registry
        .set_unhealthy(components::WATCHER, "watcher stopped")
        .await;

    // The channel closes once the API task and the polling task release
    // their handles on the sink
    api_handle.abort();
    drop(watcher);
    forwarder::finish(forwarder_handle, FORWARDER_GRACE).await;

    info!("Shutting down");
    Ok(())
}

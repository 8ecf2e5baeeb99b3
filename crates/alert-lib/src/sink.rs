//! Event sinks
//!
//! A [`Sink`] receives every event the watcher decides to emit along with
//! its diagnostics. Periodic cycles and manual checks share one sink, so
//! implementations must tolerate interleaved calls.

use crate::models::EmittedEvent;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn, Level};

/// Downstream consumer of emitted events
#[async_trait]
pub trait Sink: Send + Sync {
    /// Deliver zero or more events
    async fn emit(&self, events: Vec<EmittedEvent>);

    /// Record a diagnostic message with structured context
    fn log(&self, level: Level, message: &str, context: serde_json::Value) {
        match level {
            Level::ERROR => error!(context = %context, "{}", message),
            Level::WARN => warn!(context = %context, "{}", message),
            Level::INFO => info!(context = %context, "{}", message),
            _ => debug!(context = %context, "{}", message),
        }
    }
}

/// Sink that forwards events over an mpsc channel
#[derive(Clone)]
pub struct ChannelSink {
    events_tx: mpsc::Sender<EmittedEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver the consumer reads from
    pub fn new(buffer_size: usize) -> (Self, mpsc::Receiver<EmittedEvent>) {
        let (events_tx, events_rx) = mpsc::channel(buffer_size);
        (Self { events_tx }, events_rx)
    }
}

#[async_trait]
impl Sink for ChannelSink {
    async fn emit(&self, events: Vec<EmittedEvent>) {
        for event in events {
            let event_type = event.event_type;
            if let Err(e) = self.events_tx.send(event).await {
                warn!(error = %e, %event_type, "Failed to send event to channel");
            }
        }
    }
}

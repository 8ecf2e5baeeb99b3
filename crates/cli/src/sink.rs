//! Sink that renders watcher events on the terminal

use alert_lib::{EmittedEvent, Sink};
use async_trait::async_trait;

use crate::output::{print_event, OutputFormat};

pub struct TerminalSink {
    format: OutputFormat,
}

impl TerminalSink {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

#[async_trait]
impl Sink for TerminalSink {
    async fn emit(&self, events: Vec<EmittedEvent>) {
        for event in &events {
            print_event(event, self.format);
        }
    }
}

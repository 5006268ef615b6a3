//! Mock event source for testing without log files.

use super::{EventSource, IngestError, RawEvents, SkippedRecord};
use crate::domain::Event;
use async_trait::async_trait;

/// Mock event source that returns predefined events.
#[derive(Debug, Clone, Default)]
pub struct MockEventSource {
    events: Vec<Event>,
    skipped: Vec<SkippedRecord>,
}

impl MockEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event. Events keep their insertion order within a symbol.
    pub fn with_event(mut self, event: impl Into<Event>) -> Self {
        self.events.push(event.into());
        self
    }

    /// Add a record reported as skipped at ingestion.
    pub fn with_skipped(mut self, skipped: SkippedRecord) -> Self {
        self.skipped.push(skipped);
        self
    }
}

#[async_trait]
impl EventSource for MockEventSource {
    async fn load_events(&self) -> Result<RawEvents, IngestError> {
        let mut raw = RawEvents {
            skipped: self.skipped.clone(),
            ..RawEvents::default()
        };
        for event in &self.events {
            raw.events
                .entry(event.symbol().clone())
                .or_default()
                .push(event.clone());
        }
        Ok(raw)
    }
}

//! Event sink trait and implementations.

use crate::core::PipelineEvent;
use parking_lot::RwLock;
use tracing::{debug, info, Level};

/// Trait for sinks that receive orchestrator events.
///
/// Emission is synchronous and must never fail the run; sinks swallow their
/// own errors.
pub trait EventSink: Send + Sync {
    /// Receives one event.
    fn emit(&self, event: &PipelineEvent);
}

/// A no-op event sink that discards all events.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event: &PipelineEvent) {}
}

/// An event sink that logs events using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    /// The log level to use.
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Creates an info-level logging sink.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }
}

impl EventSink for LoggingEventSink {
    fn emit(&self, event: &PipelineEvent) {
        if self.level == Level::DEBUG {
            debug!(
                event_type = %event.event_type,
                event_data = ?event.data,
                "Event: {}", event.event_type
            );
        } else {
            info!(
                event_type = %event.event_type,
                event_data = ?event.data,
                "Event: {}", event.event_type
            );
        }
    }
}

/// A collecting event sink for tests and post-run inspection.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<PipelineEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.read().clone()
    }

    /// Returns the collected event types in emission order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events.read().iter().map(|e| e.event_type.clone()).collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events matching a type prefix.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<PipelineEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type.starts_with(type_prefix))
            .cloned()
            .collect()
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event: &PipelineEvent) {
        self.events.write().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_and_logging_sinks() {
        NoOpEventSink.emit(&PipelineEvent::checked("s2e", true));
        LoggingEventSink::default().emit(&PipelineEvent::stage_started("source", 0));
        LoggingEventSink::debug().emit(&PipelineEvent::pipeline_failed("s2e", Some(2)));
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit(&PipelineEvent::stage_started("source", 0));
        sink.emit(&PipelineEvent::stage_completed("source", 0, 1.5));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.event_types(), vec!["stage.started", "stage.completed"]);
    }

    #[test]
    fn test_collecting_sink_filter_and_clear() {
        let sink = CollectingEventSink::new();
        sink.emit(&PipelineEvent::stage_started("source", 0));
        sink.emit(&PipelineEvent::stage_completed("source", 0, 1.0));
        sink.emit(&PipelineEvent::pipeline_completed("s2e", 3.0));

        assert_eq!(sink.events_of_type("stage.").len(), 2);
        assert_eq!(sink.events_of_type("pipeline.").len(), 1);

        sink.clear();
        assert!(sink.is_empty());
    }
}

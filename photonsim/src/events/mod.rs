//! Event sinks for orchestrator observability.
//!
//! The orchestrator reports every check and stage transition as a
//! [`PipelineEvent`](crate::core::PipelineEvent) to the sink it was built with.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

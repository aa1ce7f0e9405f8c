//! Lifecycle events emitted while checking and running a pipeline.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An event emitted by the orchestrator.
///
/// Events are consumed by event sinks for logging, monitoring or tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// The event type (e.g., "stage.started", "pipeline.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// When the event occurred (ISO 8601).
    pub timestamp: String,

    /// The event payload data.
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

impl PipelineEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: crate::utils::iso_timestamp(),
            data: HashMap::new(),
        }
    }

    /// Adds a data field to the event.
    #[must_use]
    pub fn add_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Returns a data field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Creates a "pipeline.checked" event.
    #[must_use]
    pub fn checked(pipeline: &str, consistent: bool) -> Self {
        Self::new("pipeline.checked")
            .add_data("pipeline", serde_json::json!(pipeline))
            .add_data("consistent", serde_json::json!(consistent))
    }

    /// Creates a "pipeline.interface_mismatch" event.
    #[must_use]
    pub fn interface_mismatch(pipeline: &str, pairs: &[(String, String)]) -> Self {
        Self::new("pipeline.interface_mismatch")
            .add_data("pipeline", serde_json::json!(pipeline))
            .add_data("pairs", serde_json::json!(pairs))
    }

    /// Creates a "stage.started" event.
    #[must_use]
    pub fn stage_started(stage: &str, index: usize) -> Self {
        Self::new("stage.started")
            .add_data("stage", serde_json::json!(stage))
            .add_data("index", serde_json::json!(index))
    }

    /// Creates a "stage.completed" event.
    #[must_use]
    pub fn stage_completed(stage: &str, index: usize, duration_ms: f64) -> Self {
        Self::new("stage.completed")
            .add_data("stage", serde_json::json!(stage))
            .add_data("index", serde_json::json!(index))
            .add_data("duration_ms", serde_json::json!(duration_ms))
    }

    /// Creates a "stage.failed" event.
    #[must_use]
    pub fn stage_failed(stage: &str, index: usize, error: &str) -> Self {
        Self::new("stage.failed")
            .add_data("stage", serde_json::json!(stage))
            .add_data("index", serde_json::json!(index))
            .add_data("error", serde_json::json!(error))
    }

    /// Creates a "pipeline.completed" event.
    #[must_use]
    pub fn pipeline_completed(pipeline: &str, duration_ms: f64) -> Self {
        Self::new("pipeline.completed")
            .add_data("pipeline", serde_json::json!(pipeline))
            .add_data("duration_ms", serde_json::json!(duration_ms))
    }

    /// Creates a "pipeline.failed" event.
    #[must_use]
    pub fn pipeline_failed(pipeline: &str, stage: Option<usize>) -> Self {
        Self::new("pipeline.failed")
            .add_data("pipeline", serde_json::json!(pipeline))
            .add_data("stage", serde_json::json!(stage))
    }
}

//! Error types for the photonsim orchestrator.
//!
//! Errors fall into three families: assembly-time validation
//! ([`PipelineValidationError`]), pre-flight interface checks
//! ([`InterfaceMismatchError`]) and stage failures ([`StageExecutionError`]
//! wrapping a [`StageError`]). [`SimulationError`] aggregates them for callers.

use crate::core::InterfaceTag;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias for results of orchestrator operations.
pub type SimulationResult<T> = Result<T, SimulationError>;

/// The main error type for photonsim operations.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// The pipeline could not be assembled.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// Adjacent stages declare incompatible interfaces.
    #[error("{0}")]
    InterfaceMismatch(#[from] InterfaceMismatchError),

    /// A stage failed while running.
    #[error("{0}")]
    StageExecution(#[from] StageExecutionError),

    /// A completed stage left nothing at its output location.
    #[error("Stage '{stage}' produced no artifact at {}", .path.display())]
    MissingArtifact {
        /// The stage name.
        stage: String,
        /// The expected output location.
        path: PathBuf,
    },

    /// The simulation configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimulationError {
    /// Returns the index of the failing stage, if a stage failed.
    #[must_use]
    pub fn failed_stage(&self) -> Option<usize> {
        match self {
            Self::StageExecution(err) => Some(err.index),
            _ => None,
        }
    }
}

/// Metadata about a contract error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "PIPELINE-001-INTERFACE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when a pipeline cannot be assembled.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the contract error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}

/// One adjacent pair of stages whose declared interfaces disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceMismatch {
    /// Index of the upstream stage.
    pub upstream_index: usize,
    /// Name of the upstream stage.
    pub upstream: String,
    /// Tag the upstream stage produces.
    pub produced: InterfaceTag,
    /// Index of the downstream stage (always `upstream_index + 1`).
    pub downstream_index: usize,
    /// Name of the downstream stage.
    pub downstream: String,
    /// Tag the downstream stage expects.
    pub expected: InterfaceTag,
}

impl std::fmt::Display for InterfaceMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}' (#{}) produces '{}' but '{}' (#{}) expects '{}'",
            self.upstream,
            self.upstream_index,
            self.produced,
            self.downstream,
            self.downstream_index,
            self.expected
        )
    }
}

/// Error raised when the pre-flight interface check fails.
///
/// Always produced before any stage runs.
#[derive(Debug, Clone, Error)]
#[error(
    "Pipeline '{pipeline}' has incompatible stage interfaces: {}",
    join_mismatches(.mismatches)
)]
pub struct InterfaceMismatchError {
    /// The pipeline name.
    pub pipeline: String,
    /// Every offending adjacent pair, in pipeline order.
    pub mismatches: Vec<InterfaceMismatch>,
    /// Contract error info.
    pub error_info: ContractErrorInfo,
}

impl InterfaceMismatchError {
    /// Creates a new interface mismatch error.
    #[must_use]
    pub fn new(pipeline: impl Into<String>, mismatches: Vec<InterfaceMismatch>) -> Self {
        let mut info = ContractErrorInfo::new(
            "PIPELINE-001-INTERFACE",
            format!("{} adjacent stage pair(s) disagree on interface tags", mismatches.len()),
        )
        .with_fix_hint(
            "Reorder the stages, fix the declared tags, or allow the pair explicitly \
             with an interface override.",
        );
        if let Some(first) = mismatches.first() {
            info = info
                .with_context_entry("upstream", first.upstream.clone())
                .with_context_entry("downstream", first.downstream.clone());
        }

        Self {
            pipeline: pipeline.into(),
            mismatches,
            error_info: info,
        }
    }

    /// Returns the first offending pair.
    #[must_use]
    pub fn first(&self) -> Option<&InterfaceMismatch> {
        self.mismatches.first()
    }
}

fn join_mismatches(mismatches: &[InterfaceMismatch]) -> String {
    mismatches
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error raised when a stage's parameters do not fit its computation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// The stage does not recognize a supplied parameter.
    #[error("Stage '{stage}' does not recognize parameter '{key}'")]
    UnknownParameter {
        /// The stage name.
        stage: String,
        /// The offending key.
        key: String,
    },

    /// A parameter has the wrong JSON type.
    #[error("Parameter '{key}' of stage '{stage}' expects {expected}, got {actual}")]
    InvalidType {
        /// The stage name.
        stage: String,
        /// The offending key.
        key: String,
        /// The expected type.
        expected: &'static str,
        /// The supplied type.
        actual: &'static str,
    },

    /// A parameter has the right type but an unusable value.
    #[error("Parameter '{key}' of stage '{stage}' is invalid: {reason}")]
    InvalidValue {
        /// The stage name.
        stage: String,
        /// The offending key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A required parameter has no value and no default.
    #[error("Stage '{stage}' requires parameter '{key}'")]
    MissingParameter {
        /// The stage name.
        stage: String,
        /// The missing key.
        key: String,
    },
}

/// Errors a stage may return from `run`.
#[derive(Debug, Error)]
pub enum StageError {
    /// The stage parameters are invalid.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The stage needs an input location but none was wired.
    #[error("Stage '{stage}' has no input location wired")]
    Unwired {
        /// The stage name.
        stage: String,
    },

    /// The wired input location does not exist.
    #[error("Input not found at {}", .0.display())]
    MissingInput(PathBuf),

    /// IO error while reading inputs or writing outputs.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The computation itself failed.
    #[error("Computation failed: {0}")]
    Computation(String),

    /// An external tool or library failed.
    #[error(transparent)]
    External(#[from] anyhow::Error),
}

impl StageError {
    /// Creates a computation error.
    #[must_use]
    pub fn computation(message: impl Into<String>) -> Self {
        Self::Computation(message.into())
    }
}

/// Error raised when a stage fails; terminal for the pipeline run.
#[derive(Debug, Error)]
#[error("Stage '{stage}' (#{index}, {input_tag} -> {output_tag}) failed: {cause}")]
pub struct StageExecutionError {
    /// The failing stage name.
    pub stage: String,
    /// The failing stage index.
    pub index: usize,
    /// The stage's declared input tag.
    pub input_tag: InterfaceTag,
    /// The stage's declared output tag.
    pub output_tag: InterfaceTag,
    /// The underlying failure.
    #[source]
    pub cause: StageError,
}

//! Simulation configuration.
//!
//! A [`SimulationConfig`] carries everything about a run that is not a stage:
//! the pipeline name, run options, logging setup and interface overrides.
//! It is usually loaded from a JSON file next to the experiment inputs.

use crate::errors::{SimulationError, SimulationResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration of a simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// The pipeline name.
    #[serde(default = "default_name")]
    pub name: String,
    /// Check that every stage left an artifact at its output location.
    #[serde(default)]
    pub verify_artifacts: bool,
    /// Remove stale artifacts at every output location before running.
    #[serde(default)]
    pub clean_before_run: bool,
    /// Logging setup.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Adjacent stage pairs whose tag comparison is waived.
    #[serde(default)]
    pub interface_overrides: Vec<InterfaceOverrideConfig>,
}

fn default_name() -> String {
    "photon-experiment".to_string()
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            verify_artifacts: false,
            clean_before_run: false,
            logging: LoggingConfig::default(),
            interface_overrides: Vec::new(),
        }
    }
}

impl SimulationConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pipeline name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Waives the tag comparison between two adjacent stages.
    #[must_use]
    pub fn with_interface_override(
        mut self,
        upstream: impl Into<String>,
        downstream: impl Into<String>,
    ) -> Self {
        self.interface_overrides.push(InterfaceOverrideConfig {
            upstream: upstream.into(),
            downstream: downstream.into(),
        });
        self
    }

    /// Parses a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Serialization`] on malformed JSON.
    pub fn from_json_str(json: &str) -> SimulationResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Config`] if the file cannot be read, or
    /// [`SimulationError::Serialization`] on malformed JSON.
    pub fn from_file(path: impl AsRef<Path>) -> SimulationResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|err| {
            SimulationError::Config(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_json_str(&json)
    }
}

/// Logging setup applied by [`init_logging`](crate::observability::init_logging).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset (e.g., "info").
    #[serde(default = "default_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable multi-field lines.
    #[default]
    Full,
    /// Abbreviated single-line output.
    Compact,
    /// Newline-delimited JSON.
    Json,
}

/// One waived adjacent pair, by stage name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterfaceOverrideConfig {
    /// The upstream stage name.
    pub upstream: String,
    /// The downstream stage name.
    pub downstream: String,
}

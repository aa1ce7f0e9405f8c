//! Per-stage execution status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The execution status of a stage within one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage has not started yet.
    Pending,
    /// Stage is currently running.
    Running,
    /// Stage ran and produced its artifact.
    Completed,
    /// Stage ran and failed.
    Failed,
    /// Stage never ran because an earlier stage failed.
    Skipped,
}

impl Default for StageStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }

    /// Returns true if the stage's `run` was invoked.
    #[must_use]
    pub fn was_invoked(&self) -> bool {
        matches!(self, Self::Running | Self::Completed | Self::Failed)
    }
}

//! Orchestrator lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a pipeline is in its check-then-run lifecycle.
///
/// `Unchecked -> Consistent | Inconsistent`; a run moves through
/// `Running { stage }` for each stage and ends in `Completed` or `Failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    /// The interface check has not been performed.
    #[default]
    Unchecked,
    /// All adjacent interfaces agree.
    Consistent,
    /// At least one adjacent pair disagrees.
    Inconsistent,
    /// The stage at this index is executing.
    Running {
        /// Index of the running stage.
        stage: usize,
    },
    /// Every stage completed.
    Completed,
    /// The run stopped early.
    Failed {
        /// Index of the failing stage; `None` if the run stopped before any
        /// stage started (interface mismatch or pre-run cleanup).
        stage: Option<usize>,
    },
}

impl PipelineState {
    /// Returns true if the last run has finished, successfully or not.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed { .. })
    }

    /// Returns true once the interface check has been performed.
    #[must_use]
    pub fn is_checked(&self) -> bool {
        !matches!(self, Self::Unchecked)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchecked => write!(f, "unchecked"),
            Self::Consistent => write!(f, "consistent"),
            Self::Inconsistent => write!(f, "inconsistent"),
            Self::Running { stage } => write!(f, "running({stage})"),
            Self::Completed => write!(f, "completed"),
            Self::Failed { stage: Some(stage) } => write!(f, "failed({stage})"),
            Self::Failed { stage: None } => write!(f, "failed(pre-flight)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert_eq!(PipelineState::default(), PipelineState::Unchecked);
        assert!(!PipelineState::Unchecked.is_checked());
        assert!(PipelineState::Inconsistent.is_checked());
        assert!(PipelineState::Failed { stage: None }.is_terminal());
        assert!(!PipelineState::Running { stage: 3 }.is_terminal());
    }

    #[test]
    fn test_state_display_and_serialize() {
        assert_eq!(PipelineState::Running { stage: 2 }.to_string(), "running(2)");
        assert_eq!(PipelineState::Failed { stage: None }.to_string(), "failed(pre-flight)");

        let json = serde_json::to_value(PipelineState::Failed { stage: Some(2) }).unwrap();
        assert_eq!(json, serde_json::json!({"state": "failed", "stage": 2}));
    }
}

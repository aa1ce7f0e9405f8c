//! Per-run record of what each stage did.

use super::StageWiring;
use crate::core::{Artifact, StageStatus};
use crate::utils::Timestamp;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// What happened to one stage during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Position in the pipeline.
    pub index: usize,
    /// Stage name.
    pub name: String,
    /// Final status.
    pub status: StageStatus,
    /// Resolved input location.
    pub input_location: Option<PathBuf>,
    /// Resolved output location.
    pub output_location: PathBuf,
    /// The artifact the stage returned, if it completed.
    pub artifact: Option<Artifact>,
    /// Wall-clock time spent in `run`, if invoked.
    pub duration_ms: Option<f64>,
    /// Error message, if the stage failed or its artifact failed verification.
    pub error: Option<String>,
}

impl StageRecord {
    /// Creates a pending record from the stage's wiring.
    #[must_use]
    pub fn pending(index: usize, name: impl Into<String>, wiring: &StageWiring) -> Self {
        Self {
            index,
            name: name.into(),
            status: StageStatus::Pending,
            input_location: wiring.input_location.clone(),
            output_location: wiring.output_location.clone(),
            artifact: None,
            duration_ms: None,
            error: None,
        }
    }
}

/// The outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Pipeline name.
    pub pipeline: String,
    /// Unique run identifier.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: Timestamp,
    /// Total wall-clock time.
    pub duration_ms: f64,
    /// One record per stage, in pipeline order.
    pub records: Vec<StageRecord>,
}

impl RunReport {
    /// Returns true if every stage completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.records.iter().all(|r| r.status == StageStatus::Completed)
    }

    /// Returns the artifacts of completed stages, in order.
    #[must_use]
    pub fn artifacts(&self) -> Vec<&Artifact> {
        self.records.iter().filter_map(|r| r.artifact.as_ref()).collect()
    }

    /// Returns the names of stages whose `run` was invoked.
    #[must_use]
    pub fn executed_stages(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.status.was_invoked())
            .map(|r| r.name.as_str())
            .collect()
    }

    /// Returns the record of a stage by name.
    #[must_use]
    pub fn record(&self, name: &str) -> Option<&StageRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Returns the first failed record.
    #[must_use]
    pub fn failure(&self) -> Option<&StageRecord> {
        self.records.iter().find(|r| r.status == StageStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wiring(output: &str) -> StageWiring {
        StageWiring {
            input_location: None,
            output_location: PathBuf::from(output),
        }
    }

    #[test]
    fn test_report_queries() {
        let mut done = StageRecord::pending(0, "source", &wiring("a.h5"));
        done.status = StageStatus::Completed;
        done.artifact = Some(Artifact::file("a.h5"));
        let mut failed = StageRecord::pending(1, "prop", &wiring("b.h5"));
        failed.status = StageStatus::Failed;
        failed.error = Some("boom".to_string());
        let mut skipped = StageRecord::pending(2, "pmi", &wiring("pmi"));
        skipped.status = StageStatus::Skipped;

        let report = RunReport {
            pipeline: "s2e".to_string(),
            run_id: Uuid::new_v4(),
            started_at: crate::utils::now_utc(),
            duration_ms: 1.0,
            records: vec![done, failed, skipped],
        };

        assert!(!report.is_success());
        assert_eq!(report.artifacts().len(), 1);
        assert_eq!(report.executed_stages(), vec!["source", "prop"]);
        assert_eq!(report.failure().map(|r| r.index), Some(1));
        assert_eq!(report.record("pmi").map(|r| r.status), Some(StageStatus::Skipped));
    }
}

//! The sequential pipeline orchestrator.

use super::consistency::{find_interface_mismatches, InterfaceOverrides};
use super::report::{RunReport, StageRecord};
use super::state::PipelineState;
use super::wiring::StageWiring;
use super::PipelineBuilder;
use crate::config::SimulationConfig;
use crate::core::{Artifact, PipelineEvent, StageStatus};
use crate::errors::{
    InterfaceMismatch, InterfaceMismatchError, SimulationError, SimulationResult,
    StageExecutionError,
};
use crate::events::EventSink;
use crate::observability::SpanTimer;
use crate::stages::{Stage, StageContext};
use crate::utils::{generate_uuid, now_utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::Arc;
use tracing::{debug, debug_span, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Options controlling a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// After completing, check that every stage left an artifact at its
    /// output location. Off by default.
    pub verify_artifacts: bool,
    /// Remove stale artifacts at every output location before running.
    pub clean_before_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            verify_artifacts: false,
            clean_before_run: false,
        }
    }
}

impl From<&SimulationConfig> for RunOptions {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            verify_artifacts: config.verify_artifacts,
            clean_before_run: config.clean_before_run,
        }
    }
}

/// An ordered, validated sequence of stages.
///
/// Built once by [`PipelineBuilder`]. The interface check runs before any
/// stage and its result is cached, since descriptors never change. Stages
/// run strictly one after another; the first failure stops the run.
pub struct Pipeline {
    name: String,
    stages: Vec<Arc<dyn Stage>>,
    wiring: Vec<StageWiring>,
    overrides: InterfaceOverrides,
    sink: Arc<dyn EventSink>,
    options: RunOptions,
    state: PipelineState,
    mismatches: Option<Vec<InterfaceMismatch>>,
    last_report: Option<RunReport>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stages", &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("state", &self.state)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub(crate) fn new(
        name: String,
        stages: Vec<Arc<dyn Stage>>,
        wiring: Vec<StageWiring>,
        overrides: InterfaceOverrides,
        sink: Arc<dyn EventSink>,
        options: RunOptions,
    ) -> Self {
        Self {
            name,
            stages,
            wiring,
            overrides,
            sink,
            options,
            state: PipelineState::Unchecked,
            mismatches: None,
            last_report: None,
        }
    }

    /// Starts building a pipeline.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> PipelineBuilder {
        PipelineBuilder::new(name)
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the pipeline has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Returns the stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[Arc<dyn Stage>] {
        &self.stages
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Returns the resolved wiring, one entry per stage.
    #[must_use]
    pub fn wiring(&self) -> &[StageWiring] {
        &self.wiring
    }

    /// Returns the waived adjacent pairs.
    #[must_use]
    pub fn overrides(&self) -> &InterfaceOverrides {
        &self.overrides
    }

    /// Returns the run options.
    #[must_use]
    pub fn options(&self) -> RunOptions {
        self.options
    }

    /// Returns the report of the most recent run.
    #[must_use]
    pub fn last_report(&self) -> Option<&RunReport> {
        self.last_report.as_ref()
    }

    /// Recomputes the offending adjacent pairs without touching state.
    #[must_use]
    pub fn interface_mismatches(&self) -> Vec<InterfaceMismatch> {
        find_interface_mismatches(&self.stages, &self.overrides)
    }

    /// Performs the interface check and records the result.
    ///
    /// Never runs a stage. Repeated calls return the cached answer.
    pub fn check_interface_consistency(&mut self) -> bool {
        self.ensure_checked().is_empty()
    }

    /// Like [`Pipeline::check_interface_consistency`], but returns the
    /// offending pairs as an error.
    ///
    /// # Errors
    ///
    /// Returns [`InterfaceMismatchError`] listing every offending pair.
    pub fn check(&mut self) -> Result<(), InterfaceMismatchError> {
        let mismatches = self.ensure_checked();
        if mismatches.is_empty() {
            Ok(())
        } else {
            Err(InterfaceMismatchError::new(&self.name, mismatches))
        }
    }

    /// Runs every stage in order.
    ///
    /// Checks interfaces first; on a mismatch no stage runs. Each stage's
    /// `run` completes before the next one starts. The report is kept on
    /// the pipeline whether the run succeeds or fails.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InterfaceMismatch`] before any stage runs,
    /// [`SimulationError::StageExecution`] for the first failing stage, or
    /// [`SimulationError::MissingArtifact`] if verification is enabled and a
    /// stage left nothing behind. Verification runs after the pipeline has
    /// reached [`PipelineState::Completed`] and does not change the state.
    pub async fn run(&mut self) -> SimulationResult<RunReport> {
        let run_id = generate_uuid();
        let span = info_span!(
            "pipeline.run",
            pipeline = %self.name,
            run_id = %run_id,
            stages = self.stages.len()
        );
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&mut self, run_id: Uuid) -> SimulationResult<RunReport> {
        let timer = SpanTimer::start(format!("pipeline.{}", self.name));
        let started_at = now_utc();
        let mut records: Vec<StageRecord> = self
            .stages
            .iter()
            .zip(&self.wiring)
            .enumerate()
            .map(|(index, (stage, wiring))| StageRecord::pending(index, stage.name(), wiring))
            .collect();

        let mismatches = self.ensure_checked();
        if !mismatches.is_empty() {
            mark_skipped(&mut records);
            self.finish_report(run_id, started_at, timer.finish(), records);
            return Err(self.fail(None, InterfaceMismatchError::new(&self.name, mismatches).into()));
        }

        if self.options.clean_before_run {
            if let Err(err) = self.remove_artifacts() {
                mark_skipped(&mut records);
                self.finish_report(run_id, started_at, timer.finish(), records);
                return Err(self.fail(None, err));
            }
        }

        let mut failure = None;
        for (index, (stage, wiring)) in self.stages.iter().zip(&self.wiring).enumerate() {
            self.state = PipelineState::Running { stage: index };
            records[index].status = StageStatus::Running;
            self.sink.emit(&PipelineEvent::stage_started(stage.name(), index));
            debug!(stage = %stage.name(), index, input = ?wiring.input_location, "Starting stage");

            let ctx = StageContext::new(
                self.name.clone(),
                run_id,
                stage.name(),
                index,
                wiring.input_location.clone(),
                wiring.output_location.clone(),
            );
            let stage_timer = SpanTimer::start(stage.name());
            let result = stage
                .run(&ctx)
                .instrument(debug_span!("stage.run", stage = %stage.name(), index))
                .await;
            let duration_ms = stage_timer.finish();
            records[index].duration_ms = Some(duration_ms);

            match result {
                Ok(artifact) => {
                    info!(stage = %stage.name(), index, duration_ms, path = %artifact.path.display(), "Stage completed");
                    records[index].status = StageStatus::Completed;
                    records[index].artifact = Some(artifact);
                    self.sink
                        .emit(&PipelineEvent::stage_completed(stage.name(), index, duration_ms));
                }
                Err(cause) => {
                    error!(stage = %stage.name(), index, error = %cause, "Stage failed");
                    records[index].status = StageStatus::Failed;
                    records[index].error = Some(cause.to_string());
                    self.sink
                        .emit(&PipelineEvent::stage_failed(stage.name(), index, &cause.to_string()));
                    failure = Some(StageExecutionError {
                        stage: stage.name().to_string(),
                        index,
                        input_tag: stage.input_tag().clone(),
                        output_tag: stage.output_tag().clone(),
                        cause,
                    });
                    break;
                }
            }
        }

        if let Some(err) = failure {
            let index = err.index;
            mark_skipped(&mut records);
            self.finish_report(run_id, started_at, timer.finish(), records);
            return Err(self.fail(Some(index), err.into()));
        }

        let duration_ms = timer.finish();
        self.state = PipelineState::Completed;
        self.sink
            .emit(&PipelineEvent::pipeline_completed(&self.name, duration_ms));
        info!(pipeline = %self.name, duration_ms, "Pipeline completed");

        if self.options.verify_artifacts {
            if let Err((index, err)) = self.verify_each() {
                warn!(pipeline = %self.name, index, error = %err, "Artifact verification failed");
                records[index].error = Some(err.to_string());
                self.finish_report(run_id, started_at, duration_ms, records);
                return Err(err);
            }
        }

        Ok(self.finish_report(run_id, started_at, duration_ms, records))
    }

    /// Inspects the artifact at every output location.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::MissingArtifact`] for the first stage with
    /// nothing at its output location.
    pub fn verify_artifacts(&self) -> SimulationResult<Vec<Artifact>> {
        self.verify_each().map_err(|(_, err)| err)
    }

    /// Removes the artifact at every output location.
    ///
    /// Missing artifacts are skipped. Links are removed, not their targets.
    ///
    /// # Errors
    ///
    /// Returns the first IO error encountered.
    pub fn remove_artifacts(&self) -> SimulationResult<()> {
        for wiring in &self.wiring {
            match Artifact::inspect(wiring.output()) {
                Ok(artifact) => {
                    debug!(path = %artifact.path.display(), kind = ?artifact.kind, "Removing artifact");
                    artifact.remove()?;
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    fn verify_each(&self) -> Result<Vec<Artifact>, (usize, SimulationError)> {
        self.stages
            .iter()
            .zip(&self.wiring)
            .enumerate()
            .map(|(index, (stage, wiring))| {
                Artifact::inspect(wiring.output()).map_err(|err| {
                    let err = if err.kind() == io::ErrorKind::NotFound {
                        SimulationError::MissingArtifact {
                            stage: stage.name().to_string(),
                            path: wiring.output_location.clone(),
                        }
                    } else {
                        err.into()
                    };
                    (index, err)
                })
            })
            .collect()
    }

    fn ensure_checked(&mut self) -> Vec<InterfaceMismatch> {
        if let Some(cached) = &self.mismatches {
            return cached.clone();
        }

        let mismatches = find_interface_mismatches(&self.stages, &self.overrides);
        let consistent = mismatches.is_empty();
        self.state = if consistent {
            PipelineState::Consistent
        } else {
            PipelineState::Inconsistent
        };
        self.sink.emit(&PipelineEvent::checked(&self.name, consistent));

        if !consistent {
            for mismatch in &mismatches {
                warn!(pipeline = %self.name, "Interface mismatch: {mismatch}");
            }
            let pairs: Vec<(String, String)> = mismatches
                .iter()
                .map(|m| (m.upstream.clone(), m.downstream.clone()))
                .collect();
            self.sink
                .emit(&PipelineEvent::interface_mismatch(&self.name, &pairs));
        }

        self.mismatches = Some(mismatches.clone());
        mismatches
    }

    fn fail(&mut self, stage: Option<usize>, err: SimulationError) -> SimulationError {
        self.state = PipelineState::Failed { stage };
        self.sink.emit(&PipelineEvent::pipeline_failed(&self.name, stage));
        error!(pipeline = %self.name, stage = ?stage, error = %err, "Pipeline failed");
        err
    }

    fn finish_report(
        &mut self,
        run_id: Uuid,
        started_at: crate::utils::Timestamp,
        duration_ms: f64,
        records: Vec<StageRecord>,
    ) -> RunReport {
        let report = RunReport {
            pipeline: self.name.clone(),
            run_id,
            started_at,
            duration_ms,
            records,
        };
        self.last_report = Some(report.clone());
        report
    }
}

fn mark_skipped(records: &mut [StageRecord]) {
    for record in records.iter_mut().filter(|r| r.status == StageStatus::Pending) {
        record.status = StageStatus::Skipped;
    }
}

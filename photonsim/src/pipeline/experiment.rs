//! Assembly of a full six-role photon experiment.

use super::orchestrator::{Pipeline, RunOptions};
use super::PipelineBuilder;
use crate::config::SimulationConfig;
use crate::core::StageRole;
use crate::errors::{ContractErrorInfo, PipelineValidationError};
use crate::events::EventSink;
use crate::stages::Stage;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds a pipeline with exactly one stage per [`StageRole`].
///
/// Stages are placed in canonical role order no matter the order they are
/// supplied in. Supplying a role twice replaces the earlier stage. Each
/// stage must declare the tags of its role; chains of stages with other
/// tags belong in a plain [`PipelineBuilder`].
#[derive(Debug, Clone)]
pub struct ExperimentBuilder {
    pipeline: PipelineBuilder,
    roles: BTreeMap<StageRole, Arc<dyn Stage>>,
}

impl ExperimentBuilder {
    /// Creates a new experiment builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_pipeline(PipelineBuilder::new(name))
    }

    /// Creates an experiment builder from a simulation configuration.
    #[must_use]
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::with_pipeline(PipelineBuilder::from_config(config))
    }

    fn with_pipeline(pipeline: PipelineBuilder) -> Self {
        Self {
            pipeline,
            roles: BTreeMap::new(),
        }
    }

    /// Fills a role slot.
    #[must_use]
    pub fn with_role(mut self, role: StageRole, stage: Arc<dyn Stage>) -> Self {
        self.roles.insert(role, stage);
        self
    }

    /// Sets the photon source.
    #[must_use]
    pub fn source(self, stage: Arc<dyn Stage>) -> Self {
        self.with_role(StageRole::Source, stage)
    }

    /// Sets the beamline propagator.
    #[must_use]
    pub fn propagator(self, stage: Arc<dyn Stage>) -> Self {
        self.with_role(StageRole::Propagator, stage)
    }

    /// Sets the photon-matter interactor.
    #[must_use]
    pub fn interactor(self, stage: Arc<dyn Stage>) -> Self {
        self.with_role(StageRole::Interactor, stage)
    }

    /// Sets the diffractor.
    #[must_use]
    pub fn diffractor(self, stage: Arc<dyn Stage>) -> Self {
        self.with_role(StageRole::Diffractor, stage)
    }

    /// Sets the detector.
    #[must_use]
    pub fn detector(self, stage: Arc<dyn Stage>) -> Self {
        self.with_role(StageRole::Detector, stage)
    }

    /// Sets the analyzer.
    #[must_use]
    pub fn analyzer(self, stage: Arc<dyn Stage>) -> Self {
        self.with_role(StageRole::Analyzer, stage)
    }

    /// Waives the tag comparison between two adjacent stages.
    #[must_use]
    pub fn allow_interface(
        mut self,
        upstream: impl Into<String>,
        downstream: impl Into<String>,
    ) -> Self {
        self.pipeline = self.pipeline.allow_interface(upstream, downstream);
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.pipeline = self.pipeline.with_event_sink(sink);
        self
    }

    /// Sets the run options.
    #[must_use]
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.pipeline = self.pipeline.with_options(options);
        self
    }

    /// Returns the roles not yet filled, in canonical order.
    #[must_use]
    pub fn missing_roles(&self) -> Vec<StageRole> {
        StageRole::CANONICAL
            .into_iter()
            .filter(|role| !self.roles.contains_key(role))
            .collect()
    }

    /// Builds the pipeline in canonical role order.
    ///
    /// # Errors
    ///
    /// Returns an error listing every missing role, an error listing every
    /// stage whose declared tags differ from its role's, or any error from
    /// [`PipelineBuilder::build`].
    pub fn build(self) -> Result<Pipeline, PipelineValidationError> {
        let missing = self.missing_roles();
        if !missing.is_empty() {
            let names: Vec<String> = missing.iter().map(ToString::to_string).collect();
            return Err(PipelineValidationError::new(format!(
                "Experiment '{}' is missing roles: {}",
                self.pipeline.name(),
                names.join(", ")
            ))
            .with_error_info(
                ContractErrorInfo::new("PIPELINE-003-MISSING_ROLE", "Incomplete experiment")
                    .with_fix_hint("Supply one stage for each of the six experiment roles.")
                    .with_context_entry("missing", names.join(",")),
            ));
        }

        let misfits: Vec<(StageRole, &Arc<dyn Stage>)> = self
            .roles
            .iter()
            .filter(|(role, stage)| {
                *stage.input_tag() != role.input_tag() || *stage.output_tag() != role.output_tag()
            })
            .map(|(role, stage)| (*role, stage))
            .collect();
        if !misfits.is_empty() {
            let described: Vec<String> = misfits
                .iter()
                .map(|(role, stage)| {
                    format!(
                        "{role} '{}' ({} -> {}, expected {} -> {})",
                        stage.name(),
                        stage.input_tag(),
                        stage.output_tag(),
                        role.input_tag(),
                        role.output_tag()
                    )
                })
                .collect();
            let stages = misfits.iter().map(|(_, stage)| stage.name().to_string()).collect();
            return Err(PipelineValidationError::new(format!(
                "Experiment '{}' has stages of the wrong kind: {}",
                self.pipeline.name(),
                described.join("; ")
            ))
            .with_stages(stages)
            .with_error_info(
                ContractErrorInfo::new("PIPELINE-006-ROLE_KIND", "Stage does not fit its role")
                    .with_fix_hint("Give each role a stage declaring that role's input and output tags."),
            ));
        }

        let mut pipeline = self.pipeline;
        for stage in self.roles.into_values() {
            pipeline.add_stage(stage)?;
        }
        pipeline.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::StageDescriptor;
    use crate::testing::MockStage;

    fn role_stage(role: StageRole) -> Arc<dyn Stage> {
        let name = role.to_string();
        Arc::new(MockStage::new(StageDescriptor::for_role(role, name.clone(), name)))
    }

    #[test]
    fn test_roles_placed_in_canonical_order() {
        let mut builder = ExperimentBuilder::new("s2e");
        for role in StageRole::CANONICAL.into_iter().rev() {
            builder = builder.with_role(role, role_stage(role));
        }

        let mut pipeline = builder.build().unwrap();
        assert_eq!(
            pipeline.stage_names(),
            vec!["source", "propagator", "interactor", "diffractor", "detector", "analyzer"]
        );
        assert!(pipeline.check_interface_consistency());
    }

    #[test]
    fn test_missing_roles_reported() {
        let err = ExperimentBuilder::new("s2e")
            .source(role_stage(StageRole::Source))
            .diffractor(role_stage(StageRole::Diffractor))
            .build()
            .unwrap_err();

        assert_eq!(err.code(), Some("PIPELINE-003-MISSING_ROLE"));
        assert!(err.message.contains("propagator, interactor, detector, analyzer"));
    }

    #[test]
    fn test_stage_of_wrong_kind_rejected() {
        let mut builder = ExperimentBuilder::new("s2e");
        for role in StageRole::CANONICAL {
            builder = builder.with_role(role, role_stage(role));
        }
        let misfit: Arc<dyn Stage> = Arc::new(MockStage::new(StageDescriptor::for_role(
            StageRole::Propagator,
            "wavefront_propagator",
            "prop",
        )));

        let err = builder.diffractor(misfit).build().unwrap_err();
        assert_eq!(err.code(), Some("PIPELINE-006-ROLE_KIND"));
        assert_eq!(err.stages, vec!["wavefront_propagator".to_string()]);
        assert!(err.message.contains("diffractor 'wavefront_propagator'"));
    }

    #[test]
    fn test_duplicate_names_across_roles_rejected() {
        let shared = |role| -> Arc<dyn Stage> {
            Arc::new(MockStage::new(StageDescriptor::for_role(role, "same", "out")))
        };
        let mut builder = ExperimentBuilder::new("s2e");
        for role in StageRole::CANONICAL {
            builder = builder.with_role(role, shared(role));
        }

        let err = builder.build().unwrap_err();
        assert_eq!(err.code(), Some("PIPELINE-002-DUPLICATE"));
    }
}

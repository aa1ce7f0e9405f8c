//! Pipeline builder with validation.

use super::consistency::InterfaceOverrides;
use super::orchestrator::{Pipeline, RunOptions};
use super::wiring::resolve_wiring;
use crate::config::SimulationConfig;
use crate::errors::{ContractErrorInfo, PipelineValidationError};
use crate::events::{EventSink, NoOpEventSink};
use crate::stages::Stage;
use std::sync::Arc;

/// Builder for creating validated pipelines.
///
/// Stages run in the order they are added. Wiring is resolved once, in
/// [`PipelineBuilder::build`].
#[derive(Clone)]
pub struct PipelineBuilder {
    /// The pipeline name.
    name: String,
    /// The stages in execution order.
    stages: Vec<Arc<dyn Stage>>,
    /// Waived adjacent pairs.
    overrides: InterfaceOverrides,
    /// Where lifecycle events go.
    sink: Option<Arc<dyn EventSink>>,
    /// Run options.
    options: RunOptions,
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("name", &self.name)
            .field("stages", &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("overrides", &self.overrides)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            overrides: InterfaceOverrides::new(),
            sink: None,
            options: RunOptions::default(),
        }
    }

    /// Creates a builder from a simulation configuration.
    ///
    /// Applies the name, run options and interface overrides.
    #[must_use]
    pub fn from_config(config: &SimulationConfig) -> Self {
        let mut builder = Self::new(config.name.clone()).with_options(RunOptions::from(config));
        for pair in &config.interface_overrides {
            builder.overrides.allow(pair.upstream.clone(), pair.downstream.clone());
        }
        builder
    }

    /// Appends a stage.
    ///
    /// # Errors
    ///
    /// Returns an error if a stage with the same name was already added.
    pub fn stage(mut self, stage: Arc<dyn Stage>) -> Result<Self, PipelineValidationError> {
        self.add_stage(stage)?;
        Ok(self)
    }

    /// Appends a stage in place.
    ///
    /// # Errors
    ///
    /// Returns an error if a stage with the same name was already added.
    pub fn add_stage(&mut self, stage: Arc<dyn Stage>) -> Result<(), PipelineValidationError> {
        let name = stage.name();
        if self.stages.iter().any(|s| s.name() == name) {
            return Err(PipelineValidationError::new(format!(
                "Stage '{name}' is already part of pipeline '{}'",
                self.name
            ))
            .with_stages(vec![name.to_string()])
            .with_error_info(
                ContractErrorInfo::new(
                    "PIPELINE-002-DUPLICATE",
                    format!("Duplicate stage name '{name}'"),
                )
                .with_fix_hint("Give every stage in a pipeline a unique name."),
            ));
        }

        self.stages.push(stage);
        Ok(())
    }

    /// Waives the tag comparison between two adjacent stages.
    #[must_use]
    pub fn allow_interface(
        mut self,
        upstream: impl Into<String>,
        downstream: impl Into<String>,
    ) -> Self {
        self.overrides.allow(upstream, downstream);
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets the run options.
    #[must_use]
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the pipeline.
    ///
    /// An empty pipeline is valid and completes without running anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipeline or a stage has a blank name, or an
    /// override names a pair of stages that are not adjacent.
    pub fn build(self) -> Result<Pipeline, PipelineValidationError> {
        if self.name.trim().is_empty() {
            return Err(empty_name_error("Pipeline name must not be empty", Vec::new()));
        }
        if let Some(index) = self.stages.iter().position(|s| s.name().trim().is_empty()) {
            return Err(empty_name_error(
                &format!("Stage #{index} of pipeline '{}' has an empty name", self.name),
                Vec::new(),
            ));
        }

        for (upstream, downstream) in self.overrides.iter() {
            let adjacent = self
                .stages
                .windows(2)
                .any(|pair| pair[0].name() == upstream && pair[1].name() == downstream);
            if !adjacent {
                return Err(PipelineValidationError::new(format!(
                    "Interface override '{upstream}' -> '{downstream}' does not name adjacent stages"
                ))
                .with_stages(vec![upstream.to_string(), downstream.to_string()])
                .with_error_info(
                    ContractErrorInfo::new(
                        "PIPELINE-005-UNKNOWN_OVERRIDE",
                        "Override refers to a pair that never meets",
                    )
                    .with_fix_hint("Name the upstream stage first and make sure the two stages are adjacent.")
                    .with_context_entry("upstream", upstream)
                    .with_context_entry("downstream", downstream),
                ));
            }
        }

        let wiring = resolve_wiring(&self.stages);
        let sink = self.sink.unwrap_or_else(|| Arc::new(NoOpEventSink));
        Ok(Pipeline::new(
            self.name,
            self.stages,
            wiring,
            self.overrides,
            sink,
            self.options,
        ))
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages added so far.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

fn empty_name_error(message: &str, stages: Vec<String>) -> PipelineValidationError {
    PipelineValidationError::new(message)
        .with_stages(stages)
        .with_error_info(
            ContractErrorInfo::new("PIPELINE-004-EMPTY_NAME", "Blank name")
                .with_fix_hint("Use a non-empty name for the pipeline and for every stage."),
        )
}

//! Per-invocation context handed to a stage.

use crate::errors::StageError;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// What a stage sees when it runs: its resolved locations and run identity.
///
/// The input location is resolved by the orchestrator from the pipeline
/// wiring. The stage only reads from it and only writes to its output location.
#[derive(Debug, Clone)]
pub struct StageContext {
    pipeline: String,
    run_id: Uuid,
    stage: String,
    index: usize,
    input_location: Option<PathBuf>,
    output_location: PathBuf,
}

impl StageContext {
    /// Creates a new stage context.
    #[must_use]
    pub fn new(
        pipeline: impl Into<String>,
        run_id: Uuid,
        stage: impl Into<String>,
        index: usize,
        input_location: Option<PathBuf>,
        output_location: impl Into<PathBuf>,
    ) -> Self {
        Self {
            pipeline: pipeline.into(),
            run_id,
            stage: stage.into(),
            index,
            input_location,
            output_location: output_location.into(),
        }
    }

    /// The owning pipeline name.
    #[must_use]
    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    /// The run identifier.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// The stage name.
    #[must_use]
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// The stage's position in the pipeline.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The resolved input location, if any.
    #[must_use]
    pub fn input_location(&self) -> Option<&Path> {
        self.input_location.as_deref()
    }

    /// Where the stage must write its artifact.
    #[must_use]
    pub fn output_location(&self) -> &Path {
        &self.output_location
    }

    /// Returns the input location, failing if none is wired or it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::Unwired`] or [`StageError::MissingInput`].
    pub fn require_input(&self) -> Result<&Path, StageError> {
        let input = self.input_location().ok_or_else(|| StageError::Unwired {
            stage: self.stage.clone(),
        })?;
        if std::fs::symlink_metadata(input).is_err() {
            return Err(StageError::MissingInput(input.to_path_buf()));
        }
        Ok(input)
    }
}

//! Mock stages for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::PathBuf;

use crate::core::{Artifact, InterfaceTag};
use crate::errors::StageError;
use crate::stages::{Parameters, Stage, StageContext, StageDescriptor};

/// A mock stage that records calls and optionally fails.
///
/// By default `run` returns a file artifact at the output location without
/// touching the filesystem; [`MockStage::writing`] makes it create the file.
#[derive(Debug)]
pub struct MockStage {
    descriptor: StageDescriptor,
    defaults: Parameters,
    writes_output: bool,
    failure: Mutex<Option<String>>,
    call_count: Mutex<usize>,
    inputs: Mutex<Vec<Option<PathBuf>>>,
}

impl MockStage {
    /// Creates a new mock stage that succeeds.
    #[must_use]
    pub fn new(descriptor: StageDescriptor) -> Self {
        Self {
            descriptor,
            defaults: Parameters::new(),
            writes_output: false,
            failure: Mutex::new(None),
            call_count: Mutex::new(0),
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Creates a mock with the given tags, writing to a location named after it.
    #[must_use]
    pub fn tagged(
        name: impl Into<String>,
        input_tag: impl Into<InterfaceTag>,
        output_tag: impl Into<InterfaceTag>,
    ) -> Self {
        let name = name.into();
        let output = PathBuf::from(format!("{name}.out"));
        Self::new(StageDescriptor::new(name, input_tag, output_tag, output))
    }

    /// Makes every call fail with a computation error.
    #[must_use]
    pub fn failing(self, message: impl Into<String>) -> Self {
        self.set_failure(Some(message.into()));
        self
    }

    /// Makes every call write a small file at the output location.
    #[must_use]
    pub fn writing(mut self) -> Self {
        self.writes_output = true;
        self
    }

    /// Declares the parameters this stage recognizes.
    #[must_use]
    pub fn with_defaults(mut self, defaults: Parameters) -> Self {
        self.defaults = defaults;
        self
    }

    /// Sets or clears the failure message.
    pub fn set_failure(&self, message: Option<String>) {
        *self.failure.lock() = message;
    }

    /// Returns the number of times the stage was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock()
    }

    /// Returns the input location seen by each call.
    #[must_use]
    pub fn recorded_inputs(&self) -> Vec<Option<PathBuf>> {
        self.inputs.lock().clone()
    }

    /// Resets call tracking.
    pub fn reset(&self) {
        *self.call_count.lock() = 0;
        self.inputs.lock().clear();
    }
}

#[async_trait]
impl Stage for MockStage {
    fn descriptor(&self) -> &StageDescriptor {
        &self.descriptor
    }

    fn default_parameters(&self) -> Parameters {
        self.defaults.clone()
    }

    async fn run(&self, ctx: &StageContext) -> Result<Artifact, StageError> {
        *self.call_count.lock() += 1;
        self.inputs
            .lock()
            .push(ctx.input_location().map(std::path::Path::to_path_buf));

        self.resolve_parameters()?;
        let failure = self.failure.lock().clone();
        if let Some(message) = failure {
            return Err(StageError::computation(message));
        }

        let output = ctx.output_location();
        if self.writes_output {
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(output, format!("{}\n", self.name())).await?;
        }
        Ok(Artifact::file(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn context(stage: &MockStage) -> StageContext {
        let d = stage.descriptor();
        StageContext::new("test", Uuid::new_v4(), d.name(), 0, Some(PathBuf::from("in")), d.output_location())
    }

    #[tokio::test]
    async fn test_mock_stage_counts_calls() {
        let stage = MockStage::tagged("a", "x", "y");
        stage.run(&context(&stage)).await.unwrap();
        stage.run(&context(&stage)).await.unwrap();

        assert_eq!(stage.call_count(), 2);
        assert_eq!(stage.recorded_inputs(), vec![Some(PathBuf::from("in")); 2]);

        stage.reset();
        assert_eq!(stage.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failing_mock() {
        let stage = MockStage::tagged("a", "x", "y").failing("boom");
        let err = stage.run(&context(&stage)).await.unwrap_err();
        assert_eq!(err.to_string(), "Computation failed: boom");
        assert_eq!(stage.call_count(), 1);

        stage.set_failure(None);
        assert!(stage.run(&context(&stage)).await.is_ok());
    }
}

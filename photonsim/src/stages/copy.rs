//! A stage that copies its input file to its output location.

use super::{Stage, StageContext, StageDescriptor};
use crate::core::{Artifact, StageRole};
use crate::errors::StageError;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Copies a single input file verbatim.
///
/// This is how a pre-computed pulse enters a simulation: the source stage
/// pins its input to an existing file and republishes it as a wavefront.
#[derive(Debug, Clone)]
pub struct CopyStage {
    descriptor: StageDescriptor,
}

impl CopyStage {
    /// Creates a copy stage from a full descriptor.
    #[must_use]
    pub fn new(descriptor: StageDescriptor) -> Self {
        Self { descriptor }
    }

    /// Creates a source-role copy stage reading the given file.
    #[must_use]
    pub fn source(
        name: impl Into<String>,
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self::new(StageDescriptor::for_role(StageRole::Source, name, output).with_input_location(input))
    }
}

#[async_trait]
impl Stage for CopyStage {
    fn descriptor(&self) -> &StageDescriptor {
        &self.descriptor
    }

    async fn run(&self, ctx: &StageContext) -> Result<Artifact, StageError> {
        self.resolve_parameters()?;
        let input = ctx.require_input()?;
        if tokio::fs::metadata(input).await?.is_dir() {
            return Err(StageError::computation(format!(
                "expected a file at {}, found a directory",
                input.display()
            )));
        }

        let output = ctx.output_location();
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = tokio::fs::copy(input, output).await?;
        debug!(stage = %self.name(), bytes, output = %output.display(), "Copied input file");

        Ok(Artifact::file(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{tags, ArtifactKind};
    use uuid::Uuid;

    fn context(stage: &CopyStage) -> StageContext {
        let d = stage.descriptor();
        StageContext::new(
            "s2e",
            Uuid::new_v4(),
            d.name(),
            0,
            d.input_location().map(std::path::Path::to_path_buf),
            d.output_location(),
        )
    }

    #[tokio::test]
    async fn test_copy_creates_parent_and_copies_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("FELsource_out_0000001.h5");
        std::fs::write(&input, b"pulse").unwrap();
        let output = dir.path().join("out").join("FELsource_out.h5");

        let stage = CopyStage::source("source", &input, &output);
        assert_eq!(stage.input_tag(), &tags::FEL_SOURCE_FILE);

        let artifact = stage.run(&context(&stage)).await.unwrap();
        assert_eq!(artifact.kind, ArtifactKind::File);
        assert_eq!(std::fs::read(&output).unwrap(), b"pulse");
    }

    #[tokio::test]
    async fn test_copy_rejects_directory_input() {
        let dir = tempfile::tempdir().unwrap();
        let stage = CopyStage::source("source", dir.path(), dir.path().join("out.h5"));

        let err = stage.run(&context(&stage)).await.unwrap_err();
        assert!(matches!(err, StageError::Computation(_)));
    }

    #[tokio::test]
    async fn test_copy_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let stage = CopyStage::source("source", dir.path().join("absent.h5"), dir.path().join("out.h5"));

        let err = stage.run(&context(&stage)).await.unwrap_err();
        assert!(matches!(err, StageError::MissingInput(_)));
    }
}

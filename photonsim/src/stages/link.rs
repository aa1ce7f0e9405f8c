//! A stage that publishes its input under a new name via a symbolic link.

use super::{Stage, StageContext, StageDescriptor};
use crate::core::{Artifact, StageRole};
use crate::errors::StageError;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Links the output location to the input artifact without copying it.
///
/// Models a perfect detector: the detector frames are the diffraction
/// patterns themselves. Re-running replaces a stale link.
#[derive(Debug, Clone)]
pub struct LinkStage {
    descriptor: StageDescriptor,
}

impl LinkStage {
    /// Creates a link stage from a full descriptor.
    #[must_use]
    pub fn new(descriptor: StageDescriptor) -> Self {
        Self { descriptor }
    }

    /// Creates a detector-role link stage.
    #[must_use]
    pub fn detector(name: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self::new(StageDescriptor::for_role(StageRole::Detector, name, output))
    }
}

#[async_trait]
impl Stage for LinkStage {
    fn descriptor(&self) -> &StageDescriptor {
        &self.descriptor
    }

    async fn run(&self, ctx: &StageContext) -> Result<Artifact, StageError> {
        self.resolve_parameters()?;
        let target = tokio::fs::canonicalize(ctx.require_input()?).await?;
        let link = ctx.output_location();

        match tokio::fs::symlink_metadata(link).await {
            Ok(meta) if meta.file_type().is_symlink() => tokio::fs::remove_file(link).await?,
            Ok(_) => {
                return Err(StageError::computation(format!(
                    "refusing to replace non-link entry at {}",
                    link.display()
                )))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        if let Some(parent) = link.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        create_link(&target, link).await?;
        debug!(stage = %self.name(), target = %target.display(), link = %link.display(), "Linked input");

        Ok(Artifact::symlink(link))
    }
}

#[cfg(unix)]
async fn create_link(target: &Path, link: &Path) -> std::io::Result<()> {
    tokio::fs::symlink(target, link).await
}

#[cfg(windows)]
async fn create_link(target: &Path, link: &Path) -> std::io::Result<()> {
    if tokio::fs::metadata(target).await?.is_dir() {
        tokio::fs::symlink_dir(target, link).await
    } else {
        tokio::fs::symlink_file(target, link).await
    }
}

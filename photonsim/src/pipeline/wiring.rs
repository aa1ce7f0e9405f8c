//! Assembly-time resolution of stage input and output locations.

use crate::stages::Stage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The resolved locations of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageWiring {
    /// Where the stage reads from, if anywhere.
    pub input_location: Option<PathBuf>,
    /// Where the stage writes to.
    pub output_location: PathBuf,
}

impl StageWiring {
    /// Returns the input location.
    #[must_use]
    pub fn input(&self) -> Option<&Path> {
        self.input_location.as_deref()
    }

    /// Returns the output location.
    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output_location
    }
}

/// Resolves the wiring of an ordered stage sequence.
///
/// A stage reads its pinned input if it has one, otherwise the output
/// location of the stage before it. A leading stage without a pinned input
/// has no input at all.
#[must_use]
pub fn resolve_wiring(stages: &[Arc<dyn Stage>]) -> Vec<StageWiring> {
    let mut previous: Option<&Path> = None;
    stages
        .iter()
        .map(|stage| {
            let descriptor = stage.descriptor();
            let input = descriptor.input_location().or(previous).map(Path::to_path_buf);
            previous = Some(descriptor.output_location());
            StageWiring {
                input_location: input,
                output_location: descriptor.output_location().to_path_buf(),
            }
        })
        .collect()
}

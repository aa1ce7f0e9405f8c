//! Static description of a stage: identity, interface and locations.

use super::Parameters;
use crate::core::{InterfaceTag, StageRole};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything the orchestrator needs to know about a stage without running it.
///
/// Descriptors are immutable once built; the orchestrator never mutates a
/// stage's tags or locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDescriptor {
    name: String,
    input_tag: InterfaceTag,
    output_tag: InterfaceTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    input_location: Option<PathBuf>,
    output_location: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parameters: Option<Parameters>,
}

impl StageDescriptor {
    /// Creates a descriptor with explicit interface tags.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        input_tag: impl Into<InterfaceTag>,
        output_tag: impl Into<InterfaceTag>,
        output_location: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            input_tag: input_tag.into(),
            output_tag: output_tag.into(),
            input_location: None,
            output_location: output_location.into(),
            parameters: None,
        }
    }

    /// Creates a descriptor carrying the canonical tags of `role`.
    #[must_use]
    pub fn for_role(
        role: StageRole,
        name: impl Into<String>,
        output_location: impl Into<PathBuf>,
    ) -> Self {
        Self::new(name, role.input_tag(), role.output_tag(), output_location)
    }

    /// Pins the input location instead of taking the upstream output.
    #[must_use]
    pub fn with_input_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.input_location = Some(location.into());
        self
    }

    /// Sets the caller-supplied parameters.
    #[must_use]
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// The stage name, unique within a pipeline.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The tag this stage consumes.
    #[must_use]
    pub fn input_tag(&self) -> &InterfaceTag {
        &self.input_tag
    }

    /// The tag this stage produces.
    #[must_use]
    pub fn output_tag(&self) -> &InterfaceTag {
        &self.output_tag
    }

    /// The pinned input location, if any.
    #[must_use]
    pub fn input_location(&self) -> Option<&Path> {
        self.input_location.as_deref()
    }

    /// Where the stage writes its artifact.
    #[must_use]
    pub fn output_location(&self) -> &Path {
        &self.output_location
    }

    /// The caller-supplied parameters; `None` means all defaults.
    #[must_use]
    pub fn parameters(&self) -> Option<&Parameters> {
        self.parameters.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tags;

    #[test]
    fn test_for_role_uses_canonical_tags() {
        let descriptor = StageDescriptor::for_role(StageRole::Interactor, "pmi", "pmi");

        assert_eq!(descriptor.name(), "pmi");
        assert_eq!(descriptor.input_tag(), &tags::PROPAGATED_WAVEFRONT);
        assert_eq!(descriptor.output_tag(), &tags::PMI_SNAPSHOTS);
        assert_eq!(descriptor.output_location(), Path::new("pmi"));
        assert!(descriptor.input_location().is_none());
        assert!(descriptor.parameters().is_none());
    }

    #[test]
    fn test_pinned_input_and_parameters() {
        let descriptor = StageDescriptor::new("source", "fel_source_file", "wavefront", "out.h5")
            .with_input_location("FELsource_out.h5")
            .with_parameters(Parameters::new());

        assert_eq!(descriptor.input_location(), Some(Path::new("FELsource_out.h5")));
        assert_eq!(descriptor.parameters(), Some(&Parameters::new()));
    }
}

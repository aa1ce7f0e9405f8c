//! Interface tags declared by stages.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// A label naming the kind of data a stage consumes or produces.
///
/// Tags are compared by exact value and carry no structure: two tags that
/// describe overlapping file formats are still different tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceTag(Cow<'static, str>);

impl InterfaceTag {
    /// Creates a tag from a static string, usable in constants.
    #[must_use]
    pub const fn from_static(label: &'static str) -> Self {
        Self(Cow::Borrowed(label))
    }

    /// Creates a tag from an owned label.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self(Cow::Owned(label.into()))
    }

    /// Returns the tag label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InterfaceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InterfaceTag {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for InterfaceTag {
    fn from(label: String) -> Self {
        Self::new(label)
    }
}

/// Canonical tags of the photon experiment chain.
///
/// ```text
/// fel_source_file -> wavefront -> propagated_wavefront -> pmi_snapshots
///     -> diffraction_patterns -> detector_frames -> reconstruction
/// ```
pub mod tags {
    use super::InterfaceTag;

    /// Raw FEL source file fed into the photon source.
    pub const FEL_SOURCE_FILE: InterfaceTag = InterfaceTag::from_static("fel_source_file");
    /// Wavefront emitted by the photon source.
    pub const WAVEFRONT: InterfaceTag = InterfaceTag::from_static("wavefront");
    /// Wavefront after propagation through the beamline.
    pub const PROPAGATED_WAVEFRONT: InterfaceTag =
        InterfaceTag::from_static("propagated_wavefront");
    /// Photon-matter interaction snapshots.
    pub const PMI_SNAPSHOTS: InterfaceTag = InterfaceTag::from_static("pmi_snapshots");
    /// Simulated diffraction patterns.
    pub const DIFFRACTION_PATTERNS: InterfaceTag =
        InterfaceTag::from_static("diffraction_patterns");
    /// Detector frames.
    pub const DETECTOR_FRAMES: InterfaceTag = InterfaceTag::from_static("detector_frames");
    /// Reconstructed structure.
    pub const RECONSTRUCTION: InterfaceTag = InterfaceTag::from_static("reconstruction");
}

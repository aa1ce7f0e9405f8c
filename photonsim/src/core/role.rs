//! Canonical stage roles of a photon experiment.

use super::interface::{tags, InterfaceTag};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The position a stage occupies in a photon experiment simulation.
///
/// Variants are declared in execution order, so the derived `Ord` sorts
/// roles canonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageRole {
    /// Produces the photon pulse (e.g., an XFEL source).
    Source,
    /// Propagates the pulse through the beamline optics.
    Propagator,
    /// Models photon-matter interaction with the sample.
    Interactor,
    /// Computes diffraction patterns from interaction snapshots.
    Diffractor,
    /// Turns diffraction patterns into detector frames.
    Detector,
    /// Reconstructs or analyzes the detected data.
    Analyzer,
}

impl StageRole {
    /// All roles in execution order.
    pub const CANONICAL: [Self; 6] = [
        Self::Source,
        Self::Propagator,
        Self::Interactor,
        Self::Diffractor,
        Self::Detector,
        Self::Analyzer,
    ];

    /// Zero-based position of the role in a full experiment.
    #[must_use]
    pub fn position(self) -> usize {
        self as usize
    }

    /// The tag a stage in this role consumes.
    #[must_use]
    pub fn input_tag(self) -> InterfaceTag {
        match self {
            Self::Source => tags::FEL_SOURCE_FILE,
            Self::Propagator => tags::WAVEFRONT,
            Self::Interactor => tags::PROPAGATED_WAVEFRONT,
            Self::Diffractor => tags::PMI_SNAPSHOTS,
            Self::Detector => tags::DIFFRACTION_PATTERNS,
            Self::Analyzer => tags::DETECTOR_FRAMES,
        }
    }

    /// The tag a stage in this role produces.
    #[must_use]
    pub fn output_tag(self) -> InterfaceTag {
        match self {
            Self::Source => tags::WAVEFRONT,
            Self::Propagator => tags::PROPAGATED_WAVEFRONT,
            Self::Interactor => tags::PMI_SNAPSHOTS,
            Self::Diffractor => tags::DIFFRACTION_PATTERNS,
            Self::Detector => tags::DETECTOR_FRAMES,
            Self::Analyzer => tags::RECONSTRUCTION,
        }
    }
}

impl fmt::Display for StageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Propagator => write!(f, "propagator"),
            Self::Interactor => write!(f, "interactor"),
            Self::Diffractor => write!(f, "diffractor"),
            Self::Detector => write!(f, "detector"),
            Self::Analyzer => write!(f, "analyzer"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_roles_chain_tags() {
        for pair in StageRole::CANONICAL.windows(2) {
            assert_eq!(pair[0].output_tag(), pair[1].input_tag(), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_role_position_matches_order() {
        for (index, role) in StageRole::CANONICAL.iter().enumerate() {
            assert_eq!(role.position(), index);
        }
        assert!(StageRole::Source < StageRole::Analyzer);
    }

    #[test]
    fn test_role_display_and_serialize() {
        assert_eq!(StageRole::Diffractor.to_string(), "diffractor");
        let json = serde_json::to_string(&StageRole::Interactor).unwrap();
        assert_eq!(json, r#""interactor""#);
    }
}

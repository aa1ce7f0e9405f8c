//! Pre-flight interface consistency check.
//!
//! Compares the declared output tag of every stage with the declared input
//! tag of its successor. The check is pure: it never runs a stage, never
//! touches the filesystem and is linear in the number of stages.

use crate::errors::InterfaceMismatch;
use crate::stages::Stage;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Adjacent stage pairs whose tag comparison is waived.
///
/// Keyed by upstream name, so a lookup costs two set probes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceOverrides {
    pairs: BTreeMap<String, BTreeSet<String>>,
    len: usize,
}

impl InterfaceOverrides {
    /// Creates an empty override set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waives the comparison between `upstream` and `downstream`.
    ///
    /// Returns false if the pair was already waived.
    pub fn allow(&mut self, upstream: impl Into<String>, downstream: impl Into<String>) -> bool {
        let added = self
            .pairs
            .entry(upstream.into())
            .or_default()
            .insert(downstream.into());
        if added {
            self.len += 1;
        }
        added
    }

    /// Returns true if the exact pair is waived.
    #[must_use]
    pub fn permits(&self, upstream: &str, downstream: &str) -> bool {
        self.pairs
            .get(upstream)
            .is_some_and(|downstreams| downstreams.contains(downstream))
    }

    /// Iterates over the waived pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().flat_map(|(upstream, downstreams)| {
            downstreams
                .iter()
                .map(move |downstream| (upstream.as_str(), downstream.as_str()))
        })
    }

    /// Returns the number of waived pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if nothing is waived.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Returns every adjacent pair whose tags differ, in pipeline order.
///
/// Pairs named in `overrides` are skipped. Sequences of length 0 or 1
/// have no pairs and therefore no mismatches.
#[must_use]
pub fn find_interface_mismatches(
    stages: &[Arc<dyn Stage>],
    overrides: &InterfaceOverrides,
) -> Vec<InterfaceMismatch> {
    stages
        .windows(2)
        .enumerate()
        .filter_map(|(index, pair)| {
            let (upstream, downstream) = (&pair[0], &pair[1]);
            if upstream.output_tag() == downstream.input_tag()
                || overrides.permits(upstream.name(), downstream.name())
            {
                return None;
            }
            Some(InterfaceMismatch {
                upstream_index: index,
                upstream: upstream.name().to_string(),
                produced: upstream.output_tag().clone(),
                downstream_index: index + 1,
                downstream: downstream.name().to_string(),
                expected: downstream.input_tag().clone(),
            })
        })
        .collect()
}

/// Returns true iff every adjacent pair agrees or is overridden.
#[must_use]
pub fn check_interface_consistency(
    stages: &[Arc<dyn Stage>],
    overrides: &InterfaceOverrides,
) -> bool {
    find_interface_mismatches(stages, overrides).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tags;
    use crate::testing::MockStage;

    fn chain(links: &[(&str, &str, &str)]) -> Vec<Arc<dyn Stage>> {
        links
            .iter()
            .map(|(name, input, output)| {
                Arc::new(MockStage::tagged(*name, *input, *output)) as Arc<dyn Stage>
            })
            .collect()
    }

    #[test]
    fn test_empty_and_single_stage_are_consistent() {
        let overrides = InterfaceOverrides::new();
        assert!(check_interface_consistency(&[], &overrides));
        assert!(check_interface_consistency(&chain(&[("only", "a", "b")]), &overrides));
    }

    #[test]
    fn test_matching_chain_is_consistent() {
        let stages = chain(&[("a", "x", "t1"), ("b", "t1", "t2"), ("c", "t2", "y")]);
        assert!(check_interface_consistency(&stages, &InterfaceOverrides::new()));
    }

    #[test]
    fn test_reports_every_mismatched_pair() {
        let stages = chain(&[
            ("source", tags::FEL_SOURCE_FILE.as_str(), tags::WAVEFRONT.as_str()),
            ("pmi", tags::PROPAGATED_WAVEFRONT.as_str(), tags::PMI_SNAPSHOTS.as_str()),
            ("diffr", tags::PMI_SNAPSHOTS.as_str(), tags::DIFFRACTION_PATTERNS.as_str()),
            ("recon", tags::DETECTOR_FRAMES.as_str(), tags::RECONSTRUCTION.as_str()),
        ]);

        let mismatches = find_interface_mismatches(&stages, &InterfaceOverrides::new());
        assert_eq!(mismatches.len(), 2);
        assert_eq!(mismatches[0].upstream, "source");
        assert_eq!(mismatches[0].produced, tags::WAVEFRONT);
        assert_eq!(mismatches[0].expected, tags::PROPAGATED_WAVEFRONT);
        assert_eq!(mismatches[1].upstream_index, 2);
        assert_eq!(mismatches[1].downstream_index, 3);
        assert!(!check_interface_consistency(&stages, &InterfaceOverrides::new()));
    }

    #[test]
    fn test_tag_comparison_is_exact() {
        let stages = chain(&[("a", "x", "Wavefront"), ("b", "wavefront", "y")]);
        assert!(!check_interface_consistency(&stages, &InterfaceOverrides::new()));
    }

    #[test]
    fn test_override_waives_exactly_the_named_pair() {
        let stages = chain(&[("a", "x", "t1"), ("b", "other", "t2"), ("c", "mismatch", "y")]);
        let mut overrides = InterfaceOverrides::new();
        assert!(overrides.allow("a", "b"));
        assert!(!overrides.allow("a", "b"));

        let mismatches = find_interface_mismatches(&stages, &overrides);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].upstream, "b");

        overrides.allow("c", "b");
        assert_eq!(find_interface_mismatches(&stages, &overrides).len(), 1);
    }

    #[test]
    fn test_permits_matches_direction_and_names() {
        let mut overrides = InterfaceOverrides::new();
        for i in 0..500 {
            overrides.allow(format!("stage{i}"), format!("stage{}", i + 1));
        }
        overrides.allow("stage3", "extra");

        assert_eq!(overrides.len(), 501);
        assert!(overrides.permits("stage3", "stage4"));
        assert!(overrides.permits("stage3", "extra"));
        assert!(!overrides.permits("stage4", "stage3"));
        assert!(!overrides.permits("stage500", "stage501"));
        assert_eq!(overrides.iter().filter(|(up, _)| *up == "stage3").count(), 2);
    }

    #[test]
    fn test_check_never_runs_stages() {
        let mock = Arc::new(MockStage::tagged("a", "x", "y"));
        let stages: Vec<Arc<dyn Stage>> = vec![mock.clone(), Arc::new(MockStage::tagged("b", "z", "w"))];

        check_interface_consistency(&stages, &InterfaceOverrides::new());
        assert_eq!(mock.call_count(), 0);
    }
}

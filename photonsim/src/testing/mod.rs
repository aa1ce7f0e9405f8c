//! Testing utilities for photonsim pipelines.
//!
//! This module provides:
//! - Mock stages with call tracking
//! - A deterministic six-stage stub experiment
//! - Assertions over artifacts, run reports and events

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_absent, assert_dirs_exist, assert_event_types, assert_files_exist,
    assert_links_exist, assert_stage_statuses,
};
pub use fixtures::StubExperiment;
pub use mocks::MockStage;

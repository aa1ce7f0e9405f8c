//! Pipeline assembly, interface checking and execution.
//!
//! This module provides:
//! - The interface consistency checker
//! - Pipeline and experiment builders with assembly-time validation
//! - The sequential orchestrator and its run reports

mod builder;
mod consistency;
mod experiment;
mod orchestrator;
mod report;
mod state;
mod wiring;

pub use builder::PipelineBuilder;
pub use consistency::{check_interface_consistency, find_interface_mismatches, InterfaceOverrides};
pub use experiment::ExperimentBuilder;
pub use orchestrator::{Pipeline, RunOptions};
pub use report::{RunReport, StageRecord};
pub use state::PipelineState;
pub use wiring::{resolve_wiring, StageWiring};

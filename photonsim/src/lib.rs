//! # Photonsim
//!
//! Sequential orchestration of file-based photon experiment simulations.
//!
//! A start-to-end simulation chains independent computation stages (photon
//! source, beamline propagation, photon-matter interaction, diffraction,
//! detection and reconstruction) that exchange files, directories and
//! symbolic links. Photonsim provides:
//!
//! - **A uniform stage contract**: every stage declares the interface tag it
//!   consumes and the one it produces
//! - **Pre-flight interface checks**: adjacent tags are compared before any
//!   expensive computation starts
//! - **Sequential execution**: stages run strictly in order, each reading the
//!   previous stage's output location, and the first failure stops the run
//! - **Event-driven observability**: lifecycle events and `tracing` spans
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use photonsim::prelude::*;
//!
//! let mut pipeline = ExperimentBuilder::new("s2e")
//!     .source(Arc::new(CopyStage::source("source", "FELsource_out_0000001.h5", "FELsource_out.h5")))
//!     .propagator(propagator)
//!     .interactor(interactor)
//!     .diffractor(diffractor)
//!     .detector(Arc::new(LinkStage::detector("detector", "detector")))
//!     .analyzer(reconstruction)
//!     .build()?;
//!
//! if pipeline.check_interface_consistency() {
//!     let report = pipeline.run().await?;
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod stages;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{LogFormat, LoggingConfig, SimulationConfig};
    pub use crate::core::{
        indexed_file_name, tags, Artifact, ArtifactKind, InterfaceTag, PipelineEvent,
        StageRole, StageStatus,
    };
    pub use crate::errors::{
        ConfigurationError, ContractErrorInfo, InterfaceMismatch, InterfaceMismatchError,
        PipelineValidationError, SimulationError, SimulationResult, StageError,
        StageExecutionError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::init_logging;
    pub use crate::pipeline::{
        ExperimentBuilder, Pipeline, PipelineBuilder, PipelineState, RunOptions, RunReport,
    };
    pub use crate::stages::{
        CopyStage, FnStage, LinkStage, Parameters, ResolvedParameters, Stage, StageContext,
        StageDescriptor,
    };
    pub use crate::utils::{generate_uuid, iso_timestamp, Timestamp};
}

//! Core domain model types for photonsim.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Interface tags and the canonical photon-experiment roles
//! - Stage status
//! - Artifacts on disk and lifecycle events

mod artifact;
mod event;
mod interface;
mod role;
mod status;

pub use artifact::{indexed_file_name, list_members, Artifact, ArtifactKind};
pub use event::PipelineEvent;
pub use interface::{tags, InterfaceTag};
pub use role::StageRole;
pub use status::StageStatus;

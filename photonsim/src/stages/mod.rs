//! Stage trait and built-in implementations.
//!
//! A stage is one step of a photon experiment simulation: it reads the
//! artifact at its input location and writes a new artifact at its output
//! location. The orchestrator only ever sees stages through [`Stage`].

mod context;
mod copy;
mod descriptor;
mod link;
mod parameters;

pub use context::StageContext;
pub use copy::CopyStage;
pub use descriptor::StageDescriptor;
pub use link::LinkStage;
pub use parameters::{Parameters, ResolvedParameters};

use crate::core::{Artifact, InterfaceTag};
use crate::errors::{ConfigurationError, StageError};
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for pipeline stages.
///
/// Implementations must write only to their own output location and treat
/// the input location as read-only. Running a stage twice with the same
/// input should produce an equivalent artifact.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the stage's static description.
    fn descriptor(&self) -> &StageDescriptor;

    /// Returns the recognized parameters and their default values.
    ///
    /// Stages without options accept no parameters at all.
    fn default_parameters(&self) -> Parameters {
        Parameters::new()
    }

    /// Performs the stage's computation.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The resolved locations and run identity
    ///
    /// # Returns
    ///
    /// The artifact written to `ctx.output_location()`.
    async fn run(&self, ctx: &StageContext) -> Result<Artifact, StageError>;

    /// Returns the name of the stage.
    fn name(&self) -> &str {
        self.descriptor().name()
    }

    /// Returns the tag this stage consumes.
    fn input_tag(&self) -> &InterfaceTag {
        self.descriptor().input_tag()
    }

    /// Returns the tag this stage produces.
    fn output_tag(&self) -> &InterfaceTag {
        self.descriptor().output_tag()
    }

    /// Merges the supplied parameters over [`Stage::default_parameters`].
    fn resolve_parameters(&self) -> Result<ResolvedParameters, ConfigurationError> {
        Parameters::resolve(
            self.name(),
            self.descriptor().parameters(),
            &self.default_parameters(),
        )
    }
}

/// A simple function-based stage.
///
/// The function receives the context and the resolved parameters.
pub struct FnStage<F>
where
    F: Fn(&StageContext, &ResolvedParameters) -> Result<Artifact, StageError> + Send + Sync,
{
    descriptor: StageDescriptor,
    defaults: Parameters,
    func: F,
}

impl<F> FnStage<F>
where
    F: Fn(&StageContext, &ResolvedParameters) -> Result<Artifact, StageError> + Send + Sync,
{
    /// Creates a new function-based stage.
    pub fn new(descriptor: StageDescriptor, func: F) -> Self {
        Self {
            descriptor,
            defaults: Parameters::new(),
            func,
        }
    }

    /// Declares the parameters this stage recognizes.
    #[must_use]
    pub fn with_defaults(mut self, defaults: Parameters) -> Self {
        self.defaults = defaults;
        self
    }
}

impl<F> Debug for FnStage<F>
where
    F: Fn(&StageContext, &ResolvedParameters) -> Result<Artifact, StageError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStage")
            .field("name", &self.descriptor.name())
            .finish()
    }
}

#[async_trait]
impl<F> Stage for FnStage<F>
where
    F: Fn(&StageContext, &ResolvedParameters) -> Result<Artifact, StageError> + Send + Sync,
{
    fn descriptor(&self) -> &StageDescriptor {
        &self.descriptor
    }

    fn default_parameters(&self) -> Parameters {
        self.defaults.clone()
    }

    async fn run(&self, ctx: &StageContext) -> Result<Artifact, StageError> {
        let parameters = self.resolve_parameters()?;
        (self.func)(ctx, &parameters)
    }
}

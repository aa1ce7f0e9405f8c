//! A deterministic six-stage photon experiment for tests and benches.
//!
//! Every stage is a physics-free stub that derives its output bytes from its
//! input bytes, so two runs over the same seed produce identical artifacts.
//! The on-disk layout follows the usual start-to-end simulation layout:
//!
//! ```text
//! FELsource_out_0000001.h5   source (copy of the seed)
//! prop_out_0000001.h5        propagator
//! pmi/pmi_out_000000N.h5     interactor, one file per trajectory
//! diffr/diffr_out_000000N.h5 diffractor, one file per pattern
//! detector -> diffr          perfect detector (symbolic link)
//! recon.h5                   analyzer
//! ```

use sha2::{Digest, Sha256};
use serde_json::json;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::{indexed_file_name, list_members, Artifact, StageRole};
use crate::errors::StageError;
use crate::pipeline::ExperimentBuilder;
use crate::stages::{
    CopyStage, FnStage, LinkStage, Parameters, ResolvedParameters, Stage, StageDescriptor,
};

/// Builder for the stub experiment rooted at one directory.
#[derive(Debug, Clone)]
pub struct StubExperiment {
    root: PathBuf,
    patterns: usize,
}

impl StubExperiment {
    /// Creates a stub experiment writing under `root`, producing `patterns`
    /// diffraction patterns.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, patterns: usize) -> Self {
        Self {
            root: root.into(),
            patterns,
        }
    }

    /// The working directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the pre-computed FEL pulse is expected.
    #[must_use]
    pub fn source_input(&self) -> PathBuf {
        self.root.join("inputs").join(indexed_file_name("FELsource", 1))
    }

    /// Writes the deterministic FEL pulse the source stage copies.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error.
    pub fn seed(&self) -> io::Result<PathBuf> {
        let input = self.source_input();
        if let Some(parent) = input.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&input, b"FEL pulse 0000001\n")?;
        Ok(input)
    }

    /// Diffraction parameters matching the experiment's pattern count.
    #[must_use]
    pub fn diffraction_parameters(&self) -> Parameters {
        Parameters::new()
            .with("uniform_rotation", json!(true))
            .with("calculate_Compton", json!(false))
            .with("slice_interval", json!(100))
            .with("number_of_slices", json!(2))
            .with("pmi_start_ID", json!(1))
            .with("pmi_stop_ID", json!(1))
            .with("number_of_diffraction_patterns", json!(self.patterns))
            .with("beam_parameter_file", json!("s2e.beam"))
            .with("beam_geometry_file", json!("s2e.geom"))
    }

    /// The photon source: copies the seed.
    #[must_use]
    pub fn source(&self) -> Arc<dyn Stage> {
        Arc::new(CopyStage::source(
            "source",
            self.source_input(),
            self.root.join(indexed_file_name("FELsource", 1)),
        ))
    }

    /// The propagator: prefixes the pulse.
    #[must_use]
    pub fn propagator(&self) -> Arc<dyn Stage> {
        let output = self.root.join(indexed_file_name("prop", 1));
        Arc::new(FnStage::new(
            StageDescriptor::for_role(StageRole::Propagator, "propagator", output),
            |ctx, _| {
                let mut bytes = b"propagated:".to_vec();
                bytes.extend(fs::read(ctx.require_input()?)?);
                fs::write(ctx.output_location(), bytes)?;
                Ok(Artifact::file(ctx.output_location()))
            },
        ))
    }

    /// The interactor: one snapshot file per trajectory.
    #[must_use]
    pub fn interactor(&self) -> Arc<dyn Stage> {
        Arc::new(
            FnStage::new(
                StageDescriptor::for_role(StageRole::Interactor, "interactor", self.root.join("pmi")),
                |ctx, params| {
                    let wavefront = fs::read(ctx.require_input()?)?;
                    let trajectories = positive_count(params, "number_of_trajectories")?;

                    let output = ctx.output_location();
                    fs::create_dir_all(output)?;
                    for index in 1..=trajectories {
                        let mut bytes = format!("snapshot {index}:").into_bytes();
                        bytes.extend_from_slice(&wavefront);
                        fs::write(output.join(indexed_file_name("pmi", index)), bytes)?;
                    }
                    Ok(Artifact::directory(output))
                },
            )
            .with_defaults(Parameters::new().with("number_of_trajectories", json!(1))),
        )
    }

    /// The diffractor: one pattern file per requested pattern.
    #[must_use]
    pub fn diffractor(&self) -> Arc<dyn Stage> {
        let descriptor =
            StageDescriptor::for_role(StageRole::Diffractor, "diffractor", self.root.join("diffr"))
                .with_parameters(self.diffraction_parameters());
        Arc::new(FnStage::new(descriptor, diffract).with_defaults(diffraction_defaults()))
    }

    /// The perfect detector: links to the diffraction patterns.
    #[must_use]
    pub fn detector(&self) -> Arc<dyn Stage> {
        Arc::new(LinkStage::detector("detector", self.root.join("detector")))
    }

    /// The analyzer: digests every detector frame into one file.
    #[must_use]
    pub fn analyzer(&self) -> Arc<dyn Stage> {
        let descriptor =
            StageDescriptor::for_role(StageRole::Analyzer, "analyzer", self.root.join("recon.h5"));
        Arc::new(FnStage::new(descriptor, reconstruct).with_defaults(reconstruction_defaults()))
    }

    /// An experiment builder with all six stubs in place.
    #[must_use]
    pub fn builder(&self, name: &str) -> ExperimentBuilder {
        ExperimentBuilder::new(name)
            .source(self.source())
            .propagator(self.propagator())
            .interactor(self.interactor())
            .diffractor(self.diffractor())
            .detector(self.detector())
            .analyzer(self.analyzer())
    }

    /// Regular files a successful run leaves behind.
    #[must_use]
    pub fn expected_files(&self) -> Vec<PathBuf> {
        let mut files = vec![
            self.root.join(indexed_file_name("FELsource", 1)),
            self.root.join(indexed_file_name("prop", 1)),
            self.root.join("pmi").join(indexed_file_name("pmi", 1)),
        ];
        for index in 1..=self.patterns {
            files.push(self.root.join("diffr").join(indexed_file_name("diffr", index)));
            files.push(self.root.join("detector").join(indexed_file_name("diffr", index)));
        }
        files.push(self.root.join("recon.h5"));
        files
    }

    /// Directories a successful run leaves behind.
    #[must_use]
    pub fn expected_dirs(&self) -> Vec<PathBuf> {
        vec![self.root.join("pmi"), self.root.join("diffr")]
    }

    /// Symbolic links a successful run leaves behind.
    #[must_use]
    pub fn expected_links(&self) -> Vec<PathBuf> {
        vec![self.root.join("detector")]
    }
}

fn diffraction_defaults() -> Parameters {
    Parameters::new()
        .with("uniform_rotation", json!(true))
        .with("calculate_Compton", json!(false))
        .with("slice_interval", json!(100))
        .with("number_of_slices", json!(1))
        .with("pmi_start_ID", json!(1))
        .with("pmi_stop_ID", json!(1))
        .with("number_of_diffraction_patterns", json!(1))
        .with("beam_parameter_file", serde_json::Value::Null)
        .with("beam_geometry_file", serde_json::Value::Null)
}

fn reconstruction_defaults() -> Parameters {
    Parameters::new()
        .with(
            "EMC_Parameters",
            json!({
                "initial_number_of_quaternions": 1,
                "max_number_of_quaternions": 9,
                "max_number_of_iterations": 100,
                "min_error": 1.0e-8,
                "beamstop": 1.0e-5,
                "detailed_output": false
            }),
        )
        .with(
            "DM_Parameters",
            json!({
                "number_of_trials": 5,
                "number_of_iterations": 2,
                "averaging_start": 15,
                "leash": 0.2,
                "number_of_shrink_cycles": 2
            }),
        )
}

fn diffract(ctx: &crate::stages::StageContext, params: &ResolvedParameters) -> Result<Artifact, StageError> {
    let input = ctx.require_input()?;
    let start = positive_count(params, "pmi_start_ID")?;
    let stop = positive_count(params, "pmi_stop_ID")?;
    if stop < start {
        return Err(params
            .invalid_value("pmi_stop_ID", format!("must not be below pmi_start_ID ({start})"))
            .into());
    }
    let patterns = positive_count(params, "number_of_diffraction_patterns")?;
    let slices = params.u64("number_of_slices")?;

    let snapshots = (start..=stop)
        .map(|id| {
            let path = input.join(indexed_file_name("pmi", id));
            fs::read(&path).map_err(|_| StageError::MissingInput(path))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let output = ctx.output_location();
    fs::create_dir_all(output)?;
    for index in 1..=patterns {
        let snapshot = &snapshots[(index - 1) % snapshots.len()];
        let mut bytes = format!("pattern {index} slices {slices}:").into_bytes();
        bytes.extend_from_slice(snapshot);
        fs::write(output.join(indexed_file_name("diffr", index)), bytes)?;
    }
    Ok(Artifact::directory(output))
}

fn reconstruct(ctx: &crate::stages::StageContext, params: &ResolvedParameters) -> Result<Artifact, StageError> {
    let frames = list_members(ctx.require_input()?)?;
    if frames.is_empty() {
        return Err(StageError::computation("no detector frames to reconstruct"));
    }
    let iterations = params.section("EMC_Parameters")?.u64("max_number_of_iterations")?;
    let trials = params.section("DM_Parameters")?.u64("number_of_trials")?;

    let mut hasher = Sha256::new();
    for frame in &frames {
        hasher.update(fs::read(frame)?);
    }
    let summary = format!(
        "frames={} iterations={iterations} trials={trials} digest={}\n",
        frames.len(),
        hex::encode(hasher.finalize())
    );
    fs::write(ctx.output_location(), summary)?;
    Ok(Artifact::file(ctx.output_location()))
}

fn positive_count(params: &ResolvedParameters, key: &str) -> Result<usize, StageError> {
    let value = params.u64(key)?;
    match usize::try_from(value) {
        Ok(count) if count > 0 => Ok(count),
        _ => Err(params.invalid_value(key, "must be a positive count").into()),
    }
}

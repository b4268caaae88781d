//! Stage inputs and execution context.

use std::borrow::Cow;
use std::collections::HashMap;
use std::mem;
use std::path::PathBuf;

use crate::config::PipelineConfig;
use crate::core::{ArtifactKind, ArtifactName, Payload, Provenance, RunKey, StageResult};
use crate::errors::{SeaIceError, StageDependencyError, StoreError};
use crate::grid::Grid;
use crate::store::ArtifactStore;

/// A strict view of the completed upstream results of one stage.
///
/// Only declared dependencies are visible. Grids can be borrowed, or taken
/// by value to hand ownership downstream; a taken grid leaves a reference
/// to its stored artifact behind, so later readers re-read it from the
/// store instead of sharing the mutated buffer.
pub struct StageInputs<'a> {
    stage: &'a str,
    declared: &'a [String],
    completed: &'a mut HashMap<String, StageResult>,
    store: &'a dyn ArtifactStore,
}

impl std::fmt::Debug for StageInputs<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageInputs")
            .field("stage", &self.stage)
            .field("declared", &self.declared)
            .finish_non_exhaustive()
    }
}

impl<'a> StageInputs<'a> {
    /// Creates inputs for `stage`.
    pub fn new(
        stage: &'a str,
        declared: &'a [String],
        completed: &'a mut HashMap<String, StageResult>,
        store: &'a dyn ArtifactStore,
    ) -> Self {
        Self {
            stage,
            declared,
            completed,
            store,
        }
    }

    /// The declared upstream stages.
    #[must_use]
    pub const fn declared(&self) -> &[String] {
        self.declared
    }

    fn check_declared(&self, upstream: &str) -> Result<(), StageDependencyError> {
        if self.declared.iter().any(|dep| dep == upstream) {
            Ok(())
        } else {
            Err(StageDependencyError::new(
                self.stage,
                upstream,
                "not a declared dependency",
            ))
        }
    }

    fn missing(&self, upstream: &str) -> StageDependencyError {
        StageDependencyError::new(self.stage, upstream, "upstream has not completed")
    }

    /// The upstream result.
    ///
    /// # Errors
    ///
    /// Returns [`StageDependencyError`] if `upstream` is undeclared or has
    /// not completed.
    pub fn get(&self, upstream: &str) -> Result<&StageResult, StageDependencyError> {
        self.check_declared(upstream)?;
        self.completed
            .get(upstream)
            .ok_or_else(|| self.missing(upstream))
    }

    /// Provenance notes of an upstream result.
    pub fn notes(&self, upstream: &str) -> Result<&Provenance, StageDependencyError> {
        self.get(upstream).map(|result| &result.provenance)
    }

    /// Where an upstream artifact can be read from.
    pub fn location(&self, upstream: &str) -> Result<PathBuf, StageDependencyError> {
        let result = self.get(upstream)?;
        Ok(match result.payload.location() {
            Some(location) => location.to_path_buf(),
            None => self.store.locate(&result.artifact),
        })
    }

    /// Borrows an upstream grid, or re-reads it from the store when the
    /// grid has already been handed to another stage.
    ///
    /// # Errors
    ///
    /// Fails if the upstream is not visible, is not a raster, or cannot be
    /// re-read.
    pub fn grid(&self, upstream: &str) -> Result<Cow<'_, Grid>, SeaIceError> {
        let result = self.get(upstream)?;
        match &result.payload {
            Payload::Grid(grid) => Ok(Cow::Borrowed(grid)),
            Payload::Asset { .. } => self.reload(upstream, result.artifact).map(Cow::Owned),
        }
    }

    /// Takes ownership of an upstream grid.
    ///
    /// # Errors
    ///
    /// Fails if the upstream is not visible, is not a raster, or cannot be
    /// re-read.
    pub fn take_grid(&mut self, upstream: &str) -> Result<Grid, SeaIceError> {
        self.check_declared(upstream)?;
        let missing = self.missing(upstream);
        let result = self.completed.get_mut(upstream).ok_or(missing)?;
        let artifact = result.artifact;

        if matches!(result.payload, Payload::Grid(_)) {
            let handed_off = Payload::asset(self.store.locate(&artifact));
            if let Payload::Grid(grid) = mem::replace(&mut result.payload, handed_off) {
                return Ok(grid);
            }
        }
        self.reload(upstream, artifact)
    }

    fn reload(&self, upstream: &str, artifact: ArtifactName) -> Result<Grid, SeaIceError> {
        if !artifact.kind.is_raster() {
            return Err(StageDependencyError::new(
                self.stage,
                upstream,
                format!("artifact '{artifact}' is not a raster"),
            )
            .into());
        }
        Ok(self.store.load_grid(&artifact)?)
    }
}

/// Everything a stage's run function can see.
pub struct StageContext<'a> {
    run_key: RunKey,
    artifact: ArtifactName,
    config: &'a PipelineConfig,
    store: &'a dyn ArtifactStore,
    inputs: StageInputs<'a>,
}

impl std::fmt::Debug for StageContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageContext")
            .field("run_key", &self.run_key)
            .field("artifact", &self.artifact)
            .field("inputs", &self.inputs)
            .finish_non_exhaustive()
    }
}

impl<'a> StageContext<'a> {
    /// Creates a context for one stage execution.
    pub fn new(
        artifact: ArtifactName,
        config: &'a PipelineConfig,
        store: &'a dyn ArtifactStore,
        inputs: StageInputs<'a>,
    ) -> Self {
        Self {
            run_key: artifact.run_key,
            artifact,
            config,
            store,
            inputs,
        }
    }

    /// The run key.
    #[must_use]
    pub const fn run_key(&self) -> RunKey {
        self.run_key
    }

    /// The name of the stage being run.
    #[must_use]
    pub fn stage_name(&self) -> &str {
        self.inputs.stage
    }

    /// The artifact this stage declares.
    #[must_use]
    pub const fn artifact(&self) -> ArtifactName {
        self.artifact
    }

    /// The pipeline configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        self.config
    }

    /// Upstream results.
    #[must_use]
    pub const fn inputs(&self) -> &StageInputs<'a> {
        &self.inputs
    }

    /// Upstream results, mutably (for taking grids).
    pub fn inputs_mut(&mut self) -> &mut StageInputs<'a> {
        &mut self.inputs
    }

    /// Location a collaborator should write this stage's artifact to.
    pub fn output_path(&self) -> Result<PathBuf, StoreError> {
        self.store.prepare(&self.artifact)
    }

    /// Location for a secondary artifact of the same run.
    pub fn side_output_path(&self, kind: ArtifactKind) -> Result<PathBuf, StoreError> {
        self.store.prepare(&ArtifactName::new(self.run_key, kind))
    }
}

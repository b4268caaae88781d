//! Stage trait and stage specifications.

use std::fmt::Debug;
use std::sync::Arc;

use super::StageContext;
use crate::core::{ArtifactKind, StageResult};
use crate::errors::{ContractErrorInfo, PipelineValidationError, SeaIceError};

/// A unit of pipeline work.
///
/// Run functions are synchronous. Any blocking happens inside the external
/// collaborators a stage calls.
pub trait Stage: Send + Sync + Debug {
    /// Returns the name of the stage.
    fn name(&self) -> &str;

    /// Produces this stage's result from its upstream results.
    fn run(&self, ctx: &mut StageContext<'_>) -> Result<StageResult, SeaIceError>;
}

/// A simple function-based stage.
pub struct FnStage<F>
where
    F: Fn(&mut StageContext<'_>) -> Result<StageResult, SeaIceError> + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnStage<F>
where
    F: Fn(&mut StageContext<'_>) -> Result<StageResult, SeaIceError> + Send + Sync,
{
    /// Creates a new function-based stage.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for FnStage<F>
where
    F: Fn(&mut StageContext<'_>) -> Result<StageResult, SeaIceError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStage").field("name", &self.name).finish()
    }
}

impl<F> Stage for FnStage<F>
where
    F: Fn(&mut StageContext<'_>) -> Result<StageResult, SeaIceError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<StageResult, SeaIceError> {
        (self.func)(ctx)
    }
}

/// Whether an existing artifact short-circuits the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Skip the run function when the artifact already exists.
    #[default]
    ReuseExisting,
    /// Always run, overwriting the artifact.
    AlwaysRun,
}

/// A named stage definition: dependencies, declared artifact and run function.
///
/// Definitions are immutable once built into a graph; only results carry
/// run-specific state.
#[derive(Debug, Clone)]
pub struct StageSpec {
    /// The unique name of the stage.
    pub name: String,
    /// Upstream stages, in the order the stage consumes them.
    pub dependencies: Vec<String>,
    /// The artifact whose existence marks the stage done.
    pub artifact: ArtifactKind,
    /// The stage implementation.
    pub runner: Arc<dyn Stage>,
    /// Cache behaviour.
    pub cache: CachePolicy,
}

impl StageSpec {
    /// Creates a new stage specification.
    #[must_use]
    pub fn new(name: impl Into<String>, artifact: ArtifactKind, runner: Arc<dyn Stage>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            artifact,
            runner,
            cache: CachePolicy::default(),
        }
    }

    /// Sets the dependencies.
    #[must_use]
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a dependency.
    #[must_use]
    pub fn with_dependency(mut self, dep: impl Into<String>) -> Self {
        self.dependencies.push(dep.into());
        self
    }

    /// Sets the cache policy.
    #[must_use]
    pub fn with_cache(mut self, cache: CachePolicy) -> Self {
        self.cache = cache;
        self
    }

    /// Whether the stage depends on `stage`.
    #[must_use]
    pub fn depends_on(&self, stage: &str) -> bool {
        self.dependencies.iter().any(|dep| dep == stage)
    }

    /// Validates the stage specification on its own.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank, the stage depends on itself,
    /// or a dependency is listed twice.
    pub fn validate(&self) -> Result<(), PipelineValidationError> {
        if self.name.trim().is_empty() {
            return Err(PipelineValidationError::new("Stage name cannot be empty"));
        }
        if self.depends_on(&self.name) {
            return Err(PipelineValidationError::new(format!(
                "Stage '{}' cannot depend on itself",
                self.name
            ))
            .with_stages(vec![self.name.clone()])
            .with_error_info(ContractErrorInfo::new(
                "PIPELINE-CYCLE",
                format!("Stage '{}' lists itself as a dependency", self.name),
            )));
        }
        for (i, dep) in self.dependencies.iter().enumerate() {
            if self.dependencies[..i].contains(dep) {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{}' lists dependency '{dep}' twice",
                    self.name
                ))
                .with_stages(vec![self.name.clone(), dep.clone()])
                .with_error_info(ContractErrorInfo::new(
                    "PIPELINE-DUPLICATE",
                    format!("Duplicate dependency '{dep}'"),
                )));
            }
        }
        Ok(())
    }
}

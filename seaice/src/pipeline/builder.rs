//! Pipeline builder with validation.

use std::collections::{HashMap, HashSet};

use super::{StageGraph, StageSpec};
use crate::errors::{ContractErrorInfo, CycleDetectedError, PipelineValidationError};

/// Builder for creating validated pipelines.
///
/// Stages may be declared in any order; dependencies are resolved when the
/// graph is built.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    /// The pipeline name.
    name: String,
    /// The stage specifications.
    stages: HashMap<String, StageSpec>,
    /// Declaration order for stages.
    stage_order: Vec<String>,
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: HashMap::new(),
            stage_order: Vec::new(),
        }
    }

    /// Adds a stage to the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage is invalid on its own or its name is
    /// already taken.
    pub fn stage(mut self, spec: StageSpec) -> Result<Self, PipelineValidationError> {
        self.add_stage_spec(spec)?;
        Ok(self)
    }

    /// Adds a stage with a specification.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn add_stage_spec(&mut self, spec: StageSpec) -> Result<(), PipelineValidationError> {
        spec.validate()?;

        if self.stages.contains_key(&spec.name) {
            return Err(PipelineValidationError::new(format!(
                "Stage '{}' is declared twice",
                spec.name
            ))
            .with_stages(vec![spec.name.clone()])
            .with_error_info(
                ContractErrorInfo::new(
                    "PIPELINE-DUPLICATE",
                    format!("Stage name '{}' is already taken", spec.name),
                )
                .with_fix_hint("Give every stage a unique name."),
            ));
        }

        self.stage_order.push(spec.name.clone());
        self.stages.insert(spec.name.clone(), spec);
        Ok(())
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipeline is empty, a dependency names an
    /// unknown stage, or the dependencies form a cycle.
    pub fn build(self) -> Result<StageGraph, PipelineValidationError> {
        if self.stages.is_empty() {
            return Err(PipelineValidationError::new("Pipeline has no stages")
                .with_error_info(
                    ContractErrorInfo::new("PIPELINE-EMPTY", "Cannot build an empty pipeline")
                        .with_fix_hint("Add at least one stage to the pipeline before building."),
                ));
        }

        self.check_dependencies()?;
        self.detect_cycles()?;

        let order = self.topological_order();
        let mut stages = self.stages;
        let ordered = order
            .iter()
            .filter_map(|name| stages.remove(name))
            .collect();

        Ok(StageGraph::new(self.name, ordered))
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    fn check_dependencies(&self) -> Result<(), PipelineValidationError> {
        for name in &self.stage_order {
            let Some(spec) = self.stages.get(name) else {
                continue;
            };
            if let Some(dep) = spec
                .dependencies
                .iter()
                .find(|dep| !self.stages.contains_key(*dep))
            {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{}' depends on unknown stage '{}'",
                    spec.name, dep
                ))
                .with_stages(vec![spec.name.clone(), dep.clone()])
                .with_error_info(
                    ContractErrorInfo::new(
                        "PIPELINE-MISSING_DEP",
                        format!("Dependency '{dep}' not found"),
                    )
                    .with_fix_hint("Declare the dependency as a stage of the same pipeline.")
                    .with_context_entry("pipeline", self.name.clone()),
                ));
            }
        }
        Ok(())
    }

    /// Detects cycles in the dependency graph.
    fn detect_cycles(&self) -> Result<(), CycleDetectedError> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for name in &self.stage_order {
            if !visited.contains(name.as_str()) {
                if let Some(cycle) = self.dfs_cycle(name, &mut visited, &mut rec_stack, &mut path) {
                    return Err(CycleDetectedError::new(cycle));
                }
            }
        }

        Ok(())
    }

    fn dfs_cycle<'s>(
        &'s self,
        node: &'s str,
        visited: &mut HashSet<&'s str>,
        rec_stack: &mut HashSet<&'s str>,
        path: &mut Vec<&'s str>,
    ) -> Option<Vec<String>> {
        visited.insert(node);
        rec_stack.insert(node);
        path.push(node);

        if let Some(spec) = self.stages.get(node) {
            for dep in &spec.dependencies {
                if !visited.contains(dep.as_str()) {
                    if let Some(cycle) = self.dfs_cycle(dep, visited, rec_stack, path) {
                        return Some(cycle);
                    }
                } else if rec_stack.contains(dep.as_str()) {
                    let start = path.iter().position(|n| *n == dep.as_str()).unwrap_or(0);
                    let mut cycle: Vec<String> = path[start..].iter().map(ToString::to_string).collect();
                    cycle.push(dep.clone());
                    return Some(cycle);
                }
            }
        }

        path.pop();
        rec_stack.remove(node);
        None
    }

    /// Kahn's algorithm; among ready stages the earliest declared goes first.
    fn topological_order(&self) -> Vec<String> {
        let mut placed: HashSet<&str> = HashSet::with_capacity(self.stages.len());
        let mut order = Vec::with_capacity(self.stages.len());

        while order.len() < self.stage_order.len() {
            let next = self.stage_order.iter().find(|name| {
                !placed.contains(name.as_str())
                    && self.stages.get(*name).is_some_and(|spec| {
                        spec.dependencies.iter().all(|dep| placed.contains(dep.as_str()))
                    })
            });
            // Cycles are rejected before ordering.
            let Some(next) = next else { break };
            placed.insert(next.as_str());
            order.push(next.clone());
        }

        order
    }
}

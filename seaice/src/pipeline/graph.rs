//! Validated, topologically ordered stage graph.

use super::StageSpec;

/// A directed acyclic graph of stages, stored in execution order.
///
/// Built by [`PipelineBuilder`](super::PipelineBuilder); the topology is
/// fixed for the lifetime of the graph.
#[derive(Debug)]
pub struct StageGraph {
    /// The pipeline name.
    name: String,
    /// Stage specifications, topologically sorted.
    stages: Vec<StageSpec>,
}

impl StageGraph {
    pub(crate) fn new(name: String, stages: Vec<StageSpec>) -> Self {
        Self { name, stages }
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

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn execution_order(&self) -> Vec<&str> {
        self.stages.iter().map(|spec| spec.name.as_str()).collect()
    }

    /// Iterates stage specifications in execution order.
    pub fn stages(&self) -> impl Iterator<Item = &StageSpec> {
        self.stages.iter()
    }

    /// Looks up a stage by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&StageSpec> {
        self.stages.iter().find(|spec| spec.name == name)
    }

    /// Names of every stage that transitively depends on `name`, in
    /// execution order.
    #[must_use]
    pub fn downstream_of<'a>(&'a self, name: &'a str) -> Vec<&'a str> {
        let mut affected: Vec<&'a str> = vec![name];
        for spec in &self.stages {
            if spec.dependencies.iter().any(|dep| affected.contains(&dep.as_str())) {
                affected.push(spec.name.as_str());
            }
        }
        affected.split_off(1)
    }
}

#[cfg(test)]
mod tests {
    use super::super::PipelineBuilder;
    use super::*;
    use crate::core::ArtifactKind;
    use crate::testing::ScriptedStage;
    use std::sync::Arc;

    fn graph() -> StageGraph {
        let spec = |name: &str, deps: &[&str]| {
            StageSpec::new(name, ArtifactKind::Thumbnail, Arc::new(ScriptedStage::new(name)))
                .with_dependencies(deps.iter().copied())
        };
        PipelineBuilder::new("seaice")
            .stage(spec("fetch", &[]))
            .and_then(|b| b.stage(spec("extract", &["fetch"])))
            .and_then(|b| b.stage(spec("thumbnail", &["extract"])))
            .and_then(|b| b.stage(spec("analyze", &["extract"])))
            .and_then(|b| b.stage(spec("report", &["extract", "analyze"])))
            .and_then(PipelineBuilder::build)
            .unwrap()
    }

    #[test]
    fn test_graph_accessors() {
        let graph = graph();
        assert_eq!(graph.name(), "seaice");
        assert_eq!(graph.stage_count(), 5);
        assert_eq!(graph.get("analyze").map(|s| s.dependencies.len()), Some(1));
        assert!(graph.get("missing").is_none());
    }

    #[test]
    fn test_downstream_of() {
        let graph = graph();
        assert_eq!(graph.downstream_of("analyze"), vec!["report"]);
        assert_eq!(
            graph.downstream_of("extract"),
            vec!["thumbnail", "analyze", "report"]
        );
        assert!(graph.downstream_of("report").is_empty());
    }
}

//! The sea-ice stages and the pipeline that wires them together.
//!
//! ```text
//! fetch -> extract -> thumbnail
//!              \----> analyze -> report
//! ```
//!
//! `report` also reads `extract`, re-reading the original raster from the
//! store because `analyze` took ownership of the in-memory grid.

mod analyze;
mod extract;
mod fetch;
mod report;
mod thumbnail;

pub use analyze::AnalyzeStage;
pub use extract::ExtractStage;
pub use fetch::FetchStage;
pub use report::ReportStage;
pub use thumbnail::ThumbnailStage;

use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::core::ArtifactKind;
use crate::errors::{PipelineValidationError, SeaIceError};
use crate::pipeline::{PipelineBuilder, PipelineRunner, StageGraph, StageSpec};
use crate::ports::Collaborators;
use crate::store::ArtifactStore;

/// Archive download.
pub const FETCH: &str = "fetch";
/// Raster extraction.
pub const EXTRACT: &str = "extract";
/// Preview of the extracted raster.
pub const THUMBNAIL: &str = "thumbnail";
/// Hazard labeling.
pub const ANALYZE: &str = "analyze";
/// Side-by-side report.
pub const REPORT: &str = "report";

/// Name of the assembled pipeline.
pub const PIPELINE_NAME: &str = "seaice";

pub(crate) fn markdown_image(alt: &str, url: &str) -> String {
    format!("![{alt}]({url})")
}

/// Builds the five-stage sea-ice graph.
///
/// # Errors
///
/// Only fails if the stage table below is inconsistent.
pub fn seaice_pipeline(collaborators: &Collaborators) -> Result<StageGraph, PipelineValidationError> {
    PipelineBuilder::new(PIPELINE_NAME)
        .stage(StageSpec::new(
            FETCH,
            ArtifactKind::RawArchive,
            Arc::new(FetchStage::new(collaborators.fetcher.clone())),
        ))?
        .stage(
            StageSpec::new(
                EXTRACT,
                ArtifactKind::ExtractedRaster,
                Arc::new(ExtractStage::new(collaborators.extractor.clone())),
            )
            .with_dependency(FETCH),
        )?
        .stage(
            StageSpec::new(
                THUMBNAIL,
                ArtifactKind::Thumbnail,
                Arc::new(ThumbnailStage::new(collaborators.thumbnails.clone())),
            )
            .with_dependency(EXTRACT),
        )?
        .stage(
            StageSpec::new(
                ANALYZE,
                ArtifactKind::AnalyzedRaster,
                Arc::new(AnalyzeStage::new(collaborators.thumbnails.clone())),
            )
            .with_dependency(EXTRACT),
        )?
        .stage(
            StageSpec::new(
                REPORT,
                ArtifactKind::ReportImage,
                Arc::new(ReportStage::new(collaborators.reports.clone())),
            )
            .with_dependencies([EXTRACT, ANALYZE]),
        )?
        .build()
}

/// Validates `config` and returns a runner for the sea-ice pipeline that
/// publishes provenance through the collaborators' publisher.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
pub fn seaice_runner(
    collaborators: &Collaborators,
    store: Arc<dyn ArtifactStore>,
    config: PipelineConfig,
) -> Result<PipelineRunner, SeaIceError> {
    config.validate()?;
    let graph = seaice_pipeline(collaborators)?;
    Ok(PipelineRunner::new(graph, store, config).with_publisher(collaborators.publisher.clone()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;

    use crate::config::PipelineConfig;
    use crate::core::{ArtifactKind, ArtifactName, Payload, RunKey, StageResult};
    use crate::errors::SeaIceError;
    use crate::grid::Grid;
    use crate::pipeline::{Stage, StageContext, StageInputs};
    use crate::store::{ArtifactStore, InMemoryArtifactStore};

    /// Runs a single stage against hand-made upstream results.
    pub(crate) struct Harness {
        pub run_key: RunKey,
        pub config: PipelineConfig,
        pub store: InMemoryArtifactStore,
        completed: HashMap<String, StageResult>,
    }

    impl Harness {
        pub(crate) fn new() -> Self {
            Self {
                run_key: "20240105".parse().unwrap(),
                config: PipelineConfig::default(),
                store: InMemoryArtifactStore::new(),
                completed: HashMap::new(),
            }
        }

        pub(crate) fn complete_asset(&mut self, stage: &str, kind: ArtifactKind) {
            let name = ArtifactName::new(self.run_key, kind);
            self.store.insert_asset(name);
            self.completed.insert(
                stage.to_string(),
                StageResult::asset(stage, name, self.store.locate(&name)),
            );
        }

        pub(crate) fn complete_grid(&mut self, stage: &str, kind: ArtifactKind, grid: Grid) {
            let name = ArtifactName::new(self.run_key, kind);
            self.store.insert_grid(name, grid.clone());
            self.completed
                .insert(stage.to_string(), StageResult::grid(stage, name, grid));
        }

        pub(crate) fn upstream_grid(&self, stage: &str) -> Option<&Grid> {
            self.completed
                .get(stage)
                .and_then(|result| match &result.payload {
                    Payload::Grid(grid) => Some(grid),
                    Payload::Asset { .. } => None,
                })
        }

        pub(crate) fn run(
            &mut self,
            stage: &dyn Stage,
            kind: ArtifactKind,
            deps: &[&str],
        ) -> Result<StageResult, SeaIceError> {
            let declared: Vec<String> = deps.iter().map(ToString::to_string).collect();
            let artifact = ArtifactName::new(self.run_key, kind);
            let inputs = StageInputs::new(stage.name(), &declared, &mut self.completed, &self.store);
            let mut ctx = StageContext::new(artifact, &self.config, &self.store, inputs);
            stage.run(&mut ctx)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::testing::TestCollaborators;

    #[test]
    fn test_pipeline_topology() {
        let fakes = TestCollaborators::new(Grid::new(1, 1).unwrap());
        let graph = seaice_pipeline(&fakes.collaborators()).unwrap();

        assert_eq!(graph.name(), "seaice");
        assert_eq!(
            graph.execution_order(),
            vec![FETCH, EXTRACT, THUMBNAIL, ANALYZE, REPORT]
        );
        assert_eq!(graph.get(REPORT).unwrap().dependencies, vec![EXTRACT, ANALYZE]);
        assert_eq!(graph.get(ANALYZE).unwrap().artifact, ArtifactKind::AnalyzedRaster);
    }

    #[test]
    fn test_runner_rejects_invalid_config() {
        let fakes = TestCollaborators::new(Grid::new(1, 1).unwrap());
        let mut config = PipelineConfig::default();
        config.hazard.hazard_label = config.hazard.no_data;

        let err = seaice_runner(
            &fakes.collaborators(),
            Arc::new(crate::store::InMemoryArtifactStore::new()),
            config,
        )
        .unwrap_err();
        assert!(matches!(err, SeaIceError::Config(_)));
    }
}

use std::fmt;
use std::sync::Arc;

use tracing::info;

use super::{markdown_image, ANALYZE, EXTRACT};
use crate::core::{ArtifactKind, ArtifactName, StageResult};
use crate::errors::SeaIceError;
use crate::pipeline::{Stage, StageContext};
use crate::ports::ThumbnailRenderer;

/// Marks large contiguous high-concentration regions as hazards.
///
/// Takes the extracted grid by value, relabels it in place, maps the hazard
/// label to the hazard color in the palette and renders the analyzed
/// thumbnail next to the analyzed raster.
#[derive(Clone)]
pub struct AnalyzeStage {
    renderer: Arc<dyn ThumbnailRenderer>,
}

impl AnalyzeStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(renderer: Arc<dyn ThumbnailRenderer>) -> Self {
        Self { renderer }
    }
}

impl fmt::Debug for AnalyzeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzeStage").finish_non_exhaustive()
    }
}

impl Stage for AnalyzeStage {
    fn name(&self) -> &str {
        ANALYZE
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<StageResult, SeaIceError> {
        let criteria = ctx.config().hazard;
        let mut grid = ctx.inputs_mut().take_grid(EXTRACT)?;

        let summary = criteria.labeler().apply(&mut grid);
        grid.set_color_table(criteria.hazard_label, criteria.hazard_color);
        info!(
            regions = summary.regions,
            cells = summary.cells,
            largest_region = summary.largest_region,
            "Hazard regions labeled"
        );

        let thumb_path = ctx.side_output_path(ArtifactKind::AnalyzedThumbnail)?;
        self.renderer
            .render_thumbnail(&grid, &thumb_path, ctx.config().thumbnail_no_data)?;

        let config = ctx.config();
        let original_png = ArtifactName::new(ctx.run_key(), ArtifactKind::Thumbnail).file_name();
        let analyzed_png = ArtifactName::new(ctx.run_key(), ArtifactKind::AnalyzedThumbnail).file_name();
        let links = format!(
            "{}\r\n{}",
            markdown_image("seaice", &config.thumbnail_url(&original_png)),
            markdown_image("seaice_analysis", &config.thumbnail_url(&analyzed_png)),
        );

        let digest = grid.digest();
        Ok(StageResult::grid(ANALYZE, ctx.artifact(), grid)
            .with_note("thumbnail", links)
            .with_note("regions", summary.regions.to_string())
            .with_note("cells", summary.cells.to_string())
            .with_note("largest_region", summary.largest_region.to_string())
            .with_note("digest", digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Grid, Rgba};
    use crate::stages::test_support::Harness;
    use crate::testing::RecordingRenderer;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn scenario() -> Grid {
        Grid::from_rows(&[[85_i32, 85, 0], [0, 85, 0], [0, 0, 85]]).unwrap()
    }

    #[test]
    fn test_labels_hazards_and_colors_them() {
        let mut harness = Harness::new();
        harness.complete_grid(EXTRACT, ArtifactKind::ExtractedRaster, scenario());
        let renderer = Arc::new(RecordingRenderer::new());

        let result = harness
            .run(&AnalyzeStage::new(renderer.clone()), ArtifactKind::AnalyzedRaster, &[EXTRACT])
            .unwrap();

        let expected = Grid::from_rows(&[[255_i32, 255, 0], [0, 255, 0], [0, 0, 255]]).unwrap();
        let analyzed = result.payload.as_grid().unwrap();
        assert_eq!(analyzed.samples(), expected.samples());
        assert_eq!(analyzed.color_table().get(&255), Some(&Rgba::RED));
        assert_eq!(result.provenance.get("regions"), Some("2"));
        assert_eq!(result.provenance.get("cells"), Some("4"));
        assert_eq!(result.provenance.get("largest_region"), Some("3"));
        assert_eq!(
            result.provenance.get("thumbnail"),
            Some(
                "![seaice](http://localhost:8000/geodata/seaice_thumb/20240105.antarctic.png)\r\n\
                 ![seaice_analysis](http://localhost:8000/geodata/seaice_thumb/20240105.analysis.tif.png)"
            )
        );

        let thumbs = renderer.thumbnails();
        assert_eq!(thumbs.len(), 1);
        assert_eq!(
            thumbs[0].out,
            PathBuf::from("/memory/seaice_thumb/20240105.analysis.tif.png")
        );
        assert_eq!(thumbs[0].digests, vec![expected.digest()]);
    }

    #[test]
    fn test_takes_ownership_of_extracted_grid() {
        let mut harness = Harness::new();
        harness.complete_grid(EXTRACT, ArtifactKind::ExtractedRaster, scenario());

        harness
            .run(
                &AnalyzeStage::new(Arc::new(RecordingRenderer::new())),
                ArtifactKind::AnalyzedRaster,
                &[EXTRACT],
            )
            .unwrap();

        assert!(harness.upstream_grid(EXTRACT).is_none());
    }

    #[test]
    fn test_uses_configured_criteria() {
        let mut harness = Harness::new();
        harness.config.hazard.concentration_threshold = 90;
        harness.config.hazard.hazard_label = 200;
        harness.complete_grid(EXTRACT, ArtifactKind::ExtractedRaster, scenario());

        let result = harness
            .run(
                &AnalyzeStage::new(Arc::new(RecordingRenderer::new())),
                ArtifactKind::AnalyzedRaster,
                &[EXTRACT],
            )
            .unwrap();

        let analyzed = result.payload.as_grid().unwrap();
        assert_eq!(analyzed, &scenario().with_color_table([(200, Rgba::RED)].into()));
        assert_eq!(result.provenance.get("regions"), Some("0"));
    }
}

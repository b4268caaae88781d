use std::fmt;
use std::sync::Arc;

use super::{markdown_image, ANALYZE, EXTRACT, REPORT};
use crate::core::StageResult;
use crate::errors::SeaIceError;
use crate::pipeline::{Stage, StageContext};
use crate::ports::ReportRenderer;

/// Renders the original raster next to a contour plot of the analyzed one.
#[derive(Clone)]
pub struct ReportStage {
    renderer: Arc<dyn ReportRenderer>,
}

impl ReportStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(renderer: Arc<dyn ReportRenderer>) -> Self {
        Self { renderer }
    }
}

impl fmt::Debug for ReportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportStage").finish_non_exhaustive()
    }
}

impl Stage for ReportStage {
    fn name(&self) -> &str {
        REPORT
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<StageResult, SeaIceError> {
        let analyzed = ctx.inputs_mut().take_grid(ANALYZE)?;
        // The extracted grid was handed to analysis, so this re-reads it.
        let original = ctx.inputs().grid(EXTRACT)?;
        let out = ctx.output_path()?;
        self.renderer.render_report(&original, &analyzed, &out)?;

        let png = ctx.artifact().file_name();
        let link = markdown_image("seaice_report", &ctx.config().thumbnail_url(&png));
        Ok(StageResult::asset(REPORT, ctx.artifact(), out).with_note("thumbnail", link))
    }
}

use std::fmt;
use std::sync::Arc;

use super::{markdown_image, EXTRACT, THUMBNAIL};
use crate::core::StageResult;
use crate::errors::SeaIceError;
use crate::pipeline::{Stage, StageContext};
use crate::ports::ThumbnailRenderer;

/// Renders a preview of the extracted raster.
#[derive(Clone)]
pub struct ThumbnailStage {
    renderer: Arc<dyn ThumbnailRenderer>,
}

impl ThumbnailStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(renderer: Arc<dyn ThumbnailRenderer>) -> Self {
        Self { renderer }
    }
}

impl fmt::Debug for ThumbnailStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThumbnailStage").finish_non_exhaustive()
    }
}

impl Stage for ThumbnailStage {
    fn name(&self) -> &str {
        THUMBNAIL
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<StageResult, SeaIceError> {
        let out = ctx.output_path()?;
        let no_data = ctx.config().thumbnail_no_data;
        let grid = ctx.inputs().grid(EXTRACT)?;
        self.renderer.render_thumbnail(&grid, &out, no_data)?;

        let png = ctx.artifact().file_name();
        let link = markdown_image("seaice", &ctx.config().thumbnail_url(&png));
        Ok(StageResult::asset(THUMBNAIL, ctx.artifact(), out).with_note("thumbnail", link))
    }
}

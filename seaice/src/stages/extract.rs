use std::fmt;
use std::sync::Arc;

use tracing::info;

use super::{EXTRACT, FETCH};
use crate::core::StageResult;
use crate::errors::SeaIceError;
use crate::pipeline::{Stage, StageContext};
use crate::ports::RasterExtractor;

/// Pulls the concentration raster out of the archive.
#[derive(Clone)]
pub struct ExtractStage {
    extractor: Arc<dyn RasterExtractor>,
}

impl ExtractStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(extractor: Arc<dyn RasterExtractor>) -> Self {
        Self { extractor }
    }
}

impl fmt::Debug for ExtractStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractStage").finish_non_exhaustive()
    }
}

impl Stage for ExtractStage {
    fn name(&self) -> &str {
        EXTRACT
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<StageResult, SeaIceError> {
        let archive = ctx.inputs().location(FETCH)?;
        let grid = self.extractor.extract(&archive, &ctx.run_key())?;
        let (rows, cols) = grid.dimensions();
        info!(rows, cols, "Raster extracted");

        let digest = grid.digest();
        Ok(StageResult::grid(EXTRACT, ctx.artifact(), grid)
            .with_note("raster", ctx.artifact().file_name())
            .with_note("dimensions", format!("{rows}x{cols}"))
            .with_note("digest", digest))
    }
}

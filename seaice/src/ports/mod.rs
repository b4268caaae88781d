//! Ports to external collaborators.
//!
//! Network retrieval, archive parsing and image rendering are provided by
//! the host application. Stages only see these narrow, synchronous traits;
//! every call may block and every failure maps to the owning stage failing.

#[cfg(feature = "http")]
mod http;
mod publish;

#[cfg(feature = "http")]
pub use http::HttpArchiveFetcher;
pub use publish::{CollectingPublisher, LoggingPublisher, MetadataPublisher, NoOpPublisher};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::RunKey;
use crate::errors::{ExtractError, FetchError, RenderError, StoreError};
use crate::grid::Grid;

/// Retrieves the raw archive for a run.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveFetcher: Send + Sync {
    /// Downloads the archive for `run_key` to `dest` and returns where it landed.
    ///
    /// Implementations must be a no-op when `dest` already holds the archive.
    fn fetch(&self, run_key: &RunKey, dest: &Path) -> Result<PathBuf, FetchError>;
}

/// Parses the archive into a grid and its palette.
pub trait RasterExtractor: Send + Sync {
    /// Extracts the `{run_key}.antarctic.tif` member of `archive`.
    fn extract(&self, archive: &Path, run_key: &RunKey) -> Result<Grid, ExtractError>;
}

/// Renders a grid to a viewable image.
pub trait ThumbnailRenderer: Send + Sync {
    /// Writes an image of `grid` to `out`, treating `no_data` as transparent.
    fn render_thumbnail(&self, grid: &Grid, out: &Path, no_data: u8) -> Result<(), RenderError>;
}

/// Renders the side-by-side report.
pub trait ReportRenderer: Send + Sync {
    /// Writes the original raster next to a contour plot of the analyzed one.
    fn render_report(&self, original: &Grid, analyzed: &Grid, out: &Path) -> Result<(), RenderError>;
}

/// Reads and writes rasters on disk (GeoTIFF in production).
pub trait RasterCodec: Send + Sync {
    /// Writes `grid`, palette included, to `path`.
    fn write_raster(&self, grid: &Grid, path: &Path) -> Result<(), StoreError>;

    /// Reads the raster at `path`.
    fn read_raster(&self, path: &Path) -> Result<Grid, StoreError>;
}

/// The set of collaborators the sea-ice stages need.
#[derive(Clone)]
pub struct Collaborators {
    /// Archive download.
    pub fetcher: Arc<dyn ArchiveFetcher>,
    /// Archive extraction.
    pub extractor: Arc<dyn RasterExtractor>,
    /// Thumbnail rendering.
    pub thumbnails: Arc<dyn ThumbnailRenderer>,
    /// Report rendering.
    pub reports: Arc<dyn ReportRenderer>,
    /// Metadata publishing.
    pub publisher: Arc<dyn MetadataPublisher>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

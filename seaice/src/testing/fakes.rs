//! In-process stand-ins for the external collaborators.

use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::RunKey;
use crate::errors::{ExtractError, FetchError, RenderError, StoreError};
use crate::grid::Grid;
use crate::ports::{
    ArchiveFetcher, Collaborators, CollectingPublisher, RasterCodec, RasterExtractor,
    ReportRenderer, ThumbnailRenderer,
};

fn write_placeholder(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)
}

fn take_failure(counter: &Mutex<usize>) -> bool {
    let mut left = counter.lock();
    if *left > 0 {
        *left -= 1;
        true
    } else {
        false
    }
}

/// Stores grids as JSON. Stands in for the GeoTIFF codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRasterCodec;

impl RasterCodec for JsonRasterCodec {
    fn write_raster(&self, grid: &Grid, path: &Path) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec(grid).map_err(|err| StoreError::Codec {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        fs::write(path, encoded)?;
        Ok(())
    }

    fn read_raster(&self, path: &Path) -> Result<Grid, StoreError> {
        let raw = fs::read(path)?;
        serde_json::from_slice(&raw).map_err(|err| StoreError::Codec {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }
}

/// Records fetches and optionally writes a placeholder archive.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    calls: Mutex<Vec<RunKey>>,
    failures_left: Mutex<usize>,
    write_files: bool,
}

impl FakeFetcher {
    /// Creates a fetcher that writes nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the fetcher write a placeholder file at the destination.
    #[must_use]
    pub fn writing_files(mut self) -> Self {
        self.write_files = true;
        self
    }

    /// Fails the next `times` fetches with a transport error.
    pub fn fail_times(&self, times: usize) {
        *self.failures_left.lock() = times;
    }

    /// Run keys fetched so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RunKey> {
        self.calls.lock().clone()
    }
}

impl ArchiveFetcher for FakeFetcher {
    fn fetch(&self, run_key: &RunKey, dest: &Path) -> Result<PathBuf, FetchError> {
        self.calls.lock().push(*run_key);
        if take_failure(&self.failures_left) {
            return Err(FetchError::Transport {
                url: format!("fake://archives/{run_key}"),
                reason: "simulated outage".to_string(),
            });
        }
        if self.write_files {
            write_placeholder(dest, b"archive").map_err(|err| FetchError::Write {
                path: dest.to_path_buf(),
                reason: err.to_string(),
            })?;
        }
        Ok(dest.to_path_buf())
    }
}

/// Returns a fixed grid for every archive.
#[derive(Debug)]
pub struct FakeExtractor {
    grid: Grid,
    calls: Mutex<Vec<PathBuf>>,
    failures_left: Mutex<usize>,
}

impl FakeExtractor {
    /// Creates an extractor yielding `grid`.
    #[must_use]
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            calls: Mutex::new(Vec::new()),
            failures_left: Mutex::new(0),
        }
    }

    /// Fails the next `times` extractions with a missing-member error.
    pub fn fail_times(&self, times: usize) {
        *self.failures_left.lock() = times;
    }

    /// Archives extracted so far.
    #[must_use]
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().clone()
    }
}

impl RasterExtractor for FakeExtractor {
    fn extract(&self, archive: &Path, run_key: &RunKey) -> Result<Grid, ExtractError> {
        self.calls.lock().push(archive.to_path_buf());
        if take_failure(&self.failures_left) {
            return Err(ExtractError::MissingMember {
                path: archive.to_path_buf(),
                member: format!("data/polarview/27_AMSR2/{run_key}/{run_key}.antarctic.tif"),
            });
        }
        Ok(self.grid.clone())
    }
}

/// One recorded render call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCall {
    /// Output path.
    pub out: PathBuf,
    /// Digests of the grids rendered (one for thumbnails, original then
    /// analyzed for reports).
    pub digests: Vec<String>,
}

/// Records thumbnail and report renders.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    thumbnails: Mutex<Vec<RenderCall>>,
    reports: Mutex<Vec<RenderCall>>,
    report_failures_left: Mutex<usize>,
    write_files: bool,
}

impl RecordingRenderer {
    /// Creates a renderer that writes nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the renderer write placeholder images.
    #[must_use]
    pub fn writing_files(mut self) -> Self {
        self.write_files = true;
        self
    }

    /// Fails the next `times` report renders.
    pub fn fail_reports(&self, times: usize) {
        *self.report_failures_left.lock() = times;
    }

    /// Thumbnail renders so far.
    #[must_use]
    pub fn thumbnails(&self) -> Vec<RenderCall> {
        self.thumbnails.lock().clone()
    }

    /// Report renders so far.
    #[must_use]
    pub fn reports(&self) -> Vec<RenderCall> {
        self.reports.lock().clone()
    }

    fn emit(&self, out: &Path) -> Result<(), RenderError> {
        if self.write_files {
            write_placeholder(out, b"png").map_err(|err| RenderError::new(out, err.to_string()))?;
        }
        Ok(())
    }
}

impl ThumbnailRenderer for RecordingRenderer {
    fn render_thumbnail(&self, grid: &Grid, out: &Path, _no_data: u8) -> Result<(), RenderError> {
        self.thumbnails.lock().push(RenderCall {
            out: out.to_path_buf(),
            digests: vec![grid.digest()],
        });
        self.emit(out)
    }
}

impl ReportRenderer for RecordingRenderer {
    fn render_report(&self, original: &Grid, analyzed: &Grid, out: &Path) -> Result<(), RenderError> {
        self.reports.lock().push(RenderCall {
            out: out.to_path_buf(),
            digests: vec![original.digest(), analyzed.digest()],
        });
        if take_failure(&self.report_failures_left) {
            return Err(RenderError::new(out, "simulated plotting failure"));
        }
        self.emit(out)
    }
}

/// A full set of fakes with handles kept for assertions.
#[derive(Debug, Clone)]
pub struct TestCollaborators {
    /// Archive fetcher.
    pub fetcher: Arc<FakeFetcher>,
    /// Raster extractor.
    pub extractor: Arc<FakeExtractor>,
    /// Thumbnail and report renderer.
    pub renderer: Arc<RecordingRenderer>,
    /// Metadata publisher.
    pub publisher: Arc<CollectingPublisher>,
}

impl TestCollaborators {
    /// Fakes that extract `grid` and write no files (pair with the
    /// in-memory store).
    #[must_use]
    pub fn new(grid: Grid) -> Self {
        Self {
            fetcher: Arc::new(FakeFetcher::new()),
            extractor: Arc::new(FakeExtractor::new(grid)),
            renderer: Arc::new(RecordingRenderer::new()),
            publisher: Arc::new(CollectingPublisher::new()),
        }
    }

    /// Fakes that write placeholder files (pair with the filesystem store).
    #[must_use]
    pub fn writing_files(grid: Grid) -> Self {
        Self {
            fetcher: Arc::new(FakeFetcher::new().writing_files()),
            renderer: Arc::new(RecordingRenderer::new().writing_files()),
            ..Self::new(grid)
        }
    }

    /// The collaborator set handed to the stages.
    #[must_use]
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            fetcher: self.fetcher.clone(),
            extractor: self.extractor.clone(),
            thumbnails: self.renderer.clone(),
            reports: self.renderer.clone(),
            publisher: self.publisher.clone(),
        }
    }
}

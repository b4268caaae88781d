//! Artifact naming.
//!
//! File names are part of the external contract with the thumbnail server
//! and older runs on disk, so they must stay exactly as written here.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::RunKey;

/// The kinds of artifact a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// The downloaded `.tar.gz` archive.
    RawArchive,
    /// The GeoTIFF pulled out of the archive.
    ExtractedRaster,
    /// PNG preview of the extracted raster.
    Thumbnail,
    /// The raster with hazard regions relabeled.
    AnalyzedRaster,
    /// PNG preview of the analyzed raster.
    AnalyzedThumbnail,
    /// Side-by-side report image.
    ReportImage,
}

impl ArtifactKind {
    /// All kinds, in pipeline order.
    pub const ALL: [Self; 6] = [
        Self::RawArchive,
        Self::ExtractedRaster,
        Self::Thumbnail,
        Self::AnalyzedRaster,
        Self::AnalyzedThumbnail,
        Self::ReportImage,
    ];

    /// The suffix appended to the run key.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::RawArchive => "antarctic.tar.gz",
            Self::ExtractedRaster => "antarctic.tif",
            Self::Thumbnail => "antarctic.png",
            Self::AnalyzedRaster => "analysis.tif",
            Self::AnalyzedThumbnail => "analysis.tif.png",
            Self::ReportImage => "analysis.report.png",
        }
    }

    /// Whether the artifact is a raster the store persists as a [`Grid`](crate::grid::Grid).
    #[must_use]
    pub const fn is_raster(self) -> bool {
        matches!(self, Self::ExtractedRaster | Self::AnalyzedRaster)
    }

    /// Subdirectory of the artifact root the file lives in.
    #[must_use]
    pub const fn directory(self) -> &'static str {
        match self {
            Self::RawArchive => "source",
            Self::ExtractedRaster | Self::AnalyzedRaster => "seaice",
            Self::Thumbnail | Self::AnalyzedThumbnail | Self::ReportImage => "seaice_thumb",
        }
    }
}

/// Name of a single artifact: a kind scoped to a run key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactName {
    /// The run the artifact belongs to.
    pub run_key: RunKey,
    /// What the artifact is.
    pub kind: ArtifactKind,
}

impl ArtifactName {
    /// Creates a new artifact name.
    #[must_use]
    pub const fn new(run_key: RunKey, kind: ArtifactKind) -> Self {
        Self { run_key, kind }
    }

    /// The file name, e.g. `20240105.antarctic.tif`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.run_key, self.kind.suffix())
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.run_key, self.kind.suffix())
    }
}

//! Artifact storage.
//!
//! The store answers the runner's cache question ("does this stage's
//! artifact already exist for this run?"), receives the write of every
//! completed stage, and re-reads artifacts on cache hits. Artifacts are
//! addressed by [`ArtifactName`] only, so a run never needs to know paths.

mod fs;
mod memory;

pub use fs::FsArtifactStore;
pub use memory::InMemoryArtifactStore;

use std::path::PathBuf;

use crate::core::{ArtifactName, Payload};
use crate::errors::StoreError;
use crate::grid::Grid;

/// A path-addressable artifact store.
pub trait ArtifactStore: Send + Sync {
    /// Whether the artifact exists.
    fn exists(&self, name: &ArtifactName) -> bool;

    /// Where the artifact lives (or will live).
    fn locate(&self, name: &ArtifactName) -> PathBuf;

    /// Returns the artifact's location, ready for a collaborator to write to.
    ///
    /// # Errors
    ///
    /// Returns an error if the location cannot be prepared.
    fn prepare(&self, name: &ArtifactName) -> Result<PathBuf, StoreError> {
        Ok(self.locate(name))
    }

    /// Records a completed stage's artifact.
    ///
    /// Grids are persisted; assets must already have been written by the
    /// collaborator that produced them.
    ///
    /// # Errors
    ///
    /// Returns an error if the grid cannot be written or the asset is missing.
    fn commit(&self, name: &ArtifactName, payload: &Payload) -> Result<(), StoreError>;

    /// Re-reads a raster artifact.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if absent and a codec error if unreadable.
    fn load_grid(&self, name: &ArtifactName) -> Result<Grid, StoreError>;

    /// Re-reads an artifact as a payload: rasters as grids, everything else
    /// as a reference to its location.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the artifact does not exist.
    fn load(&self, name: &ArtifactName) -> Result<Payload, StoreError> {
        if !self.exists(name) {
            return Err(StoreError::NotFound {
                name: name.file_name(),
            });
        }
        if name.kind.is_raster() {
            self.load_grid(name).map(Payload::Grid)
        } else {
            Ok(Payload::asset(self.locate(name)))
        }
    }
}

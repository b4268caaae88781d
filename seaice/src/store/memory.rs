use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;

use super::ArtifactStore;
use crate::core::{ArtifactName, Payload};
use crate::errors::StoreError;
use crate::grid::Grid;

#[derive(Debug, Clone)]
enum Entry {
    Grid(Grid),
    Asset,
}

/// In-memory store for tests and dry runs.
///
/// Locations are virtual paths under a fixed root; nothing touches disk.
/// Asset commits are trusted, since collaborators in tests do not write files.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    entries: Mutex<HashMap<ArtifactName, Entry>>,
    commits: Mutex<Vec<ArtifactName>>,
}

impl InMemoryArtifactStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an asset as if a previous run had produced it.
    pub fn insert_asset(&self, name: ArtifactName) {
        self.entries.lock().insert(name, Entry::Asset);
    }

    /// Seeds a raster as if a previous run had produced it.
    pub fn insert_grid(&self, name: ArtifactName, grid: Grid) {
        self.entries.lock().insert(name, Entry::Grid(grid));
    }

    /// Drops an artifact.
    pub fn remove(&self, name: &ArtifactName) {
        self.entries.lock().remove(name);
    }

    /// Every commit received, in order.
    #[must_use]
    pub fn commits(&self) -> Vec<ArtifactName> {
        self.commits.lock().clone()
    }

    /// Returns the number of stored artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn exists(&self, name: &ArtifactName) -> bool {
        self.entries.lock().contains_key(name)
    }

    fn locate(&self, name: &ArtifactName) -> PathBuf {
        PathBuf::from("/memory")
            .join(name.kind.directory())
            .join(name.file_name())
    }

    fn commit(&self, name: &ArtifactName, payload: &Payload) -> Result<(), StoreError> {
        let entry = match payload {
            Payload::Grid(grid) => Entry::Grid(grid.clone()),
            Payload::Asset { .. } => Entry::Asset,
        };
        self.entries.lock().insert(*name, entry);
        self.commits.lock().push(*name);
        Ok(())
    }

    fn load_grid(&self, name: &ArtifactName) -> Result<Grid, StoreError> {
        match self.entries.lock().get(name) {
            Some(Entry::Grid(grid)) => Ok(grid.clone()),
            Some(Entry::Asset) => Err(StoreError::NotRaster {
                name: name.file_name(),
            }),
            None => Err(StoreError::NotFound {
                name: name.file_name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ArtifactKind;

    fn name(kind: ArtifactKind) -> ArtifactName {
        ArtifactName::new("20240105".parse().unwrap(), kind)
    }

    #[test]
    fn test_commit_and_exists() {
        let store = InMemoryArtifactStore::new();
        let archive = name(ArtifactKind::RawArchive);

        assert!(!store.exists(&archive));
        store
            .commit(&archive, &Payload::asset(store.locate(&archive)))
            .unwrap();

        assert!(store.exists(&archive));
        assert_eq!(store.commits(), vec![archive]);
        assert_eq!(
            store.load(&archive).unwrap().location(),
            Some(PathBuf::from("/memory/source/20240105.antarctic.tar.gz").as_path())
        );
    }

    #[test]
    fn test_grid_roundtrip_is_a_copy() {
        let store = InMemoryArtifactStore::new();
        let raster = name(ArtifactKind::AnalyzedRaster);
        let mut grid = Grid::filled(2, 2, 90).unwrap();

        store.commit(&raster, &Payload::Grid(grid.clone())).unwrap();
        grid.set(0, 0, 1).unwrap();

        assert_eq!(store.load_grid(&raster).unwrap().get(0, 0), Ok(90));
    }

    #[test]
    fn test_asset_is_not_a_raster() {
        let store = InMemoryArtifactStore::new();
        let thumb = name(ArtifactKind::Thumbnail);
        store.insert_asset(thumb);

        assert!(matches!(store.load_grid(&thumb), Err(StoreError::NotRaster { .. })));
        store.remove(&thumb);
        assert!(store.is_empty());
    }
}

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::ArtifactStore;
use crate::core::{ArtifactName, Payload};
use crate::errors::StoreError;
use crate::grid::Grid;
use crate::ports::RasterCodec;

/// Local filesystem store rooted at one directory.
///
/// Layout under the root follows the kind of artifact:
/// `source/` for archives, `seaice/` for rasters and `seaice_thumb/` for
/// images. Rasters are encoded by the supplied [`RasterCodec`].
#[derive(Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
    codec: Arc<dyn RasterCodec>,
}

impl std::fmt::Debug for FsArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsArtifactStore")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl FsArtifactStore {
    /// Creates a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, codec: Arc<dyn RasterCodec>) -> Self {
        Self {
            root: root.into(),
            codec,
        }
    }

    /// The root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactStore for FsArtifactStore {
    fn exists(&self, name: &ArtifactName) -> bool {
        self.locate(name).is_file()
    }

    fn locate(&self, name: &ArtifactName) -> PathBuf {
        self.root.join(name.kind.directory()).join(name.file_name())
    }

    fn prepare(&self, name: &ArtifactName) -> Result<PathBuf, StoreError> {
        let path = self.locate(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(path)
    }

    fn commit(&self, name: &ArtifactName, payload: &Payload) -> Result<(), StoreError> {
        let target = self.prepare(name)?;
        match payload {
            Payload::Grid(grid) => {
                self.codec.write_raster(grid, &target)?;
                debug!(artifact = %name, path = %target.display(), "Wrote raster");
            }
            Payload::Asset { location } => {
                if !location.is_file() {
                    return Err(StoreError::MissingAsset {
                        name: name.file_name(),
                        path: location.clone(),
                    });
                }
                if location != &target {
                    fs::copy(location, &target)?;
                    debug!(artifact = %name, from = %location.display(), "Copied asset into store");
                }
            }
        }
        Ok(())
    }

    fn load_grid(&self, name: &ArtifactName) -> Result<Grid, StoreError> {
        let path = self.locate(name);
        if !path.is_file() {
            return Err(StoreError::NotFound {
                name: name.file_name(),
            });
        }
        if !name.kind.is_raster() {
            return Err(StoreError::NotRaster {
                name: name.file_name(),
            });
        }
        self.codec.read_raster(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ArtifactKind, RunKey};
    use crate::testing::JsonRasterCodec;
    use pretty_assertions::assert_eq;

    fn store(root: &Path) -> FsArtifactStore {
        FsArtifactStore::new(root, Arc::new(JsonRasterCodec))
    }

    fn name(kind: ArtifactKind) -> ArtifactName {
        let key: RunKey = "20240105".parse().unwrap();
        ArtifactName::new(key, kind)
    }

    #[test]
    fn test_layout_follows_kind() {
        let store = store(Path::new("/geodata"));
        assert_eq!(
            store.locate(&name(ArtifactKind::RawArchive)),
            PathBuf::from("/geodata/source/20240105.antarctic.tar.gz")
        );
        assert_eq!(
            store.locate(&name(ArtifactKind::AnalyzedRaster)),
            PathBuf::from("/geodata/seaice/20240105.analysis.tif")
        );
        assert_eq!(
            store.locate(&name(ArtifactKind::AnalyzedThumbnail)),
            PathBuf::from("/geodata/seaice_thumb/20240105.analysis.tif.png")
        );
    }

    #[test]
    fn test_grid_commit_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let raster = name(ArtifactKind::ExtractedRaster);
        let grid = Grid::from_rows(&[[1_i32, 2], [3, 4]]).unwrap();

        assert!(!store.exists(&raster));
        store.commit(&raster, &Payload::Grid(grid.clone())).unwrap();
        assert!(store.exists(&raster));
        assert_eq!(store.load_grid(&raster).unwrap(), grid);

        match store.load(&raster).unwrap() {
            Payload::Grid(loaded) => assert_eq!(loaded, grid),
            Payload::Asset { .. } => panic!("raster must load as a grid"),
        }
    }

    #[test]
    fn test_asset_commit_requires_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let thumb = name(ArtifactKind::Thumbnail);
        let path = store.prepare(&thumb).unwrap();

        let err = store.commit(&thumb, &Payload::asset(&path)).unwrap_err();
        assert!(matches!(err, StoreError::MissingAsset { .. }));

        fs::write(&path, b"png").unwrap();
        store.commit(&thumb, &Payload::asset(&path)).unwrap();
        assert!(store.exists(&thumb));
        assert_eq!(store.load(&thumb).unwrap().location(), Some(path.as_path()));
    }

    #[test]
    fn test_asset_outside_store_is_copied_in() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir.path().join("root"));
        let archive = name(ArtifactKind::RawArchive);
        let elsewhere = dir.path().join("download.tar.gz");
        fs::write(&elsewhere, b"tgz").unwrap();

        store.commit(&archive, &Payload::asset(&elsewhere)).unwrap();
        assert_eq!(fs::read(store.locate(&archive)).unwrap(), b"tgz");
    }

    #[test]
    fn test_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        assert!(matches!(
            store.load(&name(ArtifactKind::ReportImage)),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.load_grid(&name(ArtifactKind::AnalyzedRaster)),
            Err(StoreError::NotFound { .. })
        ));
    }
}

use std::fmt;
use std::sync::Arc;

use tracing::info;

use super::FETCH;
use crate::core::StageResult;
use crate::errors::SeaIceError;
use crate::pipeline::{Stage, StageContext};
use crate::ports::ArchiveFetcher;

/// Downloads the raw archive into the store.
#[derive(Clone)]
pub struct FetchStage {
    fetcher: Arc<dyn ArchiveFetcher>,
}

impl FetchStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(fetcher: Arc<dyn ArchiveFetcher>) -> Self {
        Self { fetcher }
    }
}

impl fmt::Debug for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchStage").finish_non_exhaustive()
    }
}

impl Stage for FetchStage {
    fn name(&self) -> &str {
        FETCH
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<StageResult, SeaIceError> {
        let dest = ctx.output_path()?;
        let archive = self.fetcher.fetch(&ctx.run_key(), &dest)?;
        info!(archive = %archive.display(), "Archive downloaded");

        Ok(StageResult::asset(FETCH, ctx.artifact(), archive)
            .with_note("archive", ctx.artifact().file_name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ArtifactKind, Payload};
    use crate::errors::FetchError;
    use crate::ports::MockArchiveFetcher;
    use crate::stages::test_support::Harness;
    use mockall::predicate::{always, eq};
    use std::path::{Path, PathBuf};

    #[test]
    fn test_fetches_into_store_location() {
        let mut harness = Harness::new();
        let mut fetcher = MockArchiveFetcher::new();
        fetcher
            .expect_fetch()
            .with(eq(harness.run_key), always())
            .times(1)
            .returning(|_, dest| Ok(dest.to_path_buf()));

        let stage = FetchStage::new(Arc::new(fetcher));
        let result = harness.run(&stage, ArtifactKind::RawArchive, &[]).unwrap();

        assert_eq!(
            result.payload.location(),
            Some(Path::new("/memory/source/20240105.antarctic.tar.gz"))
        );
        assert_eq!(result.provenance.get("archive"), Some("20240105.antarctic.tar.gz"));
    }

    #[test]
    fn test_fetch_error_is_retryable() {
        let mut harness = Harness::new();
        let mut fetcher = MockArchiveFetcher::new();
        fetcher.expect_fetch().returning(|key, _| {
            Err(FetchError::Status {
                url: format!("https://www.polarview.aq/images/27_AMSR2/{key}"),
                status: 404,
            })
        });

        let err = harness
            .run(&FetchStage::new(Arc::new(fetcher)), ArtifactKind::RawArchive, &[])
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_fetcher_may_return_another_location() {
        let mut harness = Harness::new();
        let mut fetcher = MockArchiveFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_, _| Ok(PathBuf::from("/downloads/latest.tar.gz")));

        let result = harness
            .run(&FetchStage::new(Arc::new(fetcher)), ArtifactKind::RawArchive, &[])
            .unwrap();
        assert!(matches!(result.payload, Payload::Asset { .. }));
        assert_eq!(result.payload.location(), Some(Path::new("/downloads/latest.tar.gz")));
    }
}

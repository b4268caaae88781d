//! # Seaice
//!
//! Daily ingestion of the Antarctic sea-ice concentration product with
//! hazard region detection.
//!
//! Each run is scoped to a date (its [`RunKey`](core::RunKey)) and walks a
//! small stage graph:
//!
//! - **fetch**: download the daily archive
//! - **extract**: pull the concentration raster out of it
//! - **thumbnail**: render a preview of the raster
//! - **analyze**: relabel large contiguous high-concentration regions as hazards
//! - **report**: render the original and analyzed rasters side by side
//!
//! Every stage writes one named artifact to an [`ArtifactStore`](store::ArtifactStore).
//! A stage whose artifact already exists is not run again, so re-running a
//! failed day resumes where it stopped.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use seaice::prelude::*;
//!
//! let config = PipelineConfig::from_json_file("seaice.json")?;
//! let store = Arc::new(FsArtifactStore::new(&config.root_dir, codec));
//! let runner = seaice_runner(&collaborators, store, config)?;
//!
//! let report = runner.run().ensure_success()?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod errors;
pub mod grid;
pub mod observability;
pub mod pipeline;
pub mod ports;
pub mod stages;
pub mod store;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{FetchConfig, PipelineConfig};
    pub use crate::core::{ArtifactKind, ArtifactName, Payload, Provenance, RunKey, StageResult, StageStatus};
    pub use crate::errors::{PipelineValidationError, SeaIceError, StoreError};
    pub use crate::grid::{Grid, HazardCriteria, RegionLabeler, Rgba};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{
        CachePolicy, CancellationToken, FailureMode, PipelineBuilder, PipelineRunner, RunReport,
        Stage, StageContext, StageGraph, StageSpec,
    };
    #[cfg(feature = "http")]
    pub use crate::ports::HttpArchiveFetcher;
    pub use crate::ports::{
        ArchiveFetcher, Collaborators, LoggingPublisher, MetadataPublisher, RasterCodec,
        RasterExtractor, ReportRenderer, ThumbnailRenderer,
    };
    pub use crate::stages::{seaice_pipeline, seaice_runner};
    pub use crate::store::{ArtifactStore, FsArtifactStore, InMemoryArtifactStore};
}

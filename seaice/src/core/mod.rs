//! Core domain model types.
//!
//! This module contains the fundamental types used throughout the pipeline:
//! - Run keys and artifact naming
//! - Stage status
//! - Stage results and provenance

mod artifact;
mod result;
mod run_key;
mod status;

pub use artifact::{ArtifactKind, ArtifactName};
pub use result::{Payload, Provenance, ResultId, StageResult};
pub use run_key::RunKey;
pub use status::StageStatus;

//! Testing utilities for sea-ice pipelines.
//!
//! This module provides:
//! - Fakes for every external collaborator
//! - A JSON raster codec for filesystem-store tests
//! - Scripted stages for exercising the runner

mod fakes;
mod stages;

pub use fakes::{
    FakeExtractor, FakeFetcher, JsonRasterCodec, RecordingRenderer, RenderCall, TestCollaborators,
};
pub use stages::ScriptedStage;

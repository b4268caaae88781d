//! Pipeline building and execution.
//!
//! This module provides:
//! - Stage definitions and the stage trait
//! - A builder that validates and orders stages
//! - The sequential runner with artifact caching
//! - Failure modes, cancellation and run reports

mod builder;
mod cancellation;
mod failure;
mod graph;
mod inputs;
mod report;
mod runner;
mod stage;

pub use builder::PipelineBuilder;
pub use cancellation::CancellationToken;
pub use failure::FailureMode;
pub use graph::StageGraph;
pub use inputs::{StageContext, StageInputs};
pub use report::{RunReport, StageFailure, StageOutcome};
pub use runner::PipelineRunner;
pub use stage::{CachePolicy, FnStage, Stage, StageSpec};

//! Scripted stages for exercising the runner.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::core::{Provenance, StageResult};
use crate::errors::{RenderError, SeaIceError};
use crate::grid::Grid;
use crate::pipeline::{CancellationToken, Stage, StageContext};

/// A stage whose behaviour is set up front and whose calls are recorded.
///
/// By default it succeeds with an asset at its declared artifact location.
/// Every run reads each declared upstream, so a missing input surfaces as
/// the stage failing.
#[derive(Debug)]
pub struct ScriptedStage {
    name: String,
    grid: Option<Grid>,
    notes: Provenance,
    calls: Mutex<usize>,
    failures_left: Mutex<usize>,
    failure_reason: Mutex<String>,
    seen_upstream: Mutex<Vec<String>>,
    cancel: Mutex<Option<Arc<CancellationToken>>>,
}

impl ScriptedStage {
    /// Creates a stage that succeeds with an asset.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            grid: None,
            notes: Provenance::new(),
            calls: Mutex::new(0),
            failures_left: Mutex::new(0),
            failure_reason: Mutex::new(String::new()),
            seen_upstream: Mutex::new(Vec::new()),
            cancel: Mutex::new(None),
        }
    }

    /// Makes the stage produce `grid` instead of an asset.
    #[must_use]
    pub fn producing_grid(mut self, grid: Grid) -> Self {
        self.grid = Some(grid);
        self
    }

    /// Adds a provenance note to every result.
    #[must_use]
    pub fn with_note(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.notes.insert(key, value);
        self
    }

    /// Fails the next `times` runs with `reason`.
    pub fn fail_times(&self, times: usize, reason: impl Into<String>) {
        *self.failures_left.lock() = times;
        *self.failure_reason.lock() = reason.into();
    }

    /// Requests cancellation on `token` after each successful run.
    pub fn cancel_after_run(&self, token: Arc<CancellationToken>) {
        *self.cancel.lock() = Some(token);
    }

    /// Returns the number of times the run function was invoked.
    #[must_use]
    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }

    /// Upstream stages read during the most recent run.
    #[must_use]
    pub fn seen_upstream(&self) -> Vec<String> {
        self.seen_upstream.lock().clone()
    }
}

impl Stage for ScriptedStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<StageResult, SeaIceError> {
        *self.calls.lock() += 1;

        let upstream: Vec<String> = ctx
            .inputs()
            .declared()
            .iter()
            .map(|dep| ctx.inputs().get(dep).map(|result| result.source_stage().to_string()))
            .collect::<Result<_, _>>()?;
        *self.seen_upstream.lock() = upstream;

        let out = ctx.output_path()?;
        {
            let mut left = self.failures_left.lock();
            if *left > 0 {
                *left -= 1;
                return Err(RenderError::new(out, self.failure_reason.lock().clone()).into());
            }
        }

        let mut result = match &self.grid {
            Some(grid) => StageResult::grid(&self.name, ctx.artifact(), grid.clone()),
            None => StageResult::asset(&self.name, ctx.artifact(), out),
        };
        result.provenance = self.notes.clone();

        if let Some(token) = self.cancel.lock().as_ref() {
            token.cancel("stop requested");
        }
        Ok(result)
    }
}

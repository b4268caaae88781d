//! Sequential pipeline runner.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, info, info_span, warn};

use super::{
    CachePolicy, CancellationToken, RunReport, StageContext, StageFailure, StageGraph, StageInputs,
    StageOutcome, StageSpec,
};
use crate::config::PipelineConfig;
use crate::core::{ArtifactName, RunKey, StageResult, StageStatus};
use crate::errors::SeaIceError;
use crate::observability::StageTimer;
use crate::ports::{MetadataPublisher, NoOpPublisher};
use crate::store::ArtifactStore;

/// Runs a [`StageGraph`] one stage at a time for a single run key.
///
/// For each stage, in topological order:
/// 1. stop if cancellation was requested;
/// 2. leave the stage pending if an upstream did not complete;
/// 3. if the declared artifact exists, re-read it instead of running;
/// 4. otherwise run the stage and commit its artifact to the store.
///
/// A failure halts the run under [`FailureMode::FailFast`](super::FailureMode);
/// completed artifacts are never rolled back, so re-running with the same
/// key resumes at the first incomplete stage.
pub struct PipelineRunner {
    graph: StageGraph,
    store: Arc<dyn ArtifactStore>,
    config: PipelineConfig,
    publisher: Arc<dyn MetadataPublisher>,
    cancellation: Arc<CancellationToken>,
}

impl std::fmt::Debug for PipelineRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("graph", &self.graph)
            .field("failure_mode", &self.config.failure_mode)
            .finish_non_exhaustive()
    }
}

impl PipelineRunner {
    /// Creates a runner.
    #[must_use]
    pub fn new(graph: StageGraph, store: Arc<dyn ArtifactStore>, config: PipelineConfig) -> Self {
        Self {
            graph,
            store,
            config,
            publisher: Arc::new(NoOpPublisher),
            cancellation: CancellationToken::new(),
        }
    }

    /// Sets where stage provenance is published.
    #[must_use]
    pub fn with_publisher(mut self, publisher: Arc<dyn MetadataPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    /// Sets the cancellation token checked between stages.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancellation = token;
        self
    }

    /// The stage graph.
    #[must_use]
    pub const fn graph(&self) -> &StageGraph {
        &self.graph
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> Arc<CancellationToken> {
        Arc::clone(&self.cancellation)
    }

    /// Runs the pipeline for the configured run key (yesterday by default).
    pub fn run(&self) -> RunReport {
        self.run_for(self.config.resolve_run_key())
    }

    /// Runs the pipeline for `run_key`.
    pub fn run_for(&self, run_key: RunKey) -> RunReport {
        let mut report = RunReport::new(self.graph.name(), run_key);
        let span = info_span!(
            "pipeline_run",
            pipeline = %self.graph.name(),
            run_key = %run_key,
            execution_id = %report.execution_id,
        );
        let _enter = span.enter();
        let run_timer = StageTimer::start(self.graph.name());

        report.outcomes = self
            .graph
            .stages()
            .map(|spec| StageOutcome::pending(&spec.name, ArtifactName::new(run_key, spec.artifact).file_name()))
            .collect();
        let mut results: HashMap<String, StageResult> = HashMap::new();

        info!(stages = self.graph.stage_count(), "Pipeline run started");

        for (index, spec) in self.graph.stages().enumerate() {
            if self.cancellation.is_cancelled() {
                let reason = self.cancellation.reason().unwrap_or_default();
                warn!(stage = %spec.name, reason = %reason, "Run cancelled before stage");
                report.cancelled = Some(reason);
                break;
            }

            if let Some(blocked) = spec.dependencies.iter().find(|dep| !results.contains_key(*dep)) {
                warn!(stage = %spec.name, upstream = %blocked, "Upstream did not complete, leaving stage pending");
                report.outcomes[index].error = Some(format!("upstream '{blocked}' did not complete"));
                continue;
            }

            match self.run_stage(spec, run_key, &mut results, &mut report.outcomes[index]) {
                Ok(result) => {
                    if !result.cache_hit && !result.provenance.is_empty() {
                        self.publisher.publish(&spec.name, &result.provenance);
                    }
                    results.insert(spec.name.clone(), result);
                }
                Err(err) => {
                    error!(
                        stage = %spec.name,
                        kind = err.kind(),
                        retryable = err.is_retryable(),
                        downstream = ?self.graph.downstream_of(&spec.name),
                        error = %err,
                        "Stage failed"
                    );
                    report.outcomes[index].error = Some(err.to_string());
                    report.failures.push(StageFailure::new(&spec.name, run_key, &err));
                    if self.config.failure_mode.halts_on_failure() {
                        break;
                    }
                }
            }
        }

        report.duration_ms = run_timer.finish();
        info!(
            completed = report.completed_stages().len(),
            cache_hits = report.cache_hits().len(),
            failures = report.failures.len(),
            duration_ms = report.duration_ms,
            "Pipeline run finished"
        );
        report
    }

    fn run_stage(
        &self,
        spec: &StageSpec,
        run_key: RunKey,
        results: &mut HashMap<String, StageResult>,
        outcome: &mut StageOutcome,
    ) -> Result<StageResult, SeaIceError> {
        let artifact = ArtifactName::new(run_key, spec.artifact);
        let span = info_span!("stage", stage = %spec.name, artifact = %artifact);
        let _enter = span.enter();
        let timer = StageTimer::start(&spec.name);

        let attempt = match self.cached(spec, artifact) {
            Ok(Some(result)) => {
                transition(outcome, StageStatus::Completed);
                outcome.cache_hit = true;
                outcome.duration_ms = timer.finish();
                info!(cache_hit = true, duration_ms = outcome.duration_ms, "Artifact exists, skipping stage");
                return Ok(result);
            }
            other => {
                transition(outcome, StageStatus::Running);
                debug!("Stage running");
                other.and_then(|_| self.execute(spec, artifact, results))
            }
        };

        outcome.duration_ms = timer.finish();
        match attempt {
            Ok(result) => {
                transition(outcome, StageStatus::Completed);
                info!(cache_hit = false, duration_ms = outcome.duration_ms, "Stage completed");
                Ok(result)
            }
            Err(err) => {
                transition(outcome, StageStatus::Failed);
                Err(err)
            }
        }
    }

    fn cached(&self, spec: &StageSpec, artifact: ArtifactName) -> Result<Option<StageResult>, SeaIceError> {
        if spec.cache == CachePolicy::AlwaysRun || !self.store.exists(&artifact) {
            return Ok(None);
        }
        let payload = self.store.load(&artifact)?;
        Ok(Some(StageResult::new(&spec.name, artifact, payload).cached()))
    }

    fn execute(
        &self,
        spec: &StageSpec,
        artifact: ArtifactName,
        results: &mut HashMap<String, StageResult>,
    ) -> Result<StageResult, SeaIceError> {
        let result = {
            let inputs = StageInputs::new(&spec.name, &spec.dependencies, results, self.store.as_ref());
            let mut ctx = StageContext::new(artifact, &self.config, self.store.as_ref(), inputs);
            spec.runner.run(&mut ctx)?
        };
        self.store.commit(&artifact, &result.payload)?;
        Ok(result)
    }
}

fn transition(outcome: &mut StageOutcome, next: StageStatus) {
    debug_assert!(
        outcome.status.can_transition_to(next),
        "illegal transition {} -> {next} for '{}'",
        outcome.status,
        outcome.stage
    );
    outcome.status = next;
}

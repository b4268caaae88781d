//! Run reports.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{RunKey, StageStatus};
use crate::errors::SeaIceError;

/// What happened to one stage during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutcome {
    /// Stage name.
    pub stage: String,
    /// Final status for this run.
    pub status: StageStatus,
    /// Whether the stage was satisfied by an existing artifact.
    pub cache_hit: bool,
    /// File name of the declared artifact.
    pub artifact: String,
    /// Wall time spent on the stage, cache checks included.
    pub duration_ms: f64,
    /// Error message if the stage failed or was skipped.
    pub error: Option<String>,
}

impl StageOutcome {
    pub(crate) fn pending(stage: impl Into<String>, artifact: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            status: StageStatus::Pending,
            cache_hit: false,
            artifact: artifact.into(),
            duration_ms: 0.0,
            error: None,
        }
    }
}

/// The stage that failed a run, with its root cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    /// Failed stage.
    pub stage: String,
    /// Run key.
    pub run_key: RunKey,
    /// Error class, e.g. `FetchError`.
    pub kind: String,
    /// Root cause, rendered.
    pub cause: String,
    /// Whether re-running with the same key may succeed.
    pub retryable: bool,
}

impl StageFailure {
    pub(crate) fn new(stage: impl Into<String>, run_key: RunKey, err: &SeaIceError) -> Self {
        Self {
            stage: stage.into(),
            run_key,
            kind: err.kind().to_string(),
            cause: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

impl From<StageFailure> for SeaIceError {
    fn from(failure: StageFailure) -> Self {
        Self::StageFailed {
            stage: failure.stage,
            run_key: failure.run_key,
            cause: failure.cause,
            retryable: failure.retryable,
        }
    }
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique id of this invocation.
    pub execution_id: Uuid,
    /// Pipeline name.
    pub pipeline: String,
    /// The run key every artifact was scoped to.
    pub run_key: RunKey,
    /// Per-stage outcomes, in execution order.
    pub outcomes: Vec<StageOutcome>,
    /// Failed stages, in the order they failed.
    pub failures: Vec<StageFailure>,
    /// Cancellation reason, if the run stopped early.
    pub cancelled: Option<String>,
    /// Total wall time.
    pub duration_ms: f64,
}

impl RunReport {
    pub(crate) fn new(pipeline: impl Into<String>, run_key: RunKey) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            pipeline: pipeline.into(),
            run_key,
            outcomes: Vec::new(),
            failures: Vec::new(),
            cancelled: None,
            duration_ms: 0.0,
        }
    }

    /// Outcome of a stage.
    #[must_use]
    pub fn outcome(&self, stage: &str) -> Option<&StageOutcome> {
        self.outcomes.iter().find(|o| o.stage == stage)
    }

    /// Status of a stage; pending if the stage is unknown.
    #[must_use]
    pub fn status(&self, stage: &str) -> StageStatus {
        self.outcome(stage).map(|o| o.status).unwrap_or_default()
    }

    /// The first failure, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&StageFailure> {
        self.failures.first()
    }

    /// Stages that reached `Completed`, in execution order.
    #[must_use]
    pub fn completed_stages(&self) -> Vec<&str> {
        self.stages_where(|o| o.status == StageStatus::Completed)
    }

    /// Stages satisfied from existing artifacts.
    #[must_use]
    pub fn cache_hits(&self) -> Vec<&str> {
        self.stages_where(|o| o.cache_hit)
    }

    /// Stages that were never started.
    #[must_use]
    pub fn pending_stages(&self) -> Vec<&str> {
        self.stages_where(|o| o.status == StageStatus::Pending)
    }

    fn stages_where(&self, pred: impl Fn(&StageOutcome) -> bool) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| pred(o))
            .map(|o| o.stage.as_str())
            .collect()
    }

    /// Whether every stage completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
            && self.cancelled.is_none()
            && self.outcomes.iter().all(|o| o.status == StageStatus::Completed)
    }

    /// Converts a failed or cancelled run into an error.
    ///
    /// # Errors
    ///
    /// Returns [`SeaIceError::StageFailed`] for the first failed stage, or
    /// [`SeaIceError::Cancelled`] if the run was cancelled.
    pub fn ensure_success(self) -> Result<Self, SeaIceError> {
        if let Some(failure) = self.failures.first() {
            return Err(failure.clone().into());
        }
        if let Some(reason) = &self.cancelled {
            return Err(SeaIceError::Cancelled {
                run_key: self.run_key,
                reason: reason.clone(),
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FetchError;

    fn key() -> RunKey {
        "20240105".parse().unwrap()
    }

    fn report() -> RunReport {
        let mut report = RunReport::new("seaice", key());
        let mut fetch = StageOutcome::pending("fetch", "20240105.antarctic.tar.gz");
        fetch.status = StageStatus::Completed;
        fetch.cache_hit = true;
        report.outcomes.push(fetch);
        report
            .outcomes
            .push(StageOutcome::pending("extract", "20240105.antarctic.tif"));
        report
    }

    #[test]
    fn test_queries() {
        let report = report();
        assert_eq!(report.completed_stages(), vec!["fetch"]);
        assert_eq!(report.cache_hits(), vec!["fetch"]);
        assert_eq!(report.pending_stages(), vec!["extract"]);
        assert_eq!(report.status("extract"), StageStatus::Pending);
        assert_eq!(report.status("unknown"), StageStatus::Pending);
        assert!(!report.is_success());
    }

    #[test]
    fn test_ensure_success_reports_stage_and_key() {
        let mut report = report();
        let err = SeaIceError::from(FetchError::Status {
            url: "https://example.org".to_string(),
            status: 404,
        });
        report.failures.push(StageFailure::new("fetch", key(), &err));

        let err = report.ensure_success().unwrap_err();
        assert!(err.is_retryable());
        let message = err.to_string();
        assert!(message.contains("'fetch'"));
        assert!(message.contains("20240105"));
        assert!(message.contains("404"));
    }

    #[test]
    fn test_ensure_success_on_cancel() {
        let mut report = report();
        report.cancelled = Some("shutdown".to_string());
        assert!(matches!(
            report.ensure_success(),
            Err(SeaIceError::Cancelled { .. })
        ));
    }

    #[test]
    fn test_report_serializes() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["run_key"], "20240105");
        assert_eq!(json["outcomes"][0]["status"], "completed");
        assert_eq!(json["outcomes"][1]["error"], serde_json::Value::Null);
    }
}

//! Failure handling policy for pipeline runs.

use serde::{Deserialize, Serialize};

/// How the runner reacts when a stage fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Halt the run at the first failure (default).
    #[default]
    FailFast,
    /// Record the failure and keep running stages whose upstream chain is
    /// intact. Dependents of the failed stage stay pending.
    ContinueIndependent,
}

impl FailureMode {
    /// Whether the run stops after a failure.
    #[must_use]
    pub const fn halts_on_failure(self) -> bool {
        matches!(self, Self::FailFast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_fail_fast() {
        assert_eq!(FailureMode::default(), FailureMode::FailFast);
        assert!(FailureMode::FailFast.halts_on_failure());
        assert!(!FailureMode::ContinueIndependent.halts_on_failure());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&FailureMode::ContinueIndependent).unwrap();
        assert_eq!(json, "\"continue_independent\"");

        let mode: FailureMode = serde_json::from_str("\"fail_fast\"").unwrap();
        assert_eq!(mode, FailureMode::FailFast);
    }
}

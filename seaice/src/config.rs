//! Pipeline configuration.
//!
//! Every setting the pipeline needs is carried explicitly here: the artifact
//! root, the run key, the hazard thresholds and the links published with
//! thumbnails. Nothing is read from process-wide state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::RunKey;
use crate::errors::SeaIceError;
use crate::grid::HazardCriteria;
use crate::pipeline::FailureMode;

/// Configuration for one pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root directory of the artifact store.
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,
    /// Run key; yesterday when absent.
    #[serde(default)]
    pub run_key: Option<RunKey>,
    /// Hazard classification.
    #[serde(default)]
    pub hazard: HazardCriteria,
    /// Public URL prefix under which thumbnails are served.
    #[serde(default = "default_thumbnail_base_url")]
    pub thumbnail_base_url: String,
    /// Sample value rendered transparent in thumbnails.
    #[serde(default)]
    pub thumbnail_no_data: u8,
    /// How the runner reacts to a failed stage.
    #[serde(default)]
    pub failure_mode: FailureMode,
    /// Archive download settings.
    #[serde(default)]
    pub fetch: FetchConfig,
}

fn default_root_dir() -> PathBuf {
    PathBuf::from("/geodata")
}

fn default_thumbnail_base_url() -> String {
    "http://localhost:8000/geodata/seaice_thumb".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            run_key: None,
            hazard: HazardCriteria::default(),
            thumbnail_base_url: default_thumbnail_base_url(),
            thumbnail_no_data: 0,
            failure_mode: FailureMode::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration rooted at `root_dir` with defaults elsewhere.
    #[must_use]
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    /// Parses a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or fails validation.
    pub fn from_json_str(json: &str) -> Result<Self, SeaIceError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SeaIceError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Sets the run key.
    #[must_use]
    pub fn with_run_key(mut self, run_key: RunKey) -> Self {
        self.run_key = Some(run_key);
        self
    }

    /// Sets the failure mode.
    #[must_use]
    pub fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    /// Sets the hazard criteria.
    #[must_use]
    pub fn with_hazard(mut self, hazard: HazardCriteria) -> Self {
        self.hazard = hazard;
        self
    }

    /// Validates cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the first problem found.
    pub fn validate(&self) -> Result<(), SeaIceError> {
        if self.root_dir.as_os_str().is_empty() {
            return Err(SeaIceError::Config("root_dir cannot be empty".to_string()));
        }
        if self.thumbnail_base_url.trim().is_empty() {
            return Err(SeaIceError::Config(
                "thumbnail_base_url cannot be empty".to_string(),
            ));
        }
        if self.fetch.timeout_seconds <= 0.0 || !self.fetch.timeout_seconds.is_finite() {
            return Err(SeaIceError::Config(format!(
                "fetch.timeout_seconds must be positive, got {}",
                self.fetch.timeout_seconds
            )));
        }
        self.hazard.validate()
    }

    /// The configured run key, or yesterday's.
    #[must_use]
    pub fn resolve_run_key(&self) -> RunKey {
        self.run_key.unwrap_or_else(RunKey::yesterday)
    }

    /// Public URL of a thumbnail file.
    #[must_use]
    pub fn thumbnail_url(&self, file_name: &str) -> String {
        format!("{}/{file_name}", self.thumbnail_base_url.trim_end_matches('/'))
    }
}

/// Configuration for archive downloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Server prefix; archives live at `{base_url}/{key}/{key}.antarctic.tar.gz`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "https://www.polarview.aq/images/27_AMSR2".to_string()
}

fn default_timeout() -> f64 {
    120.0
}

fn default_user_agent() -> String {
    concat!("seaice/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl FetchConfig {
    /// Sets the server prefix.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Gets timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.root_dir, PathBuf::from("/geodata"));
        assert_eq!(config.failure_mode, FailureMode::FailFast);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_with_partial_fields() {
        let config = PipelineConfig::from_json_str(
            r#"{
                "root_dir": "/tmp/geodata",
                "run_key": "20240105",
                "hazard": {"concentration_threshold": 70},
                "failure_mode": "continue_independent"
            }"#,
        )
        .unwrap();

        assert_eq!(config.root_dir, PathBuf::from("/tmp/geodata"));
        assert_eq!(config.resolve_run_key().to_string(), "20240105");
        assert_eq!(config.hazard.concentration_threshold, 70);
        assert_eq!(config.hazard.hazard_label, 255);
        assert_eq!(config.failure_mode, FailureMode::ContinueIndependent);
        assert_eq!(config.fetch.base_url, "https://www.polarview.aq/images/27_AMSR2");
    }

    #[test]
    fn test_from_json_rejects_bad_run_key() {
        let err = PipelineConfig::from_json_str(r#"{"run_key": "2024-01-05"}"#).unwrap_err();
        assert!(matches!(err, SeaIceError::Serialization(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PipelineConfig::new("");
        assert!(config.validate().is_err());

        config = PipelineConfig::default();
        config.fetch = config.fetch.with_timeout(0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seaice.json");
        std::fs::write(&path, r#"{"thumbnail_base_url": "https://maps.example.org/thumbs/"}"#).unwrap();

        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(
            config.thumbnail_url("20240105.antarctic.png"),
            "https://maps.example.org/thumbs/20240105.antarctic.png"
        );
    }

    #[test]
    fn test_resolve_run_key_defaults_to_yesterday() {
        let config = PipelineConfig::default();
        assert_eq!(config.resolve_run_key(), RunKey::yesterday());
    }
}

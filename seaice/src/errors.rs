//! Error types for the sea-ice pipeline.
//!
//! Each concern (grid access, collaborators, artifact storage, pipeline
//! validation) has its own error type; [`SeaIceError`] aggregates them so
//! stages and the runner can propagate with `?`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::RunKey;

/// The main error type for pipeline operations.
#[derive(Debug, Error)]
pub enum SeaIceError {
    /// Grid contract violation (index or value out of range, malformed input).
    #[error("{0}")]
    Grid(#[from] GridError),

    /// Retrieving the raw archive failed.
    #[error("{0}")]
    Fetch(#[from] FetchError),

    /// The archive could not be turned into a raster.
    #[error("{0}")]
    Extract(#[from] ExtractError),

    /// An external renderer failed.
    #[error("{0}")]
    Render(#[from] RenderError),

    /// The artifact store failed.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// A stage touched an upstream result it may not use.
    #[error("{0}")]
    StageDependency(#[from] StageDependencyError),

    /// The pipeline definition is invalid.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// A cycle was detected in the pipeline.
    #[error("{0}")]
    CycleDetected(#[from] CycleDetectedError),

    /// A stage failed during a run.
    #[error("Stage '{stage}' failed for run {run_key}: {cause}")]
    StageFailed {
        /// The failed stage.
        stage: String,
        /// The run it failed in.
        run_key: RunKey,
        /// Root cause, rendered.
        cause: String,
        /// Whether re-running with the same key may succeed.
        retryable: bool,
    },

    /// The run was cancelled at a stage boundary.
    #[error("Run {run_key} was cancelled: {reason}")]
    Cancelled {
        /// The cancelled run.
        run_key: RunKey,
        /// Cancellation reason.
        reason: String,
    },

    /// Invalid configuration or run key.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SeaIceError {
    /// Returns true if re-invoking the run with the same key may succeed.
    ///
    /// Only network retrieval is considered transient, whether raised
    /// directly or as the cause of a failed stage. Every other failure needs
    /// new input or a code fix.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch(_) => true,
            Self::StageFailed { retryable, .. } => *retryable,
            _ => false,
        }
    }

    /// Short machine-readable name of the error class.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Grid(GridError::OutOfBounds { .. }) => "OutOfBounds",
            Self::Grid(GridError::InvalidValue { .. }) => "InvalidValue",
            Self::Grid(_) => "InvalidGrid",
            Self::Fetch(_) => "FetchError",
            Self::Extract(_) => "ExtractError",
            Self::Render(_) => "RenderError",
            Self::Store(_) => "StoreError",
            Self::StageDependency(_) => "StageDependencyError",
            Self::Validation(_) | Self::CycleDetected(_) => "PipelineValidationError",
            Self::StageFailed { .. } => "StageFailed",
            Self::Cancelled { .. } => "Cancelled",
            Self::Config(_) => "ConfigError",
            Self::Serialization(_) => "SerializationError",
            Self::Io(_) => "IoError",
        }
    }
}

impl From<serde_json::Error> for SeaIceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Errors raised by [`Grid`](crate::grid::Grid) construction and access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    /// Index outside the grid extent.
    #[error("Cell ({row}, {col}) is out of bounds for a {rows}x{cols} grid")]
    OutOfBounds {
        /// Requested row.
        row: usize,
        /// Requested column.
        col: usize,
        /// Grid row count.
        rows: usize,
        /// Grid column count.
        cols: usize,
    },

    /// Sample outside the 0..=255 domain.
    #[error("Value {value} is outside the sample range 0..=255")]
    InvalidValue {
        /// The rejected value.
        value: i64,
    },

    /// Zero rows or zero columns.
    #[error("Grid must have at least one row and one column (got {rows}x{cols})")]
    Empty {
        /// Row count.
        rows: usize,
        /// Column count.
        cols: usize,
    },

    /// Row input of uneven length.
    #[error("Row {row} has {found} columns, expected {expected}")]
    Ragged {
        /// Offending row index.
        row: usize,
        /// Expected column count (length of row 0).
        expected: usize,
        /// Actual column count.
        found: usize,
    },

    /// Flat buffer does not match the declared extent.
    #[error("Buffer of {len} samples does not match a {rows}x{cols} grid")]
    BufferMismatch {
        /// Buffer length.
        len: usize,
        /// Declared rows.
        rows: usize,
        /// Declared columns.
        cols: usize,
    },
}

/// Network retrieval failure. Retryable by re-running with the same key.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The remote source answered with a non-success status.
    #[error("Fetching {url} failed with HTTP status {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// Connection, timeout or body transfer failure.
    #[error("Fetching {url} failed: {reason}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Underlying cause.
        reason: String,
    },

    /// Writing the downloaded archive locally failed.
    #[error("Could not write archive to {}: {reason}", .path.display())]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },
}

/// Malformed archive or missing member. Fatal for the run.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// The archive could not be opened or decompressed.
    #[error("Archive {} is unreadable: {reason}", .path.display())]
    Unreadable {
        /// Archive path.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },

    /// The expected raster member is absent.
    #[error("Archive {} has no member '{member}'", .path.display())]
    MissingMember {
        /// Archive path.
        path: PathBuf,
        /// Expected member path inside the archive.
        member: String,
    },

    /// The raster member decoded into an invalid grid.
    #[error("Raster in {} is invalid: {source}", .path.display())]
    InvalidRaster {
        /// Archive path.
        path: PathBuf,
        /// Grid validation failure.
        #[source]
        source: GridError,
    },
}

/// External renderer failure. Fatal for the owning stage only.
#[derive(Debug, Clone, Error)]
#[error("Rendering {} failed: {reason}", .path.display())]
pub struct RenderError {
    /// Output path that could not be produced.
    pub path: PathBuf,
    /// Underlying cause.
    pub reason: String,
}

impl RenderError {
    /// Creates a new render error.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Artifact store failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No artifact with this name exists.
    #[error("Artifact '{name}' does not exist")]
    NotFound {
        /// Artifact file name.
        name: String,
    },

    /// A raster artifact was requested but the stored payload is an asset.
    #[error("Artifact '{name}' is not a raster")]
    NotRaster {
        /// Artifact file name.
        name: String,
    },

    /// An asset was committed but nothing was written at its location.
    #[error("Artifact '{name}' was committed but {} is missing", .path.display())]
    MissingAsset {
        /// Artifact file name.
        name: String,
        /// Expected location.
        path: PathBuf,
    },

    /// The raster codec failed.
    #[error("Raster codec failed for {}: {reason}", .path.display())]
    Codec {
        /// Raster path.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },

    /// Filesystem failure.
    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raised when a stage runs or reads input without its upstream completing.
///
/// Seeing this at runtime indicates a runner bug or a stage reading a
/// predecessor it never declared.
#[derive(Debug, Clone, Error)]
#[error("Stage '{stage}' cannot use upstream '{upstream}': {reason}")]
pub struct StageDependencyError {
    /// The stage asking for input.
    pub stage: String,
    /// The upstream stage it asked for.
    pub upstream: String,
    /// Why the access failed.
    pub reason: String,
}

impl StageDependencyError {
    /// Creates a new stage dependency error.
    #[must_use]
    pub fn new(
        stage: impl Into<String>,
        upstream: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            stage: stage.into(),
            upstream: upstream.into(),
            reason: reason.into(),
        }
    }
}

/// Metadata about a contract error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "PIPELINE-CYCLE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when pipeline validation fails.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the contract code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}

/// Error raised when a cycle is detected in the pipeline graph.
#[derive(Debug, Clone, Error)]
#[error("Cycle detected in pipeline: {}", .cycle_path.join(" -> "))]
pub struct CycleDetectedError {
    /// The path of stages forming the cycle.
    pub cycle_path: Vec<String>,
    /// Contract error info.
    pub error_info: ContractErrorInfo,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        let info = ContractErrorInfo::new(
            "PIPELINE-CYCLE",
            format!("Pipeline contains a dependency cycle: {}", cycle_path.join(" -> ")),
        )
        .with_fix_hint("Remove one of the dependencies in the cycle to break it.");

        Self {
            cycle_path,
            error_info: info,
        }
    }
}

impl From<CycleDetectedError> for PipelineValidationError {
    fn from(err: CycleDetectedError) -> Self {
        Self {
            message: err.to_string(),
            stages: err.cycle_path.clone(),
            error_info: Some(err.error_info),
        }
    }
}

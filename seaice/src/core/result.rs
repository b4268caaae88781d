//! Stage result type passed between stages.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::{ArtifactName, RunKey};
use crate::grid::Grid;

/// Identifies a stage result: the run it belongs to and the stage that made it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultId {
    /// The run key.
    pub run_key: RunKey,
    /// The producing stage.
    pub stage: String,
}

impl fmt::Display for ResultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.run_key, self.stage)
    }
}

/// What a stage hands downstream.
#[derive(Debug)]
pub enum Payload {
    /// An in-memory raster, owned by whoever holds the result.
    Grid(Grid),
    /// A reference to an artifact that lives in the store.
    Asset {
        /// Where the artifact can be read from.
        location: PathBuf,
    },
}

impl Payload {
    /// Creates an asset payload.
    #[must_use]
    pub fn asset(location: impl Into<PathBuf>) -> Self {
        Self::Asset {
            location: location.into(),
        }
    }

    /// Returns the grid, if this payload holds one.
    #[must_use]
    pub const fn as_grid(&self) -> Option<&Grid> {
        match self {
            Self::Grid(grid) => Some(grid),
            Self::Asset { .. } => None,
        }
    }

    /// Returns the asset location, if this payload is a reference.
    #[must_use]
    pub fn location(&self) -> Option<&Path> {
        match self {
            Self::Grid(_) => None,
            Self::Asset { location } => Some(location),
        }
    }
}

/// Ordered, human-readable notes forwarded to reporting and metadata
/// publishing (thumbnail links, label counts, grid digests).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance(BTreeMap<String, String>);

impl Provenance {
    /// Creates an empty provenance map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a note, replacing any previous value under the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Gets a note.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Iterates notes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of notes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no notes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The artifact produced by one stage in one run.
#[derive(Debug)]
pub struct StageResult {
    /// Run key and producing stage.
    pub id: ResultId,
    /// The artifact this result corresponds to in the store.
    pub artifact: ArtifactName,
    /// Grid or stored-asset reference.
    pub payload: Payload,
    /// Notes for downstream stages and publishers.
    pub provenance: Provenance,
    /// When the result was produced or re-read (ISO 8601).
    pub created_at: String,
    /// Whether this result was sourced from an existing artifact.
    pub cache_hit: bool,
}

impl StageResult {
    /// Creates a result holding `payload`.
    #[must_use]
    pub fn new(stage: impl Into<String>, artifact: ArtifactName, payload: Payload) -> Self {
        Self {
            id: ResultId {
                run_key: artifact.run_key,
                stage: stage.into(),
            },
            artifact,
            payload,
            provenance: Provenance::new(),
            created_at: Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string(),
            cache_hit: false,
        }
    }

    /// Creates a result holding a grid.
    #[must_use]
    pub fn grid(stage: impl Into<String>, artifact: ArtifactName, grid: Grid) -> Self {
        Self::new(stage, artifact, Payload::Grid(grid))
    }

    /// Creates a result referencing a stored asset.
    #[must_use]
    pub fn asset(stage: impl Into<String>, artifact: ArtifactName, location: impl Into<PathBuf>) -> Self {
        Self::new(stage, artifact, Payload::asset(location))
    }

    /// Adds a provenance note.
    #[must_use]
    pub fn with_note(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.provenance.insert(key, value);
        self
    }

    /// Marks the result as sourced from an existing artifact.
    #[must_use]
    pub fn cached(mut self) -> Self {
        self.cache_hit = true;
        self
    }

    /// The stage that produced this result.
    #[must_use]
    pub fn source_stage(&self) -> &str {
        &self.id.stage
    }

    /// The run key the result belongs to.
    #[must_use]
    pub const fn run_key(&self) -> RunKey {
        self.id.run_key
    }
}

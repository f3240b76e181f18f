//! Error types for snapshot loading, diffing and enrichment.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for chronicle operations.
///
/// Duplicate identities, unknown identities and "nothing changed" are not
/// errors; they show up as log lines or empty results instead.
#[derive(Debug, Error)]
pub enum ChronicleError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed snapshot {path}: {reason}")]
    MalformedSnapshot { path: PathBuf, reason: String },

    #[error("Malformed diff artifact {path}: {reason}")]
    MalformedArtifact { path: PathBuf, reason: String },

    #[error("No capture timestamp in snapshot name: {0}")]
    MissingTimestamp(String),

    #[error("Snapshot directory not found: {0}")]
    StoreNotFound(PathBuf),

    #[error("Snapshot already exists: {0}")]
    SnapshotExists(PathBuf),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ChronicleError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ChronicleError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for ChronicleError {
    fn from(e: serde_json::Error) -> Self {
        ChronicleError::Serialization(e.to_string())
    }
}

/// Result type for chronicle operations.
pub type Result<T> = std::result::Result<T, ChronicleError>;

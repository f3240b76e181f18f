//! The persisted diff artifact.

use crate::diff::pair::PairDiff;
use crate::error::{ChronicleError, Result};
use crate::outcomes::OutcomeSummary;
use crate::types::{iso_seconds, parse_capture_time};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A [`PairDiff`] as written to disk.
///
/// `generated_at` is stamped by the caller so the diff payload itself
/// stays a pure function of the two snapshots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiffArtifact {
    #[serde(with = "iso_seconds")]
    pub generated_at: NaiveDateTime,

    #[serde(flatten)]
    pub diff: PairDiff,

    /// Present once outcome enrichment has run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removal_outcome_summary_simple: Option<OutcomeSummary>,
}

impl DiffArtifact {
    pub fn new(diff: PairDiff, generated_at: NaiveDateTime) -> Self {
        Self {
            generated_at,
            diff,
            removal_outcome_summary_simple: None,
        }
    }

    /// Read a diff artifact from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| ChronicleError::io(path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| ChronicleError::MalformedArtifact {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Capture times of the old and new snapshot, taken from their labels.
    pub fn time_window(&self) -> Result<(NaiveDateTime, NaiveDateTime)> {
        let start = parse_capture_time(&self.diff.old_snapshot)
            .ok_or_else(|| ChronicleError::MissingTimestamp(self.diff.old_snapshot.clone()))?;
        let end = parse_capture_time(&self.diff.new_snapshot)
            .ok_or_else(|| ChronicleError::MissingTimestamp(self.diff.new_snapshot.clone()))?;
        Ok((start, end))
    }
}

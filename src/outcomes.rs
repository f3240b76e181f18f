//! Outcome enrichment for removed animals.
//!
//! An animal disappearing from the roster is usually adopted or
//! transferred. The shelter publishes those outcomes separately; this
//! module joins them back onto a diff's removed list by identity.

use crate::diff::DiffArtifact;
use crate::error::{ChronicleError, Result};
use crate::types::{drop_shadowed_keys, AnimalId};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Separator used when an animal has several distinct outcome types.
pub const OUTCOME_SEPARATOR: &str = " / ";

/// Removal counts written into an enriched diff.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    pub total_removed: usize,
    pub with_outcome: usize,
    pub without_outcome: usize,
}

fn lenient_datetime<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<NaiveDateTime>, D::Error> {
    let Some(raw) = Option::<String>::deserialize(d)? else {
        return Ok(None);
    };
    let parsed = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        });
    Ok(parsed)
}

/// One row of the external outcomes feed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub animal_id: AnimalId,

    #[serde(alias = "outcome_status")]
    pub outcome_type: String,

    /// Unparseable or missing dates are kept as `None`.
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub outcome_date: Option<NaiveDateTime>,
}

impl OutcomeRecord {
    /// Validate one raw outcome row. `outcome_type` wins over the legacy
    /// `outcome_status` when a row carries both.
    pub fn from_value(mut value: Value) -> std::result::Result<Self, serde_json::Error> {
        drop_shadowed_keys(&mut value, &[("outcome_status", "outcome_type")]);
        serde_json::from_value(value)
    }

    fn within(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.outcome_date.map_or(true, |at| start <= at && at <= end)
    }
}

/// Unify upstream outcome spellings: lowercase, fold the altered and
/// unaltered adoption variants, then capitalize the first letter.
pub fn normalize_outcome_type(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let unified = match lowered.as_str() {
        "adopted altered" | "adopted unaltered" => "adopted",
        "adopted offsite(altered)" | "adopted offsite(unaltered)" => "adopted offsite",
        other => other,
    };

    let mut chars = unified.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Anything that can list outcomes over a time window.
pub trait OutcomeSource {
    fn outcomes_between(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Vec<OutcomeRecord>>;
}

impl OutcomeSource for [OutcomeRecord] {
    fn outcomes_between(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Vec<OutcomeRecord>> {
        Ok(self
            .iter()
            .filter(|o| o.within(start, end))
            .cloned()
            .collect())
    }
}

/// Outcome rows exported to a JSON file (an array of objects).
pub struct JsonOutcomeSource {
    path: PathBuf,
}

impl JsonOutcomeSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn read_all(&self) -> Result<Vec<OutcomeRecord>> {
        let bytes = fs::read(&self.path).map_err(|e| ChronicleError::io(&self.path, e))?;
        let rows: Vec<Value> = serde_json::from_slice(&bytes)?;

        let mut records = Vec::with_capacity(rows.len());
        for (position, row) in rows.into_iter().enumerate() {
            match OutcomeRecord::from_value(row) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(file = %self.path.display(), position, error = %e, "Skipping outcome row");
                }
            }
        }
        Ok(records)
    }
}

impl OutcomeSource for JsonOutcomeSource {
    fn outcomes_between(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Vec<OutcomeRecord>> {
        self.read_all()?.as_slice().outcomes_between(start, end)
    }
}

/// Attach `outcome_status` to every removed animal.
///
/// The join key is the identity, trimmed and compared case-insensitively.
/// Distinct outcome types are sorted and joined with [`OUTCOME_SEPARATOR`].
/// Running it again replaces the previous enrichment.
pub fn attach_outcomes(artifact: &mut DiffArtifact, outcomes: &[OutcomeRecord]) -> OutcomeSummary {
    let mut by_identity: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for outcome in outcomes {
        let kind = normalize_outcome_type(&outcome.outcome_type);
        if kind.is_empty() {
            continue;
        }
        by_identity
            .entry(outcome.animal_id.join_key())
            .or_default()
            .insert(kind);
    }

    let mut summary = OutcomeSummary {
        total_removed: artifact.diff.animals_removed.len(),
        ..Default::default()
    };

    for removed in &mut artifact.diff.animals_removed {
        let status = by_identity
            .get(&removed.animal.animal_id.join_key())
            .map(|kinds| kinds.iter().cloned().collect::<Vec<_>>().join(OUTCOME_SEPARATOR));

        if status.is_some() {
            summary.with_outcome += 1;
        } else {
            summary.without_outcome += 1;
        }
        removed.outcome_status = Some(status);
    }

    debug!(
        total = summary.total_removed,
        matched = summary.with_outcome,
        "Attached outcomes"
    );
    artifact.removal_outcome_summary_simple = Some(summary.clone());
    summary
}

/// Fetch outcomes for the artifact's time window and attach them.
pub fn enrich<S>(artifact: &mut DiffArtifact, source: &S) -> Result<OutcomeSummary>
where
    S: OutcomeSource + ?Sized,
{
    let (start, end) = artifact.time_window()?;
    let outcomes = source.outcomes_between(start, end)?;
    Ok(attach_outcomes(artifact, &outcomes))
}

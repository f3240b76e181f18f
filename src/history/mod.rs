//! Per-animal history across snapshots.
//!
//! The chain for one identity is built from the snapshots that contain
//! it, in capture order. Snapshots where the animal is absent are skipped
//! entirely: consecutive *present* records are diffed against each other
//! with the same sub-delta logic the pairwise differ uses.
//!
//! Alongside the change log the chain carries a restore pack: the most
//! recent non-empty bio and trait set, for recovering data that was
//! wiped upstream.

mod restore;

pub use restore::{RestorePack, RestoredBio, RestoredTraits};

use crate::diff::RecordDelta;
use crate::snapshot::Snapshot;
use crate::types::{iso_seconds, AnimalId, Record};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One snapshot in which the animal was present.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(with = "iso_seconds", alias = "dt")]
    pub timestamp: NaiveDateTime,

    /// Snapshot file name.
    pub snapshot: String,

    pub record: Record,

    /// `None` for the baseline and for snapshots with nothing new.
    pub changes_from_prev: Option<RecordDelta>,
}

/// Chronological history of one animal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryChain {
    #[serde(alias = "animal_id")]
    pub identity: AnimalId,
    pub snapshots_found: usize,
    pub history: Vec<HistoryEntry>,
    pub restore_pack: RestorePack,
}

impl HistoryChain {
    /// True when no snapshot contained the identity.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn first_seen(&self) -> Option<&HistoryEntry> {
        self.history.first()
    }

    pub fn last_seen(&self) -> Option<&HistoryEntry> {
        self.history.last()
    }

    /// Entries after the baseline that carry at least one change.
    pub fn changes(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history
            .iter()
            .skip(1)
            .filter(|entry| entry.changes_from_prev.is_some())
    }
}

/// Incremental history construction, one snapshot at a time.
///
/// Lets a caller stream snapshots from disk without holding the whole
/// sequence in memory. Snapshots must be fed in capture order.
pub struct HistoryBuilder {
    identity: AnimalId,
    hits: Vec<HistoryEntry>,
}

impl HistoryBuilder {
    pub fn new(identity: AnimalId) -> Self {
        Self {
            identity,
            hits: Vec::new(),
        }
    }

    /// Look for the identity in `snapshot` and record a hit.
    ///
    /// Snapshots without a capture time, or not later than the previous
    /// hit, are skipped so timestamps stay strictly increasing.
    pub fn observe(&mut self, snapshot: &Snapshot) {
        let Some(captured_at) = snapshot.captured_at else {
            warn!(snapshot = %snapshot.label, "Skipping snapshot without capture time");
            return;
        };
        let Some(record) = snapshot.find(&self.identity) else {
            return;
        };

        let changes_from_prev = match self.hits.last() {
            Some(prev) if captured_at <= prev.timestamp => {
                warn!(
                    snapshot = %snapshot.label,
                    previous = %prev.snapshot,
                    "Skipping out-of-order snapshot"
                );
                return;
            }
            Some(prev) => Some(RecordDelta::between(&prev.record, record)).filter(|d| !d.is_empty()),
            None => None,
        };

        self.hits.push(HistoryEntry {
            timestamp: captured_at,
            snapshot: snapshot.name().to_string(),
            record: record.clone(),
            changes_from_prev,
        });
    }

    pub fn finish(self) -> HistoryChain {
        let restore_pack = RestorePack::from_entries(&self.hits);
        HistoryChain {
            identity: self.identity,
            snapshots_found: self.hits.len(),
            history: self.hits,
            restore_pack,
        }
    }
}

/// Reconstruct the history of `identity` from a sequence of snapshots.
///
/// Snapshots are visited in capture order regardless of input order.
/// An identity found nowhere yields an empty chain.
pub fn history<'a, I>(identity: &AnimalId, snapshots: I) -> HistoryChain
where
    I: IntoIterator<Item = &'a Snapshot>,
{
    let mut ordered: Vec<&Snapshot> = snapshots.into_iter().collect();
    ordered.sort_by_key(|s| s.captured_at);

    let mut builder = HistoryBuilder::new(identity.clone());
    for snapshot in ordered {
        builder.observe(snapshot);
    }
    builder.finish()
}

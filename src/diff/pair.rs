//! Pairwise snapshot diff.

use crate::diff::record::RecordDelta;
use crate::snapshot::Snapshot;
use crate::types::{AnimalId, AnimalSummary};
use serde::{Deserialize, Deserializer, Serialize};

/// Counts reported at the top of every diff.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub total_old: usize,
    pub total_new: usize,
    pub animals_added: usize,
    pub animals_removed: usize,
    pub animals_changed: usize,
}

/// Distinguishes an explicit `null` from an absent key.
fn present<'de, T, D>(d: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(d).map(Some)
}

/// An animal that left the roster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemovedAnimal {
    #[serde(flatten)]
    pub animal: AnimalSummary,

    /// Absent until outcome enrichment runs; then `null` or the joined
    /// outcome types.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub outcome_status: Option<Option<String>>,
}

/// An animal present in both snapshots with at least one sub-delta.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangedAnimal {
    /// Display fields from the newer record.
    #[serde(flatten)]
    pub animal: AnimalSummary,

    #[serde(flatten)]
    pub delta: RecordDelta,
}

/// Classified differences between two snapshots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PairDiff {
    pub old_snapshot: String,
    pub new_snapshot: String,
    pub summary: DiffSummary,
    pub animals_added: Vec<AnimalSummary>,
    pub animals_removed: Vec<RemovedAnimal>,
    pub animals_changed: Vec<ChangedAnimal>,
}

impl PairDiff {
    /// Identities that left the roster, in diff order.
    pub fn removed_identities(&self) -> Vec<&AnimalId> {
        self.animals_removed
            .iter()
            .map(|r| &r.animal.animal_id)
            .collect()
    }

    /// True when nothing was added, removed or changed.
    pub fn is_empty(&self) -> bool {
        self.animals_added.is_empty()
            && self.animals_removed.is_empty()
            && self.animals_changed.is_empty()
    }
}

/// Diff two snapshots.
///
/// Every identity lands in exactly one of added, removed, changed or
/// (unreported) unchanged. All lists are ordered by identity, so the
/// result is a pure function of the two inputs.
pub fn diff(old: &Snapshot, new: &Snapshot) -> PairDiff {
    let old_map = old.by_identity();
    let new_map = new.by_identity();

    let animals_added: Vec<AnimalSummary> = new_map
        .iter()
        .filter(|(id, _)| !old_map.contains_key(*id))
        .map(|(_, record)| AnimalSummary::from(*record))
        .collect();

    let mut animals_removed = Vec::new();
    let mut animals_changed = Vec::new();

    for (id, old_record) in &old_map {
        match new_map.get(id) {
            None => animals_removed.push(RemovedAnimal {
                animal: AnimalSummary::from(*old_record),
                outcome_status: None,
            }),
            Some(new_record) => {
                let delta = RecordDelta::between(old_record, new_record);
                if !delta.is_empty() {
                    animals_changed.push(ChangedAnimal {
                        animal: AnimalSummary::from(*new_record),
                        delta,
                    });
                }
            }
        }
    }

    PairDiff {
        old_snapshot: old.label.clone(),
        new_snapshot: new.label.clone(),
        summary: DiffSummary {
            total_old: old_map.len(),
            total_new: new_map.len(),
            animals_added: animals_added.len(),
            animals_removed: animals_removed.len(),
            animals_changed: animals_changed.len(),
        },
        animals_added,
        animals_removed,
        animals_changed,
    }
}

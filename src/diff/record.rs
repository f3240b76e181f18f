//! Sub-deltas between two records of the same identity.
//!
//! Both the pairwise differ and the history reconstructor go through
//! [`RecordDelta::between`], so a change is classified the same way
//! whether it shows up in a daily diff or in an animal's history.

use crate::types::Record;
use serde::{Deserialize, Serialize};
use similar::{Algorithm, TextDiff};
use std::collections::BTreeMap;

/// Scalar fields compared by plain equality. Location and foster are
/// covered by [`LocationDelta`] instead.
pub const SCALAR_FIELDS: &[&str] = &[
    "name",
    "species",
    "sex",
    "age_key",
    "size_key",
    "breed_primary_name",
    "status",
    "kennel_number",
];

/// Bio edits smaller than this (in percent) are treated as noise.
pub const BIO_NOISE_PCT: f64 = 0.1;

fn scalar<'a>(record: &'a Record, field: &str) -> Option<&'a str> {
    match field {
        "name" => record.name.as_deref(),
        "species" => record.species.as_deref(),
        "sex" => record.sex.as_deref(),
        "age_key" => record.age_key.as_deref(),
        "size_key" => record.size_key.as_deref(),
        "breed_primary_name" => record.breed_primary_name.as_deref(),
        "status" => record.status.as_deref(),
        "kennel_number" => record.kennel_number.as_deref(),
        _ => None,
    }
}

/// Old and new value of one scalar field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: Option<String>,
    pub new: Option<String>,
}

/// Trait keys gained and lost, both sorted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitDelta {
    pub characteristics_added: Vec<String>,
    pub characteristics_removed: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BioChange {
    Added,
    Removed,
    Changed,
}

/// Classified bio edit. Texts are whitespace-normalized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BioDelta {
    #[serde(rename = "type")]
    pub kind: BioChange,

    /// Approximate dissimilarity in percent, only for `changed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_pct: Option<f64>,

    pub old: String,
    pub new: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationChange {
    WentToFoster,
    ReturnedFromFoster,
    KennelMove,
    Other,
}

/// Transition of the (location label, foster flag) pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationDelta {
    pub location_old: Option<String>,
    pub location_new: Option<String>,
    pub foster_old: bool,
    pub foster_new: bool,
    pub change_type: LocationChange,
}

/// Everything that differs between two records of one animal.
///
/// Empty sub-deltas are omitted from the serialized form; trait deltas
/// are flattened so entries carry `characteristics_added` and
/// `characteristics_removed` at the top level.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordDelta {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub field_changes: BTreeMap<String, FieldChange>,

    #[serde(flatten)]
    pub traits: Option<TraitDelta>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<BioDelta>,

    #[serde(default, rename = "location_change", skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationDelta>,
}

impl RecordDelta {
    /// Compute all four sub-deltas from `old` to `new`.
    pub fn between(old: &Record, new: &Record) -> Self {
        Self {
            field_changes: scalar_delta(old, new),
            traits: trait_delta(old, new),
            bio: bio_delta(old, new),
            location: location_delta(old, new),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.field_changes.is_empty()
            && self.traits.is_none()
            && self.bio.is_none()
            && self.location.is_none()
    }
}

/// Unequal tracked scalars, keyed by field name.
pub fn scalar_delta(old: &Record, new: &Record) -> BTreeMap<String, FieldChange> {
    SCALAR_FIELDS
        .iter()
        .filter_map(|&field| {
            let (a, b) = (scalar(old, field), scalar(new, field));
            (a != b).then(|| {
                (
                    field.to_string(),
                    FieldChange {
                        old: a.map(str::to_string),
                        new: b.map(str::to_string),
                    },
                )
            })
        })
        .collect()
}

/// Set difference of trait keys, or `None` when the sets are equal.
pub fn trait_delta(old: &Record, new: &Record) -> Option<TraitDelta> {
    let (old_keys, new_keys) = (old.trait_keys(), new.trait_keys());

    let added: Vec<String> = new_keys.difference(&old_keys).map(|k| k.to_string()).collect();
    let removed: Vec<String> = old_keys.difference(&new_keys).map(|k| k.to_string()).collect();

    if added.is_empty() && removed.is_empty() {
        None
    } else {
        Some(TraitDelta {
            characteristics_added: added,
            characteristics_removed: removed,
        })
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Percentage dissimilarity of two normalized bios (0–100, one decimal).
///
/// Based on a character-level similarity ratio. The inputs are put in a
/// canonical order first so the result does not depend on argument order.
pub fn bio_delta_pct(a: &str, b: &str) -> f64 {
    if a == b {
        return 0.0;
    }
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    let ratio = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_chars(first, second)
        .ratio();
    round1((1.0 - f64::from(ratio)) * 100.0).clamp(0.0, 100.0)
}

/// Classify a bio edit after whitespace normalization.
pub fn bio_delta(old: &Record, new: &Record) -> Option<BioDelta> {
    let (old_bio, new_bio) = (old.bio(), new.bio());
    if old_bio == new_bio {
        return None;
    }

    let (kind, delta_pct) = match (old_bio.is_empty(), new_bio.is_empty()) {
        (true, _) => (BioChange::Added, None),
        (_, true) => (BioChange::Removed, None),
        _ => {
            let pct = bio_delta_pct(&old_bio, &new_bio);
            if pct < BIO_NOISE_PCT {
                return None;
            }
            (BioChange::Changed, Some(pct))
        }
    };

    Some(BioDelta {
        kind,
        delta_pct,
        old: old_bio,
        new: new_bio,
    })
}

/// Classify a change of location label and/or foster flag.
pub fn location_delta(old: &Record, new: &Record) -> Option<LocationDelta> {
    if old.location == new.location && old.foster == new.foster {
        return None;
    }

    let change_type = match (old.foster, new.foster) {
        (false, true) => LocationChange::WentToFoster,
        (true, false) => LocationChange::ReturnedFromFoster,
        _ if old.location != new.location => LocationChange::KennelMove,
        _ => LocationChange::Other,
    };

    Some(LocationDelta {
        location_old: old.location.clone(),
        location_new: new.location.clone(),
        foster_old: old.foster,
        foster_new: new.foster,
        change_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AnimalId;

    fn record(id: &str) -> Record {
        Record::new(AnimalId::parse(id).unwrap())
    }

    #[test]
    fn test_identical_records_have_empty_delta() {
        let mut a = record("1");
        a.name = Some("Rex".into());
        a.characteristic_keys = vec!["friendly".into()];
        assert!(RecordDelta::between(&a, &a.clone()).is_empty());
    }

    #[test]
    fn test_scalar_delta() {
        let mut a = record("1");
        let mut b = record("1");
        a.name = Some("Rex".into());
        b.name = Some("Rexy".into());
        b.status = Some("HOLD".into());

        let changes = scalar_delta(&a, &b);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes["name"].old.as_deref(), Some("Rex"));
        assert_eq!(changes["name"].new.as_deref(), Some("Rexy"));
        assert_eq!(changes["status"].old, None);
    }

    #[test]
    fn test_trait_delta_ignores_order_and_names() {
        let mut a = record("1");
        let mut b = record("1");
        a.characteristic_keys = vec!["b".into(), "a".into()];
        b.characteristic_keys = vec!["a".into(), "b".into()];
        b.characteristic_names = vec!["Different display".into()];
        assert!(trait_delta(&a, &b).is_none());

        b.characteristic_keys = vec!["c".into(), "a".into(), "d".into()];
        let delta = trait_delta(&a, &b).unwrap();
        assert_eq!(delta.characteristics_added, vec!["c", "d"]);
        assert_eq!(delta.characteristics_removed, vec!["b"]);
    }

    #[test]
    fn test_bio_whitespace_only_is_not_a_change() {
        let mut a = record("1");
        let mut b = record("1");
        a.description_html = Some("Loves walks.".into());
        b.description_html = Some(" Loves   walks. ".into());
        assert!(bio_delta(&a, &b).is_none());
    }

    #[test]
    fn test_bio_classification() {
        let mut a = record("1");
        let mut b = record("1");

        b.description_html = Some("New bio".into());
        assert_eq!(bio_delta(&a, &b).unwrap().kind, BioChange::Added);
        assert_eq!(bio_delta(&b, &a).unwrap().kind, BioChange::Removed);

        a.description_html = Some("Old bio".into());
        let delta = bio_delta(&a, &b).unwrap();
        assert_eq!(delta.kind, BioChange::Changed);
        assert!(delta.delta_pct.unwrap() > 0.0);
        assert_eq!(delta.old, "Old bio");
    }

    #[test]
    fn test_tiny_bio_edit_is_noise() {
        let base = "x".repeat(3000);
        let mut edited = base.clone();
        edited.push('y');

        let mut a = record("1");
        let mut b = record("1");
        a.description_html = Some(base);
        b.description_html = Some(edited);

        assert!(bio_delta_pct(&a.bio(), &b.bio()) < BIO_NOISE_PCT);
        assert!(bio_delta(&a, &b).is_none());
    }

    #[test]
    fn test_bio_delta_pct_bounds() {
        assert_eq!(bio_delta_pct("same", "same"), 0.0);
        assert_eq!(bio_delta_pct("aaaa", "bbbb"), 100.0);
        let pct = bio_delta_pct("the quick brown fox", "the quick brown cat");
        assert!(pct > 0.0 && pct < 50.0);
        assert_eq!(
            bio_delta_pct("the quick brown fox", "a slow brown fox"),
            bio_delta_pct("a slow brown fox", "the quick brown fox")
        );
    }

    #[test]
    fn test_location_transitions() {
        let mut a = record("1");
        let mut b = record("1");
        a.location = Some("Kennel 1".into());
        b.location = Some("Kennel 1".into());
        assert!(location_delta(&a, &b).is_none());

        b.location = Some("Kennel 2".into());
        assert_eq!(
            location_delta(&a, &b).unwrap().change_type,
            LocationChange::KennelMove
        );

        b.location = Some("Foster".into());
        b.foster = true;
        assert_eq!(
            location_delta(&a, &b).unwrap().change_type,
            LocationChange::WentToFoster
        );
        assert_eq!(
            location_delta(&b, &a).unwrap().change_type,
            LocationChange::ReturnedFromFoster
        );
    }

    #[test]
    fn test_delta_serialization_omits_empty_parts() {
        let mut a = record("1");
        let mut b = record("1");
        a.characteristic_keys = vec!["friendly".into()];
        b.characteristic_keys = vec!["friendly".into(), "shy".into()];

        let value = serde_json::to_value(RecordDelta::between(&a, &b)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "characteristics_added": ["shy"],
                "characteristics_removed": []
            })
        );
    }
}

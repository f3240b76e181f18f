//! Error handling and edge case tests.

use chrono::NaiveDate;
use roster_chronicle::{
    diff, enrich, AnimalId, ChronicleError, DiffArtifact, JsonOutcomeSource, OutcomeRecord,
    Record, Snapshot, SnapshotStore, StoreConfig,
};
use std::fs;
use tempfile::TempDir;

fn test_store(dir: &TempDir) -> SnapshotStore {
    SnapshotStore::open_or_create(StoreConfig {
        path: dir.path().join("snapshots"),
    })
    .unwrap()
}

fn id(raw: &str) -> AnimalId {
    AnimalId::parse(raw).unwrap()
}

// --- Store Errors ---

#[test]
fn test_open_missing_store() {
    let dir = TempDir::new().unwrap();
    let result = SnapshotStore::open(StoreConfig {
        path: dir.path().join("nope"),
    });
    assert!(matches!(result, Err(ChronicleError::StoreNotFound(_))));
}

#[test]
fn test_snapshot_is_never_overwritten() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    let at = NaiveDate::from_ymd_opt(2025, 12, 1)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap();

    store.write_snapshot(&[Record::new(id("1"))], at).unwrap();
    let result = store.write_snapshot(&[], at);
    assert!(matches!(result, Err(ChronicleError::SnapshotExists(_))));

    // Original content untouched
    let snapshot = Snapshot::load(store.path().join("2025-12-01T08-00-00.json")).unwrap();
    assert_eq!(snapshot.len(), 1);
}

// --- Snapshot Errors ---

#[test]
fn test_load_missing_snapshot() {
    let dir = TempDir::new().unwrap();
    let result = Snapshot::load(dir.path().join("2025-12-01T08-00-00.json"));
    assert!(matches!(result, Err(ChronicleError::MalformedSnapshot { .. })));
}

#[test]
fn test_load_non_array_snapshot() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("2025-12-01T08-00-00.json");
    fs::write(&path, r#"{"animal_id": "1"}"#).unwrap();

    match Snapshot::load(&path) {
        Err(ChronicleError::MalformedSnapshot { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected MalformedSnapshot, got {other:?}"),
    }
}

#[test]
fn test_load_truncated_snapshot() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("2025-12-01T08-00-00.json");
    fs::write(&path, r#"[{"animal_id": "1"}, {"animal_"#).unwrap();

    assert!(matches!(
        Snapshot::load(&path),
        Err(ChronicleError::MalformedSnapshot { .. })
    ));
}

#[test]
fn test_invalid_elements_are_discarded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("2025-12-01T08-00-00.json");
    fs::write(
        &path,
        r#"[{"animal_id": "1"}, "junk", 42, {"name": "no id"}, {"animal_id": "  "}, {"code": 2}]"#,
    )
    .unwrap();

    let snapshot = Snapshot::load(&path).unwrap();
    let ids: Vec<&str> = snapshot.records.iter().map(|r| r.animal_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
}

#[test]
fn test_malformed_snapshot_skipped_in_history() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    fs::write(
        store.path().join("2025-12-01T08-00-00.json"),
        r#"[{"animal_id": "1", "name": "Rex"}]"#,
    )
    .unwrap();
    fs::write(store.path().join("2025-12-02T08-00-00.json"), "not json").unwrap();
    fs::write(
        store.path().join("2025-12-03T08-00-00.json"),
        r#"[{"animal_id": "1", "name": "Rexy"}]"#,
    )
    .unwrap();

    let chain = store.history(&id("1")).unwrap();
    assert_eq!(chain.snapshots_found, 2);
    assert_eq!(chain.history[1].snapshot, "2025-12-03T08-00-00.json");

    // Fatal when loaded explicitly
    let broken = &store.discover().unwrap()[1];
    assert!(matches!(
        store.load(broken),
        Err(ChronicleError::MalformedSnapshot { .. })
    ));
}

// --- Duplicates and edge cases ---

#[test]
fn test_duplicate_identity_keeps_last() {
    let old = Snapshot::new("2025-12-01T08-00-00.json", vec![]);
    let mut first = Record::new(id("1"));
    first.name = Some("First".into());
    let mut last = Record::new(id("1"));
    last.name = Some("Last".into());
    let new = Snapshot::new("2025-12-02T08-00-00.json", vec![first, last]);

    let pair = diff(&old, &new);
    assert_eq!(pair.animals_added.len(), 1);
    assert_eq!(pair.animals_added[0].name.as_deref(), Some("Last"));
}

#[test]
fn test_empty_snapshots() {
    let old = Snapshot::new("2025-12-01T08-00-00.json", vec![]);
    let new = Snapshot::new("2025-12-02T08-00-00.json", vec![]);
    let pair = diff(&old, &new);
    assert!(pair.is_empty());
    assert_eq!(pair.summary.total_old, 0);
}

// --- Artifact Errors ---

#[test]
fn test_enrich_requires_timestamps() {
    let old = Snapshot::new("manual-export.json", vec![Record::new(id("1"))]);
    let new = Snapshot::new("2025-12-02T08-00-00.json", vec![]);
    let at = NaiveDate::from_ymd_opt(2025, 12, 2)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    let mut artifact = DiffArtifact::new(diff(&old, &new), at);

    let rows: Vec<OutcomeRecord> = vec![];
    let result = enrich(&mut artifact, rows.as_slice());
    assert!(matches!(result, Err(ChronicleError::MissingTimestamp(_))));
    assert!(artifact.removal_outcome_summary_simple.is_none());
}

fn removal_artifact() -> DiffArtifact {
    let old = Snapshot::new("2025-12-01T08-00-00.json", vec![Record::new(id("1"))]);
    let new = Snapshot::new("2025-12-02T08-00-00.json", vec![]);
    let at = NaiveDate::from_ymd_opt(2025, 12, 2)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    DiffArtifact::new(diff(&old, &new), at)
}

#[test]
fn test_enrich_with_missing_outcomes_file() {
    let dir = TempDir::new().unwrap();
    let mut artifact = removal_artifact();

    let source = JsonOutcomeSource::new(dir.path().join("outcomes.json"));
    let result = enrich(&mut artifact, &source);
    assert!(matches!(result, Err(ChronicleError::Io { .. })));
    assert!(artifact.removal_outcome_summary_simple.is_none());
}

#[test]
fn test_enrich_with_non_array_outcomes_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("outcomes.json");
    fs::write(&path, r#"{"animal_id": "1", "outcome_type": "Adopted"}"#).unwrap();
    let mut artifact = removal_artifact();

    let result = enrich(&mut artifact, &JsonOutcomeSource::new(&path));
    assert!(matches!(result, Err(ChronicleError::Serialization(_))));
    assert!(artifact.diff.animals_removed[0].outcome_status.is_none());
}

#[test]
fn test_load_malformed_artifact() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("diff_a_to_b.json");
    fs::write(&path, r#"{"old_snapshot": "a"}"#).unwrap();

    assert!(matches!(
        DiffArtifact::load(&path),
        Err(ChronicleError::MalformedArtifact { .. })
    ));
}

#[test]
fn test_load_missing_artifact() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        DiffArtifact::load(dir.path().join("diff_missing.json")),
        Err(ChronicleError::Io { .. })
    ));
}

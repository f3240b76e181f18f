//! A single captured roster.

use crate::error::{ChronicleError, Result};
use crate::types::{parse_capture_time, AnimalId, Record};
use chrono::NaiveDateTime;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::warn;

/// One immutable capture of the full roster.
#[derive(Clone, Debug)]
pub struct Snapshot {
    /// Where the snapshot came from, usually the path it was loaded from.
    pub label: String,

    /// Capture time parsed from the label, if it carries one.
    pub captured_at: Option<NaiveDateTime>,

    /// Valid records in file order.
    pub records: Vec<Record>,
}

impl Snapshot {
    /// Build a snapshot from already-validated records.
    pub fn new(label: impl Into<String>, records: Vec<Record>) -> Self {
        let label = label.into();
        Self {
            captured_at: parse_capture_time(&label),
            label,
            records,
        }
    }

    /// Load a snapshot file.
    ///
    /// The whole file is read and parsed before anything is returned, so
    /// a truncated or non-array file fails as a unit.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| ChronicleError::MalformedSnapshot {
            path: path.to_path_buf(),
            reason: format!("unreadable: {e}"),
        })?;
        Self::from_json(path, &bytes)
    }

    /// Parse snapshot JSON; `path` is used for the label and error messages.
    pub fn from_json(path: &Path, bytes: &[u8]) -> Result<Self> {
        let malformed = |reason: String| ChronicleError::MalformedSnapshot {
            path: path.to_path_buf(),
            reason,
        };

        let parsed: Value =
            serde_json::from_slice(bytes).map_err(|e| malformed(format!("invalid JSON: {e}")))?;
        let Value::Array(items) = parsed else {
            return Err(malformed("expected a JSON array of records".into()));
        };

        let mut records = Vec::with_capacity(items.len());
        for (position, item) in items.into_iter().enumerate() {
            if !item.is_object() {
                warn!(snapshot = %path.display(), position, "Discarding non-object entry");
                continue;
            }
            match Record::from_value(item) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(snapshot = %path.display(), position, error = %e, "Discarding malformed record");
                }
            }
        }

        Ok(Self::new(path.display().to_string(), records))
    }

    /// File name portion of the label.
    pub fn name(&self) -> &str {
        Path::new(&self.label)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.label)
    }

    /// Identity → record map. A repeated identity keeps its last occurrence.
    pub fn by_identity(&self) -> BTreeMap<&AnimalId, &Record> {
        let mut map = BTreeMap::new();
        for record in &self.records {
            if map.insert(&record.animal_id, record).is_some() {
                warn!(
                    snapshot = %self.label,
                    animal_id = %record.animal_id,
                    "Duplicate identity in snapshot, keeping last occurrence"
                );
            }
        }
        map
    }

    /// The record for `id`, honouring the same last-occurrence rule.
    pub fn find(&self, id: &AnimalId) -> Option<&Record> {
        let mut matches = self.records.iter().filter(|r| &r.animal_id == id);
        let mut found = matches.next()?;
        let mut count = 1;
        for record in matches {
            found = record;
            count += 1;
        }
        if count > 1 {
            warn!(
                snapshot = %self.label,
                animal_id = %id,
                occurrences = count,
                "Duplicate identity in snapshot, keeping last occurrence"
            );
        }
        Some(found)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_discards_bad_entries() {
        let json = br#"[
            {"animal_id": "1", "name": "Rex"},
            42,
            "text",
            {"name": "no id"},
            {"animal_id": "2"}
        ]"#;
        let snap = Snapshot::from_json(Path::new("2025-12-01T08-00-00.json"), json).unwrap();
        assert_eq!(snap.len(), 2);
        assert!(snap.captured_at.is_some());
        assert_eq!(snap.name(), "2025-12-01T08-00-00.json");
    }

    #[test]
    fn test_from_json_rejects_non_array() {
        let err = Snapshot::from_json(Path::new("x.json"), br#"{"animal_id": "1"}"#).unwrap_err();
        assert!(matches!(err, ChronicleError::MalformedSnapshot { .. }));

        let err = Snapshot::from_json(Path::new("x.json"), br#"[{"animal_id": "1"}"#).unwrap_err();
        assert!(matches!(err, ChronicleError::MalformedSnapshot { .. }));
    }

    #[test]
    fn test_elements_with_legacy_and_current_keys_are_kept() {
        let json = br#"[
            {"animal_id": "1", "code": "1", "name": "Rex"},
            {"animal_id": "2", "description_html": "x", "description": "x"}
        ]"#;
        let snap = Snapshot::from_json(Path::new("2025-12-01T08-00-00.json"), json).unwrap();

        let ids: Vec<&str> = snap.records.iter().map(|r| r.animal_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(snap.records[1].bio(), "x");
    }

    #[test]
    fn test_find_without_match() {
        let snap = Snapshot::from_json(Path::new("a.json"), br#"[{"animal_id": "1"}]"#).unwrap();
        assert!(snap.find(&AnimalId::parse("2").unwrap()).is_none());
    }

    #[test]
    fn test_duplicate_identity_last_wins() {
        let json = br#"[
            {"animal_id": "1", "name": "First"},
            {"animal_id": "1", "name": "Second"}
        ]"#;
        let snap = Snapshot::from_json(Path::new("dup.json"), json).unwrap();
        let map = snap.by_identity();
        assert_eq!(map.len(), 1);

        let id = AnimalId::parse("1").unwrap();
        assert_eq!(map[&id].name.as_deref(), Some("Second"));
        assert_eq!(snap.find(&id).unwrap().name.as_deref(), Some("Second"));
    }
}

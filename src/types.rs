//! Core types for roster snapshots.

use crate::normalize::normalize_text;
use chrono::NaiveDateTime;
use regex::Regex;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

/// Capture timestamp layout used in snapshot file names.
pub const CAPTURE_STAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

static CAPTURE_STAMP: OnceLock<Regex> = OnceLock::new();

fn capture_stamp_regex() -> &'static Regex {
    CAPTURE_STAMP.get_or_init(|| {
        Regex::new(r"(\d{4}-\d{2}-\d{2})T(\d{2})-(\d{2})-(\d{2})")
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

/// Extract the capture time embedded in a snapshot name or path,
/// e.g. `snapshots/2025-12-04T23-22-46.json`.
///
/// Returns `None` when no stamp is present or it is not a real date.
pub fn parse_capture_time(name: &str) -> Option<NaiveDateTime> {
    let caps = capture_stamp_regex().captures(name)?;
    let iso = format!("{}T{}:{}:{}", &caps[1], &caps[2], &caps[3], &caps[4]);
    NaiveDateTime::parse_from_str(&iso, "%Y-%m-%dT%H:%M:%S").ok()
}

/// Render a capture time the way snapshot files are named.
pub fn capture_stamp(at: NaiveDateTime) -> String {
    at.format(CAPTURE_STAMP_FORMAT).to_string()
}

/// Serde helper for artifact timestamps (`2025-12-04T23:22:46`).
pub(crate) mod iso_seconds {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn serialize<S: Serializer>(at: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&at.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Stable external identity of an animal (the shelter's animal code).
///
/// Upstream sends it as either a string or an integer; both become a
/// trimmed string so `17360` and `" 17360 "` match.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnimalId(String);

impl AnimalId {
    /// Build an identity from user input. Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(AnimalId(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key used when joining against external feeds.
    pub fn join_key(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Debug for AnimalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnimalId({})", self.0)
    }
}

impl fmt::Display for AnimalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for AnimalId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AnimalId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(d)?;
        let text = match &raw {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            other => {
                return Err(de::Error::custom(format!(
                    "animal_id must be a string or number, got {other}"
                )))
            }
        };
        AnimalId::parse(&text).ok_or_else(|| de::Error::custom("animal_id is empty"))
    }
}

/// Render any JSON scalar as a string. Nested values keep their compact
/// JSON form so they still compare by content.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        nested => Some(nested.to_string()),
    }
}

fn loose_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(scalar_to_string(&Value::deserialize(d)?))
}

fn loose_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    match Value::deserialize(d)? {
        Value::Array(items) => Ok(items.iter().filter_map(scalar_to_string).collect()),
        _ => Ok(Vec::new()),
    }
}

fn truthy<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    })
}

/// `(legacy, current)` key pairs accepted by [`Record`] as serde aliases.
const RECORD_LEGACY_KEYS: &[(&str, &str)] = &[
    ("code", "animal_id"),
    ("specie_name", "species"),
    ("sex_key", "sex"),
    ("status_key", "status"),
    ("description", "description_html"),
];

/// Leave at most one key of each `(legacy, current)` pair in an object.
///
/// Serde rejects an object holding a field under both its name and an
/// alias. The current key is kept unless it is null and the legacy key
/// is not.
pub(crate) fn drop_shadowed_keys(value: &mut Value, pairs: &[(&str, &str)]) {
    let Value::Object(map) = value else {
        return;
    };
    for &(legacy, current) in pairs {
        let (Some(current_value), Some(legacy_value)) = (map.get(current), map.get(legacy)) else {
            continue;
        };
        if current_value.is_null() && !legacy_value.is_null() {
            map.remove(current);
        } else {
            map.remove(legacy);
        }
    }
}

/// One animal as captured in one snapshot.
///
/// Older snapshot files used upstream key names (`code`, `sex_key`,
/// `status_key`, ...); the aliases map them onto the current schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, deserialize_with = "loose_string")]
    pub uuid: Option<String>,

    #[serde(alias = "code")]
    pub animal_id: AnimalId,

    #[serde(default, deserialize_with = "loose_string")]
    pub name: Option<String>,

    #[serde(default, alias = "specie_name", deserialize_with = "loose_string")]
    pub species: Option<String>,

    #[serde(default, alias = "sex_key", deserialize_with = "loose_string")]
    pub sex: Option<String>,

    #[serde(default, deserialize_with = "loose_string")]
    pub age_key: Option<String>,

    #[serde(default, deserialize_with = "loose_string")]
    pub size_key: Option<String>,

    #[serde(default, deserialize_with = "loose_string")]
    pub breed_primary_name: Option<String>,

    #[serde(default, alias = "status_key", deserialize_with = "loose_string")]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "truthy")]
    pub foster: bool,

    #[serde(default, deserialize_with = "loose_string")]
    pub kennel_number: Option<String>,

    /// Friendly location label (`Foster`, `Kennel 12`, `Unspecified`).
    #[serde(default, deserialize_with = "loose_string")]
    pub location: Option<String>,

    #[serde(default, deserialize_with = "loose_string")]
    pub picture: Option<String>,

    #[serde(default, alias = "description", deserialize_with = "loose_string")]
    pub description_html: Option<String>,

    #[serde(default, deserialize_with = "loose_list")]
    pub characteristic_keys: Vec<String>,

    #[serde(default, deserialize_with = "loose_list")]
    pub characteristic_names: Vec<String>,
}

impl Record {
    /// Minimal record with only an identity; used by tests and builders.
    pub fn new(animal_id: AnimalId) -> Self {
        Self {
            uuid: None,
            animal_id,
            name: None,
            species: None,
            sex: None,
            age_key: None,
            size_key: None,
            breed_primary_name: None,
            status: None,
            foster: false,
            kennel_number: None,
            location: None,
            picture: None,
            description_html: None,
            characteristic_keys: Vec::new(),
            characteristic_names: Vec::new(),
        }
    }

    /// Validate one raw snapshot element against the schema.
    ///
    /// An element carrying both a legacy key and its current name keeps
    /// the current one.
    pub fn from_value(mut value: Value) -> std::result::Result<Self, serde_json::Error> {
        drop_shadowed_keys(&mut value, RECORD_LEGACY_KEYS);
        serde_json::from_value(value)
    }

    /// Whitespace-normalized bio; empty when there is none.
    pub fn bio(&self) -> String {
        normalize_text(self.description_html.as_deref())
    }

    /// Trait identifiers as a set. Names are display-only and never compared.
    pub fn trait_keys(&self) -> BTreeSet<&str> {
        self.characteristic_keys.iter().map(String::as_str).collect()
    }

    pub fn has_traits(&self) -> bool {
        !self.characteristic_keys.is_empty() || !self.characteristic_names.is_empty()
    }
}

/// Fixed display projection carried by added, removed and changed entries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimalSummary {
    pub uuid: Option<String>,
    pub animal_id: AnimalId,
    pub name: Option<String>,
    pub species: Option<String>,
    pub sex: Option<String>,
    pub age_key: Option<String>,
    pub size_key: Option<String>,
    pub breed_primary_name: Option<String>,
    pub status: Option<String>,
    pub location: Option<String>,
}

impl From<&Record> for AnimalSummary {
    fn from(record: &Record) -> Self {
        Self {
            uuid: record.uuid.clone(),
            animal_id: record.animal_id.clone(),
            name: record.name.clone(),
            species: record.species.clone(),
            sex: record.sex.clone(),
            age_key: record.age_key.clone(),
            size_key: record.size_key.clone(),
            breed_primary_name: record.breed_primary_name.clone(),
            status: record.status.clone(),
            location: record.location.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_capture_time() {
        let at = parse_capture_time("snapshots/2025-12-04T23-22-46.json").unwrap();
        assert_eq!(capture_stamp(at), "2025-12-04T23-22-46");

        assert!(parse_capture_time("latest_diff.json").is_none());
        assert!(parse_capture_time("2025-13-40T23-22-46.json").is_none());
    }

    #[test]
    fn test_identity_accepts_numbers_and_trims() {
        let a: Record = Record::from_value(json!({"animal_id": 17360})).unwrap();
        let b: Record = Record::from_value(json!({"animal_id": " 17360 "})).unwrap();
        assert_eq!(a.animal_id, b.animal_id);
        assert_eq!(a.animal_id.as_str(), "17360");
    }

    #[test]
    fn test_missing_or_blank_identity_is_rejected() {
        assert!(Record::from_value(json!({"name": "Rex"})).is_err());
        assert!(Record::from_value(json!({"animal_id": "  "})).is_err());
        assert!(Record::from_value(json!({"animal_id": null})).is_err());
    }

    #[test]
    fn test_legacy_field_names() {
        let rec = Record::from_value(json!({
            "code": "A1",
            "sex_key": "male",
            "status_key": "available",
            "specie_name": "Dog",
            "description": "Good boy"
        }))
        .unwrap();

        assert_eq!(rec.animal_id.as_str(), "A1");
        assert_eq!(rec.sex.as_deref(), Some("male"));
        assert_eq!(rec.status.as_deref(), Some("available"));
        assert_eq!(rec.species.as_deref(), Some("Dog"));
        assert_eq!(rec.bio(), "Good boy");
    }

    #[test]
    fn test_current_key_wins_over_legacy_key() {
        let rec = Record::from_value(json!({
            "animal_id": "A1",
            "code": "OLD",
            "status": "HOLD",
            "status_key": "available",
            "description_html": "New bio",
            "description": "Old bio"
        }))
        .unwrap();

        assert_eq!(rec.animal_id.as_str(), "A1");
        assert_eq!(rec.status.as_deref(), Some("HOLD"));
        assert_eq!(rec.bio(), "New bio");
    }

    #[test]
    fn test_null_current_key_falls_back_to_legacy() {
        let rec = Record::from_value(json!({
            "code": "A1",
            "species": null,
            "specie_name": "Cat"
        }))
        .unwrap();
        assert_eq!(rec.species.as_deref(), Some("Cat"));
    }

    #[test]
    fn test_loose_fields() {
        let rec = Record::from_value(json!({
            "animal_id": "1",
            "kennel_number": 12,
            "foster": "yes",
            "characteristic_keys": "not-a-list",
            "characteristic_names": ["Friendly", null]
        }))
        .unwrap();

        assert_eq!(rec.kennel_number.as_deref(), Some("12"));
        assert!(rec.foster);
        assert!(rec.characteristic_keys.is_empty());
        assert_eq!(rec.characteristic_names, vec!["Friendly".to_string()]);
        assert!(rec.has_traits());
    }

    #[test]
    fn test_foster_truthiness() {
        for (raw, expected) in [
            (json!(null), false),
            (json!(false), false),
            (json!(0), false),
            (json!(""), false),
            (json!(1), true),
            (json!(true), true),
        ] {
            let rec = Record::from_value(json!({"animal_id": "1", "foster": raw})).unwrap();
            assert_eq!(rec.foster, expected);
        }
    }
}

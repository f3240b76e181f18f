//! Restore pack: the latest known-good bio and traits.

use super::HistoryEntry;
use crate::types::iso_seconds;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoredBio {
    #[serde(with = "iso_seconds", alias = "dt")]
    pub timestamp: NaiveDateTime,
    pub snapshot: String,
    /// Whitespace-normalized bio text.
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoredTraits {
    #[serde(with = "iso_seconds", alias = "dt")]
    pub timestamp: NaiveDateTime,
    pub snapshot: String,
    pub characteristic_keys: Vec<String>,
    pub characteristic_names: Vec<String>,
}

/// Bio and traits are searched independently, newest first; either may
/// be `None` when no snapshot ever had one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestorePack {
    pub latest_nonempty_bio: Option<RestoredBio>,
    pub latest_nonempty_traits: Option<RestoredTraits>,
}

impl RestorePack {
    pub(crate) fn from_entries(entries: &[HistoryEntry]) -> Self {
        let latest_nonempty_bio = entries.iter().rev().find_map(|entry| {
            let text = entry.record.bio();
            (!text.is_empty()).then(|| RestoredBio {
                timestamp: entry.timestamp,
                snapshot: entry.snapshot.clone(),
                text,
            })
        });

        let latest_nonempty_traits = entries
            .iter()
            .rev()
            .find(|entry| entry.record.has_traits())
            .map(|entry| RestoredTraits {
                timestamp: entry.timestamp,
                snapshot: entry.snapshot.clone(),
                characteristic_keys: entry.record.characteristic_keys.clone(),
                characteristic_names: entry.record.characteristic_names.clone(),
            });

        Self {
            latest_nonempty_bio,
            latest_nonempty_traits,
        }
    }
}

//! Directory of timestamped snapshot files.

use crate::error::{ChronicleError, Result};
use crate::history::{HistoryBuilder, HistoryChain};
use crate::snapshot::Snapshot;
use crate::types::{capture_stamp, parse_capture_time, AnimalId, Record};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name prefix marking diff artifacts.
pub const DIFF_PREFIX: &str = "diff_";

/// Legacy name of the rolling diff artifact; never treated as a snapshot.
const LATEST_DIFF_NAME: &str = "latest_diff.json";

/// Store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Directory holding snapshot and diff files.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("snapshots"),
        }
    }
}

/// A discovered snapshot file, not yet loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotRef {
    pub name: String,
    pub path: PathBuf,
    pub captured_at: NaiveDateTime,
}

/// The snapshot directory.
///
/// Snapshots are written once and never modified. Reads go through
/// [`Snapshot::load`], so every load is all-or-nothing.
pub struct SnapshotStore {
    config: StoreConfig,
}

impl SnapshotStore {
    /// Open an existing snapshot directory.
    pub fn open(config: StoreConfig) -> Result<Self> {
        if !config.path.is_dir() {
            return Err(ChronicleError::StoreNotFound(config.path));
        }
        Ok(Self { config })
    }

    /// Open the directory, creating it first if needed.
    pub fn open_or_create(config: StoreConfig) -> Result<Self> {
        fs::create_dir_all(&config.path).map_err(|e| ChronicleError::io(&config.path, e))?;
        Self::open(config)
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    fn is_diff_artifact(name: &str) -> bool {
        name.starts_with(DIFF_PREFIX) || name == LATEST_DIFF_NAME
    }

    fn json_file_names(&self) -> Result<Vec<(String, PathBuf)>> {
        let dir = &self.config.path;
        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| ChronicleError::io(dir, e))? {
            let entry = entry.map_err(|e| ChronicleError::io(dir, e))?;
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                files.push((name.to_string(), path.clone()));
            }
        }
        Ok(files)
    }

    /// All snapshot files, oldest first.
    ///
    /// Diff artifacts and files without a capture stamp in their name are
    /// left out.
    pub fn discover(&self) -> Result<Vec<SnapshotRef>> {
        let mut snapshots = Vec::new();
        for (name, path) in self.json_file_names()? {
            if Self::is_diff_artifact(&name) {
                continue;
            }
            match parse_capture_time(&name) {
                Some(captured_at) => snapshots.push(SnapshotRef {
                    name,
                    path,
                    captured_at,
                }),
                None => debug!(file = %name, "Ignoring file without capture stamp"),
            }
        }

        snapshots.sort_by(|a, b| {
            a.captured_at
                .cmp(&b.captured_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(snapshots)
    }

    /// Load a discovered snapshot.
    pub fn load(&self, snapshot: &SnapshotRef) -> Result<Snapshot> {
        Snapshot::load(&snapshot.path)
    }

    /// The two most recent snapshots, if there are at least two.
    pub fn latest_pair(&self) -> Result<Option<(SnapshotRef, SnapshotRef)>> {
        let mut snapshots = self.discover()?;
        let Some(new) = snapshots.pop() else {
            return Ok(None);
        };
        Ok(snapshots.pop().map(|old| (old, new)))
    }

    /// Persist a freshly captured roster as `<stamp>.json`.
    ///
    /// Fails if a snapshot with the same stamp already exists.
    pub fn write_snapshot(&self, records: &[Record], captured_at: NaiveDateTime) -> Result<SnapshotRef> {
        let name = format!("{}.json", capture_stamp(captured_at));
        let path = self.config.path.join(&name);
        if path.exists() {
            return Err(ChronicleError::SnapshotExists(path));
        }

        write_json_atomic(&path, records)?;
        info!(snapshot = %name, records = records.len(), "Saved snapshot");

        Ok(SnapshotRef {
            name,
            path,
            captured_at,
        })
    }

    /// History of one animal across every discovered snapshot.
    ///
    /// Snapshots that fail to load are skipped with a warning; the rest
    /// are read one at a time.
    pub fn history(&self, identity: &AnimalId) -> Result<HistoryChain> {
        let mut builder = HistoryBuilder::new(identity.clone());
        for snapshot_ref in self.discover()? {
            match self.load(&snapshot_ref) {
                Ok(snapshot) => builder.observe(&snapshot),
                Err(e) => warn!(snapshot = %snapshot_ref.name, error = %e, "Skipping unreadable snapshot"),
            }
        }
        Ok(builder.finish())
    }

    /// The most recent diff artifact by file name.
    pub fn latest_diff(&self) -> Result<Option<PathBuf>> {
        let mut diffs: Vec<(String, PathBuf)> = self
            .json_file_names()?
            .into_iter()
            .filter(|(name, _)| name.starts_with(DIFF_PREFIX))
            .collect();
        diffs.sort();
        Ok(diffs.pop().map(|(_, path)| path))
    }

    /// Default location of the artifact for a diff between two snapshot
    /// files: `diff_<old>_to_<new>.json` next to the old snapshot.
    pub fn diff_artifact_path(old: &Path, new: &Path) -> PathBuf {
        let stem = |p: &Path| {
            p.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        let name = format!("{DIFF_PREFIX}{}_to_{}.json", stem(old), stem(new));
        old.parent().unwrap_or_else(|| Path::new("")).join(name)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

/// Write text through a temp file and rename, so readers never see a
/// partial file.
pub fn write_text_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp = temp_path(path);
    if let Err(e) = fs::write(&tmp, contents) {
        let _ = fs::remove_file(&tmp);
        return Err(ChronicleError::io(&tmp, e));
    }
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        ChronicleError::io(path, e)
    })
}

/// Pretty-printed JSON, written atomically.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    write_text_atomic(path, &text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_artifact_path() {
        let path = SnapshotStore::diff_artifact_path(
            Path::new("snaps/2025-12-02T08-00-00.json"),
            Path::new("other/2025-12-03T08-00-00.json"),
        );
        assert_eq!(
            path,
            PathBuf::from("snaps/diff_2025-12-02T08-00-00_to_2025-12-03T08-00-00.json")
        );
    }

    #[test]
    fn test_temp_path_is_hidden_sibling() {
        assert_eq!(
            temp_path(Path::new("a/b.json")),
            PathBuf::from("a/.b.json.tmp")
        );
    }
}

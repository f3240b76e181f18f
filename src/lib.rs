//! # Roster Chronicle
//!
//! Change tracking for a shelter's public adoption roster. The roster is
//! captured periodically as timestamped JSON snapshots; this crate
//! compares them and reconstructs each animal's history across them.
//!
//! ## Core Concepts
//!
//! - **Snapshots**: Immutable arrays of normalized animal records, one file per capture
//! - **Diffs**: Added, removed and changed animals between two snapshots
//! - **History**: One animal's chronological change log, plus a restore pack
//! - **Outcomes**: Adoption/transfer results joined onto removed animals
//!
//! ## Example
//!
//! ```ignore
//! use roster_chronicle::{diff, AnimalId, SnapshotStore, StoreConfig};
//!
//! let store = SnapshotStore::open(StoreConfig {
//!     path: "./snapshots".into(),
//! })?;
//!
//! // Compare the two most recent captures
//! if let Some((old, new)) = store.latest_pair()? {
//!     let pair = diff(&store.load(&old)?, &store.load(&new)?);
//!     println!("{} changed", pair.summary.animals_changed);
//! }
//!
//! // Follow one animal across every capture
//! if let Some(id) = AnimalId::parse("A1234") {
//!     let chain = store.history(&id)?;
//! }
//! ```

pub mod diff;
pub mod error;
pub mod history;
pub mod normalize;
pub mod outcomes;
pub mod render;
pub mod snapshot;
pub mod store;
pub mod types;

// Re-exports
pub use diff::{
    diff, BioChange, BioDelta, ChangedAnimal, DiffArtifact, DiffSummary, FieldChange,
    LocationChange, LocationDelta, PairDiff, RecordDelta, RemovedAnimal, TraitDelta,
};
pub use error::{ChronicleError, Result};
pub use history::{history, HistoryBuilder, HistoryChain, HistoryEntry, RestorePack};
pub use normalize::{location_label, normalize_listing, normalize_text};
pub use outcomes::{
    attach_outcomes, enrich, JsonOutcomeSource, OutcomeRecord, OutcomeSource, OutcomeSummary,
};
pub use render::{render_diff, render_history};
pub use snapshot::Snapshot;
pub use store::{write_json_atomic, write_text_atomic, SnapshotRef, SnapshotStore, StoreConfig};
pub use types::*;

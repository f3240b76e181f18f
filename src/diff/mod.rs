//! Snapshot diffing.
//!
//! [`diff`] compares two snapshots keyed by identity. Per-animal changes
//! are split into four independent sub-deltas (scalar fields, traits,
//! bio, location/foster) and an animal is reported as changed only when
//! at least one of them is non-empty.

mod artifact;
mod pair;
mod record;

pub use artifact::DiffArtifact;
pub use pair::{diff, ChangedAnimal, DiffSummary, PairDiff, RemovedAnimal};
pub use record::{
    bio_delta, bio_delta_pct, location_delta, scalar_delta, trait_delta, BioChange, BioDelta,
    FieldChange, LocationChange, LocationDelta, RecordDelta, TraitDelta, BIO_NOISE_PCT,
    SCALAR_FIELDS,
};

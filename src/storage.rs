//! Storage Layer
//!
//! Single-slot, in-memory storage of the latest scrape result per target:
//! - **Writers**: scrape workers replace a target's whole [`Snapshot`]
//! - **Readers**: the exposition path copies out every target's snapshot
//!
//! No history is kept. A reader overlapping a write sees either the old or the
//! new snapshot in full.
//!
//! # Components
//!
//! - [`TargetCache`]: per-target isolated snapshot cache
//! - [`Snapshot`] / [`SnapshotBuilder`]: immutable scrape results
//! - [`MetricSample`]: one observation of a catalog descriptor

mod cache;
mod types;

pub use cache::TargetCache;
pub use types::{MetricSample, Snapshot, SnapshotBuilder};

//! Per-target snapshot cache.
//!
//! Two lock levels:
//!
//! - the key set (`RwLock<HashMap<..>>`), write-locked only while a new target
//!   is inserted;
//! - one `RwLock` per entry guarding that target's snapshot handle.
//!
//! Entry locks are held only for an `Arc` swap or clone, never across I/O, and
//! never two at a time. Operations on different targets do not contend on
//! entry locks.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::types::Snapshot;

/// Cache slot for one target.
#[derive(Debug, Default)]
struct CacheEntry {
    snapshot: RwLock<Arc<Snapshot>>,
}

/// Latest snapshot per target, keyed by the target's normalized address.
#[derive(Debug, Default)]
pub struct TargetCache {
    entries: RwLock<HashMap<String, Arc<CacheEntry>>>,
}

impl TargetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot of `target`, creating the entry on first use.
    pub fn put(&self, target: &str, snapshot: Snapshot) {
        let entry = self.entry(target);
        let snapshot = Arc::new(snapshot);
        *entry.snapshot.write() = snapshot;
    }

    /// Current snapshot of one target.
    pub fn get(&self, target: &str) -> Option<Arc<Snapshot>> {
        let entry = self.entries.read().get(target).cloned()?;
        let snapshot = entry.snapshot.read().clone();
        Some(snapshot)
    }

    /// Copy out the current snapshot of every known target, sorted by key.
    pub fn read_all(&self) -> Vec<(String, Arc<Snapshot>)> {
        let entries: Vec<(String, Arc<CacheEntry>)> = self
            .entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect();

        let mut out: Vec<_> = entries
            .into_iter()
            .map(|(key, entry)| {
                let snapshot = entry.snapshot.read().clone();
                (key, snapshot)
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Number of targets with an entry.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, target: &str) -> Arc<CacheEntry> {
        if let Some(entry) = self.entries.read().get(target) {
            return Arc::clone(entry);
        }
        let mut entries = self.entries.write();
        Arc::clone(entries.entry(target.to_owned()).or_default())
    }
}

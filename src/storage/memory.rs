//! In-memory window store.
//!
//! Backed by `DashMap`, which splits the table into independently locked
//! shards. An `increment` holds the write lock of one shard for the whole
//! read-modify-write, which makes per-key updates linearizable. A sweep walks
//! the shards one at a time, so a request stalls for at most one shard's
//! worth of eviction, never for the whole table.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::storage::{WindowEntry, WindowStore};

/// In-memory, sharded window store.
///
/// # Example
///
/// ```ignore
/// use admission_ratelimit::storage::{MemoryWindowStore, WindowStore};
///
/// let store = MemoryWindowStore::new();
/// let entry = store.increment("ip:1.1.1.1", 0, 1000);
/// assert_eq!(entry.count, 1);
/// ```
#[derive(Default)]
pub struct MemoryWindowStore {
    data: DashMap<String, WindowEntry>,
}

impl std::fmt::Debug for MemoryWindowStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryWindowStore")
            .field("entries", &self.data.len())
            .finish()
    }
}

impl MemoryWindowStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with room for `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: DashMap::with_capacity(capacity),
        }
    }
}

/// Apply one request to an existing entry.
fn bump(entry: &mut WindowEntry, now: u64, window_ms: u64) {
    if entry.is_expired(now) {
        *entry = WindowEntry::fresh(now, window_ms);
    } else {
        entry.count = entry.count.saturating_add(1);
    }
}

impl WindowStore for MemoryWindowStore {
    fn increment(&self, key: &str, now: u64, window_ms: u64) -> WindowEntry {
        // Fast path avoids allocating the key for known clients.
        if let Some(mut slot) = self.data.get_mut(key) {
            bump(&mut slot, now, window_ms);
            return *slot;
        }

        match self.data.entry(key.to_owned()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                bump(entry, now, window_ms);
                *entry
            }
            Entry::Vacant(vacant) => *vacant.insert(WindowEntry::fresh(now, window_ms)),
        }
    }

    fn peek(&self, key: &str, now: u64) -> Option<WindowEntry> {
        self.data
            .get(key)
            .map(|slot| *slot)
            .filter(|entry| !entry.is_expired(now))
    }

    fn clear(&self, key: &str) {
        self.data.remove(key);
    }

    fn sweep_expired(&self, now: u64) -> usize {
        let mut evicted = 0;
        self.data.retain(|_, entry| {
            if entry.is_expired(now) {
                evicted += 1;
                false
            } else {
                true
            }
        });
        evicted
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

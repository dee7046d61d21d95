//! Window store trait and the in-memory implementation.
//!
//! The store is the only mutable state a limiter shares between request
//! threads and its reclaimer. Every mutation goes through [`WindowStore`].

mod entry;
mod memory;

pub use entry::WindowEntry;
pub use memory::MemoryWindowStore;

/// Table of per-key fixed-window counters.
///
/// Implementations must be thread-safe. All operations are in-memory and
/// must not block on I/O.
///
/// # Required Operations
///
/// - `increment`: Atomically count one request, opening a new window if needed
/// - `peek`: Read a live entry without mutating anything
/// - `clear`: Remove a key
/// - `sweep_expired`: Remove every expired entry
pub trait WindowStore: Send + Sync + 'static {
    /// Count one request for `key` at time `now`.
    ///
    /// If the key is absent or its window ended (`now >= reset_at`), the entry
    /// is replaced by `{count: 1, reset_at: now + window_ms}`. Otherwise the
    /// count is incremented. Returns the entry AFTER the update.
    ///
    /// Concurrent calls on one key are linearizable: N calls against a fresh
    /// key observe exactly the counts 1..=N.
    fn increment(&self, key: &str, now: u64, window_ms: u64) -> WindowEntry;

    /// Get the live entry for `key`.
    ///
    /// Returns `None` if the key is absent or its window ended. Never mutates.
    fn peek(&self, key: &str, now: u64) -> Option<WindowEntry>;

    /// Remove the entry for `key`. Succeeds even if the key was absent.
    fn clear(&self, key: &str);

    /// Remove every entry with `reset_at <= now`. Returns how many were removed.
    fn sweep_expired(&self, now: u64) -> usize;

    /// Number of stored entries, expired ones included.
    fn len(&self) -> usize;

    /// Check if the store holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: WindowStore + ?Sized> WindowStore for std::sync::Arc<S> {
    fn increment(&self, key: &str, now: u64, window_ms: u64) -> WindowEntry {
        (**self).increment(key, now, window_ms)
    }

    fn peek(&self, key: &str, now: u64) -> Option<WindowEntry> {
        (**self).peek(key, now)
    }

    fn clear(&self, key: &str) {
        (**self).clear(key)
    }

    fn sweep_expired(&self, now: u64) -> usize {
        (**self).sweep_expired(now)
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

//! Per-key counting state.

use serde::{Deserialize, Serialize};

/// Counter for one key in one fixed window.
///
/// While `now < reset_at` the count only grows. Once `now >= reset_at` the
/// entry is expired and readers treat it as absent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowEntry {
    /// Requests counted in the current window, admitted or not.
    pub count: u64,

    /// End of the window (Unix milliseconds, exclusive).
    pub reset_at: u64,
}

impl WindowEntry {
    /// Start a fresh window at `now` holding one request.
    pub fn fresh(now: u64, window_ms: u64) -> Self {
        Self {
            count: 1,
            reset_at: now.saturating_add(window_ms),
        }
    }

    /// Check if the window has ended.
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.reset_at
    }
}

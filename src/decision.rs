//! Admission decision type.
//!
//! Every call to [`Limiter::check`](crate::Limiter::check) yields a
//! `CheckResult`: allow or deny, plus the counters a client needs to pace
//! itself.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The result of one admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Whether the request is admitted.
    pub allowed: bool,
    /// Maximum requests per window.
    pub limit: u64,
    /// Requests left in the current window, clamped at zero.
    pub remaining: u64,
    /// End of the current window (Unix milliseconds).
    pub reset_at: u64,
    /// Whole seconds to wait before retrying. Present iff `!allowed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl CheckResult {
    /// Create an "allowed" result.
    pub fn allowed(limit: u64, remaining: u64, reset_at: u64) -> Self {
        Self {
            allowed: true,
            limit,
            remaining,
            reset_at,
            retry_after_secs: None,
        }
    }

    /// Create a "denied" result at time `now`.
    ///
    /// The retry delay is `ceil((reset_at - now) / 1000)` seconds, and never
    /// less than one second.
    pub fn denied(limit: u64, reset_at: u64, now: u64) -> Self {
        let wait_ms = reset_at.saturating_sub(now);
        Self {
            allowed: false,
            limit,
            remaining: 0,
            reset_at,
            retry_after_secs: Some(wait_ms.div_ceil(1000).max(1)),
        }
    }

    /// Check if the request is allowed.
    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// Check if the request is denied.
    pub fn is_denied(&self) -> bool {
        !self.allowed
    }

    /// Retry delay as a `Duration`.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after_secs.map(Duration::from_secs)
    }

    /// Window end in whole Unix seconds, rounded up.
    pub fn reset_epoch_secs(&self) -> u64 {
        self.reset_at.div_ceil(1000)
    }
}

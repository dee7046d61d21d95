//! Quota configuration for fixed-window limiting.
//!
//! A `Quota` says how many requests one key may make per window.
//!
//! # Examples
//!
//! ```ignore
//! use admission_ratelimit::Quota;
//! use std::time::Duration;
//!
//! // 5 requests per 15 minutes
//! let quota = Quota::new(5, Duration::from_secs(15 * 60));
//!
//! // From configuration values, validated
//! let quota = Quota::from_millis(100, 900_000)?;
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Requests per window for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    /// Maximum number of admitted requests per window.
    max_requests: u64,

    /// Window length.
    window: Duration,
}

impl Quota {
    /// A quota of `max_requests` per `window`.
    ///
    /// # Panics
    ///
    /// If `max_requests` is 0 or `window` is under a millisecond. Values read
    /// from configuration go through [`Quota::try_new`] instead.
    pub fn new(max_requests: u64, window: Duration) -> Self {
        if let Some(problem) = invalid(max_requests, window) {
            panic!("invalid quota: {}", problem);
        }
        Self {
            max_requests,
            window,
        }
    }

    /// `n` requests per minute.
    pub fn per_minute(n: u64) -> Self {
        Self::new(n, Duration::from_secs(60))
    }

    /// `n` requests per hour.
    pub fn per_hour(n: u64) -> Self {
        Self::new(n, Duration::from_secs(60 * 60))
    }

    /// `n` requests per day.
    pub fn per_day(n: u64) -> Self {
        Self::new(n, Duration::from_secs(24 * 60 * 60))
    }

    /// Like [`Quota::new`], but reports bad values as [`ConfigError::InvalidQuota`].
    pub fn try_new(max_requests: u64, window: Duration) -> Result<Self> {
        match invalid(max_requests, window) {
            Some(problem) => Err(ConfigError::InvalidQuota(problem.to_string()).into()),
            None => Ok(Self {
                max_requests,
                window,
            }),
        }
    }

    /// Try to create a quota from a millisecond window.
    pub fn from_millis(max_requests: u64, window_ms: u64) -> Result<Self> {
        Self::try_new(max_requests, Duration::from_millis(window_ms))
    }

    /// Requests admitted per window.
    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    /// Window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Get the window length in milliseconds.
    pub fn window_ms(&self) -> u64 {
        self.window.as_millis() as u64
    }
}

fn invalid(max_requests: u64, window: Duration) -> Option<&'static str> {
    if max_requests == 0 {
        Some("max_requests must be at least 1")
    } else if window < Duration::from_millis(1) {
        Some("window must be at least 1ms")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_minute() {
        let quota = Quota::per_minute(60);
        assert_eq!(quota.max_requests(), 60);
        assert_eq!(quota.window(), Duration::from_secs(60));
        assert_eq!(quota.window_ms(), 60_000);
    }

    #[test]
    fn test_per_day() {
        let quota = Quota::per_day(1);
        assert_eq!(quota.window_ms(), 86_400_000);
    }

    #[test]
    fn test_try_new_rejects_degenerate_values() {
        assert!(Quota::try_new(0, Duration::from_secs(60)).is_err());
        assert!(Quota::try_new(10, Duration::ZERO).is_err());
        // Sub-millisecond windows would truncate to zero.
        assert!(Quota::try_new(10, Duration::from_micros(500)).is_err());
    }

    #[test]
    fn test_from_millis() {
        let quota = Quota::from_millis(3, 1000).unwrap();
        assert_eq!(quota.max_requests(), 3);
        assert_eq!(quota.window(), Duration::from_secs(1));

        assert!(Quota::from_millis(3, 0).is_err());
    }

    #[test]
    #[should_panic(expected = "max_requests must be at least 1")]
    fn test_new_panics_on_zero_requests() {
        Quota::new(0, Duration::from_secs(60));
    }

    #[test]
    #[should_panic(expected = "window must be at least 1ms")]
    fn test_new_panics_on_empty_window() {
        Quota::new(100, Duration::ZERO);
    }
}

//! Fixed-window limiter.
//!
//! A [`Limiter`] owns one window store and one reclaimer. It is `Active` from
//! construction until [`Limiter::destroy`], after which every operation fails
//! with [`RateLimitError::Destroyed`].
//!
//! # Example
//!
//! ```ignore
//! use admission_ratelimit::{Limiter, LimiterConfig, ReclaimInterval};
//! use admission_ratelimit::key::Identity;
//! use std::time::Duration;
//!
//! let limiter = Limiter::new(
//!     LimiterConfig::new("auth", 5, Duration::from_secs(900))
//!         .with_reclaim(ReclaimInterval::Manual),
//! )?;
//!
//! let identity = Identity::new().with_header("x-real-ip", "8.8.8.8");
//! let result = limiter.check(&identity)?;
//! assert_eq!(result.remaining, 4);
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, error};

use crate::clock::{Clock, SystemClock};
use crate::decision::CheckResult;
use crate::error::{RateLimitError, Result};
use crate::key::{KeyStrategy, RequestIdentity};
use crate::quota::Quota;
use crate::reclaimer::{ReclaimInterval, Reclaimer, ReclaimerStats};
use crate::storage::{MemoryWindowStore, WindowStore};

/// Configuration for one limiter. Validated by [`Limiter::new`].
#[derive(Debug, Clone)]
pub struct LimiterConfig {
    name: String,
    max_requests: u64,
    window: Duration,
    key: KeyStrategy,
    reclaim: ReclaimInterval,
    clock: Option<Arc<dyn Clock>>,
}

impl LimiterConfig {
    /// Create a configuration keyed by client IP with the default reclaim interval.
    pub fn new(name: impl Into<String>, max_requests: u64, window: Duration) -> Self {
        Self {
            name: name.into(),
            max_requests,
            window,
            key: KeyStrategy::default(),
            reclaim: ReclaimInterval::default(),
            clock: None,
        }
    }

    /// Create a configuration from a validated quota.
    pub fn from_quota(name: impl Into<String>, quota: Quota) -> Self {
        Self::new(name, quota.max_requests(), quota.window())
    }

    /// Set the key derivation strategy.
    pub fn with_key(mut self, key: KeyStrategy) -> Self {
        self.key = key;
        self
    }

    /// Set the reclamation schedule.
    pub fn with_reclaim(mut self, reclaim: ReclaimInterval) -> Self {
        self.reclaim = reclaim;
        self
    }

    /// Use a custom clock instead of [`SystemClock`].
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Get the limiter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the key strategy.
    pub fn key(&self) -> &KeyStrategy {
        &self.key
    }

    /// Get the reclamation schedule.
    pub fn reclaim(&self) -> ReclaimInterval {
        self.reclaim
    }
}

/// A named fixed-window limiter.
pub struct Limiter<S: WindowStore = MemoryWindowStore> {
    name: String,
    quota: Quota,
    key: KeyStrategy,
    clock: Arc<dyn Clock>,
    /// `None` once destroyed.
    store: RwLock<Option<Arc<S>>>,
    reclaimer: Reclaimer,
}

impl<S: WindowStore> std::fmt::Debug for Limiter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Limiter")
            .field("name", &self.name)
            .field("quota", &self.quota)
            .field("key", &self.key.name())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

impl Limiter {
    /// Build an in-memory limiter and start its reclaimer.
    ///
    /// Fails if the quota is invalid, or if periodic reclamation is
    /// requested outside a tokio runtime.
    pub fn new(config: LimiterConfig) -> Result<Self> {
        Self::with_store(config, MemoryWindowStore::new())
    }
}

impl<S: WindowStore> Limiter<S> {
    /// Build a limiter over a caller supplied store.
    pub fn with_store(config: LimiterConfig, store: S) -> Result<Self> {
        let quota = Quota::try_new(config.max_requests, config.window)?;
        let clock = config
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()));
        let store = Arc::new(store);
        let reclaimer = Reclaimer::start(&config.name, config.reclaim, store.clone(), clock.clone())?;

        debug!(
            limiter = %config.name,
            max_requests = quota.max_requests(),
            window_ms = quota.window_ms(),
            key = config.key.name(),
            "limiter created"
        );

        Ok(Self {
            name: config.name,
            quota,
            key: config.key,
            clock,
            store: RwLock::new(Some(store)),
            reclaimer,
        })
    }

    /// Get the limiter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the quota.
    pub fn quota(&self) -> Quota {
        self.quota
    }

    /// Get the key strategy.
    pub fn key_strategy(&self) -> &KeyStrategy {
        &self.key
    }

    /// Derive the key this limiter would use for a request.
    pub fn derive_key<R: RequestIdentity>(&self, identity: &R) -> String {
        self.key.derive(identity)
    }

    /// Admit or deny a request, counting it.
    pub fn check<R: RequestIdentity>(&self, identity: &R) -> Result<CheckResult> {
        self.check_key(&self.derive_key(identity))
    }

    /// Admit or deny a request for an already derived key.
    ///
    /// This is the only path that increments a counter.
    pub fn check_key(&self, key: &str) -> Result<CheckResult> {
        self.with_store_ref(|store| {
            let now = self.clock.now_ms();
            let entry = store.increment(key, now, self.quota.window_ms());
            let limit = self.quota.max_requests();

            if entry.count <= limit {
                CheckResult::allowed(limit, limit - entry.count, entry.reset_at)
            } else {
                let result = CheckResult::denied(limit, entry.reset_at, now);
                debug!(
                    limiter = %self.name,
                    key,
                    retry_after_secs = ?result.retry_after_secs,
                    "request denied"
                );
                result
            }
        })
    }

    /// Forget a request's counter immediately.
    pub fn reset<R: RequestIdentity>(&self, identity: &R) -> Result<()> {
        self.reset_key(&self.derive_key(identity))
    }

    /// Forget a key's counter immediately.
    pub fn reset_key(&self, key: &str) -> Result<()> {
        self.with_store_ref(|store| store.clear(key))
    }

    /// Current state for a request, without counting it.
    ///
    /// Returns `None` if the key has no live window. `allowed` reports
    /// whether the next `check` would be admitted.
    pub fn status<R: RequestIdentity>(&self, identity: &R) -> Result<Option<CheckResult>> {
        self.status_key(&self.derive_key(identity))
    }

    /// Current state for a key, without counting it.
    pub fn status_key(&self, key: &str) -> Result<Option<CheckResult>> {
        self.with_store_ref(|store| {
            let now = self.clock.now_ms();
            let limit = self.quota.max_requests();
            store.peek(key, now).map(|entry| {
                if entry.count < limit {
                    CheckResult::allowed(limit, limit - entry.count, entry.reset_at)
                } else {
                    CheckResult::denied(limit, entry.reset_at, now)
                }
            })
        })
    }

    /// Evict expired entries now. Returns how many were removed.
    pub fn sweep_expired(&self) -> Result<usize> {
        self.with_store_ref(|store| {
            self.reclaimer
                .sweep_now(&**store, self.clock.now_ms())
                .unwrap_or(0)
        })
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> Result<usize> {
        self.with_store_ref(|store| store.len())
    }

    /// Check if the limiter holds no entries.
    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|len| len == 0)
    }

    /// Reclaimer activity counters.
    pub fn reclaimer_stats(&self) -> ReclaimerStats {
        self.reclaimer.stats()
    }

    /// Check if the background reclaimer is scheduled.
    pub fn is_reclaiming(&self) -> bool {
        self.reclaimer.is_running()
    }

    /// Check if [`Limiter::destroy`] has run.
    pub fn is_destroyed(&self) -> bool {
        self.store.read().is_none()
    }

    /// Stop the reclaimer and drop the store. Idempotent.
    ///
    /// Waits for in-flight checks and any running sweep. When this returns
    /// the reclaimer will not fire again.
    pub fn destroy(&self) {
        let store = self.store.write().take();
        self.reclaimer.stop();

        if store.is_some() {
            debug!(limiter = %self.name, "limiter destroyed");
        }
    }

    fn with_store_ref<T>(&self, f: impl FnOnce(&Arc<S>) -> T) -> Result<T> {
        let guard = self.store.read();
        match guard.as_ref() {
            Some(store) => Ok(f(store)),
            None => {
                error!(limiter = %self.name, "limiter used after destroy");
                Err(RateLimitError::Destroyed {
                    limiter: self.name.clone(),
                })
            }
        }
    }
}

impl<S: WindowStore> Drop for Limiter<S> {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::key::Identity;

    fn limiter(max: u64, window_ms: u64, clock: &ManualClock) -> Limiter {
        Limiter::new(
            LimiterConfig::new("test", max, Duration::from_millis(window_ms))
                .with_reclaim(ReclaimInterval::Manual)
                .with_clock(Arc::new(clock.clone())),
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_config_fails_at_construction() {
        let err = Limiter::new(LimiterConfig::new("bad", 0, Duration::from_secs(1))).unwrap_err();
        assert!(err.is_config());

        let err = Limiter::new(LimiterConfig::new("bad", 1, Duration::ZERO)).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_remaining_counts_down_then_denies() {
        let clock = ManualClock::new(0);
        let limiter = limiter(3, 1000, &clock);

        let remaining: Vec<u64> = (0..3)
            .map(|_| limiter.check_key("ip:1.1.1.1").unwrap())
            .inspect(|r| assert!(r.is_allowed()))
            .map(|r| r.remaining)
            .collect();
        assert_eq!(remaining, vec![2, 1, 0]);

        let denied = limiter.check_key("ip:1.1.1.1").unwrap();
        assert!(denied.is_denied());
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.retry_after_secs, Some(1));

        clock.set(1001);
        let result = limiter.check_key("ip:1.1.1.1").unwrap();
        assert!(result.is_allowed());
        assert_eq!(result.remaining, 2);
        assert_eq!(result.reset_at, 2001);
    }

    #[test]
    fn test_status_does_not_count() {
        let clock = ManualClock::new(0);
        let limiter = limiter(2, 1000, &clock);

        assert_eq!(limiter.status_key("k").unwrap(), None);
        limiter.check_key("k").unwrap();

        for _ in 0..5 {
            let status = limiter.status_key("k").unwrap().unwrap();
            assert!(status.is_allowed());
            assert_eq!(status.remaining, 1);
        }

        assert_eq!(limiter.check_key("k").unwrap().remaining, 0);
        let status = limiter.status_key("k").unwrap().unwrap();
        assert!(status.is_denied());
        assert_eq!(status.retry_after_secs, Some(1));
    }

    #[test]
    fn test_status_absent_after_expiry() {
        let clock = ManualClock::new(0);
        let limiter = limiter(2, 1000, &clock);
        limiter.check_key("k").unwrap();

        clock.set(1000);
        assert_eq!(limiter.status_key("k").unwrap(), None);
        assert_eq!(limiter.len().unwrap(), 1);
    }

    #[test]
    fn test_reset_clears_key() {
        let clock = ManualClock::new(0);
        let limiter = limiter(1, 60_000, &clock);
        let identity = Identity::new().with_header("x-real-ip", "8.8.8.8");

        assert!(limiter.check(&identity).unwrap().is_allowed());
        assert!(limiter.check(&identity).unwrap().is_denied());

        limiter.reset(&identity).unwrap();
        assert_eq!(limiter.status(&identity).unwrap(), None);
        assert!(limiter.check(&identity).unwrap().is_allowed());
    }

    #[test]
    fn test_sweep_expired() {
        let clock = ManualClock::new(0);
        let limiter = limiter(5, 1000, &clock);
        limiter.check_key("old").unwrap();
        clock.set(600);
        limiter.check_key("new").unwrap();

        clock.set(1000);
        assert_eq!(limiter.sweep_expired().unwrap(), 1);
        assert_eq!(limiter.status_key("old").unwrap(), None);
        assert!(limiter.status_key("new").unwrap().is_some());
        assert_eq!(limiter.reclaimer_stats().evicted, 1);
    }

    #[test]
    fn test_use_after_destroy_fails() {
        let clock = ManualClock::new(0);
        let limiter = limiter(5, 1000, &clock);

        limiter.destroy();
        limiter.destroy();
        assert!(limiter.is_destroyed());

        assert!(matches!(
            limiter.check_key("k"),
            Err(RateLimitError::Destroyed { .. })
        ));
        assert!(limiter.reset_key("k").is_err());
        assert!(limiter.status_key("k").is_err());
        assert!(limiter.sweep_expired().is_err());
    }

    #[test]
    fn test_periodic_limiter_needs_runtime() {
        let err = Limiter::new(LimiterConfig::new("bg", 1, Duration::from_secs(1))).unwrap_err();
        assert!(err.is_config());
    }
}

//! Background reclamation of expired window entries.
//!
//! Expired entries are already invisible to `check` and `status`; the
//! reclaimer only bounds memory. A sweep that panics is logged and the next
//! tick still runs.
//!
//! Stopping is synchronous. Each sweep runs while holding the gate lock and
//! re-checks the stopped flag first, and [`Reclaimer::stop`] flips the flag
//! under the same lock. Once `stop` returns, no sweep is running and none
//! will start.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{trace, warn};

use crate::clock::Clock;
use crate::error::ConfigError;
use crate::storage::WindowStore;

/// Default time between sweeps.
pub const DEFAULT_RECLAIM_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Reclamation schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReclaimInterval {
    /// Sweep at fixed time intervals on the tokio runtime.
    Every(Duration),
    /// No background task; call `Limiter::sweep_expired` yourself.
    Manual,
}

impl Default for ReclaimInterval {
    fn default() -> Self {
        Self::Every(DEFAULT_RECLAIM_INTERVAL)
    }
}

/// Counters describing reclaimer activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReclaimerStats {
    /// Sweeps that completed.
    pub sweeps: u64,
    /// Entries removed across all sweeps.
    pub evicted: u64,
    /// Sweeps that panicked.
    pub failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    sweeps: AtomicU64,
    evicted: AtomicU64,
    failures: AtomicU64,
}

/// State shared between the owner and the background task.
#[derive(Debug)]
struct Shared {
    limiter: String,
    /// `true` once stopped.
    gate: Mutex<bool>,
    shutdown: Notify,
    counters: Counters,
}

impl Shared {
    /// Run one sweep unless stopped. Returns `None` when stopped.
    fn sweep<S: WindowStore + ?Sized>(&self, store: &S, now: u64) -> Option<usize> {
        let stopped = self.gate.lock();
        if *stopped {
            return None;
        }

        match catch_unwind(AssertUnwindSafe(|| store.sweep_expired(now))) {
            Ok(evicted) => {
                self.counters.sweeps.fetch_add(1, Ordering::Relaxed);
                self.counters
                    .evicted
                    .fetch_add(evicted as u64, Ordering::Relaxed);
                trace!(limiter = %self.limiter, evicted, "swept expired windows");
                Some(evicted)
            }
            Err(payload) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    limiter = %self.limiter,
                    panic = panic_message(payload.as_ref()),
                    "window sweep panicked"
                );
                Some(0)
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}

/// Periodic sweeper owned by one limiter.
#[derive(Debug)]
pub struct Reclaimer {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Reclaimer {
    /// Start reclaiming `store` on the current tokio runtime.
    ///
    /// `ReclaimInterval::Manual` starts nothing and needs no runtime.
    pub(crate) fn start<S: WindowStore>(
        limiter: &str,
        interval: ReclaimInterval,
        store: Arc<S>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let shared = Arc::new(Shared {
            limiter: limiter.to_string(),
            gate: Mutex::new(false),
            shutdown: Notify::new(),
            counters: Counters::default(),
        });

        let handle = match interval {
            ReclaimInterval::Manual => None,
            ReclaimInterval::Every(period) => {
                if period.is_zero() {
                    return Err(ConfigError::InvalidReclaimInterval(
                        "interval must be non-zero".into(),
                    ));
                }
                let runtime = tokio::runtime::Handle::try_current()
                    .map_err(|_| ConfigError::MissingRuntime)?;
                Some(runtime.spawn(run(shared.clone(), store, clock, period)))
            }
        };

        Ok(Self {
            shared,
            handle: Mutex::new(handle),
        })
    }

    /// Sweep now, on the caller's thread. Returns `None` once stopped.
    pub(crate) fn sweep_now<S: WindowStore + ?Sized>(&self, store: &S, now: u64) -> Option<usize> {
        self.shared.sweep(store, now)
    }

    /// Stop the background task. Idempotent.
    ///
    /// Blocks while an in-flight sweep finishes.
    pub(crate) fn stop(&self) {
        {
            let mut stopped = self.shared.gate.lock();
            if *stopped {
                return;
            }
            *stopped = true;
        }

        self.shared.shutdown.notify_one();
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
    }

    /// Check if a background task is still scheduled.
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Snapshot of the activity counters.
    pub fn stats(&self) -> ReclaimerStats {
        let counters = &self.shared.counters;
        ReclaimerStats {
            sweeps: counters.sweeps.load(Ordering::Relaxed),
            evicted: counters.evicted.load(Ordering::Relaxed),
            failures: counters.failures.load(Ordering::Relaxed),
        }
    }
}

async fn run<S: WindowStore>(
    shared: Arc<Shared>,
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if shared.sweep(&*store, clock.now_ms()).is_none() {
                    break;
                }
            }
            _ = shared.shutdown.notified() => {
                break;
            }
        }
    }
}

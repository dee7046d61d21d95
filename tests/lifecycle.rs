//! Reclamation and shutdown through the public API.

use admission_ratelimit::config::profiles;
use admission_ratelimit::prelude::*;
use admission_ratelimit::{ManualClock, RegistryConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

fn periodic(max: u64, window_ms: u64, clock: &ManualClock) -> Limiter {
    Limiter::new(
        LimiterConfig::new("periodic", max, Duration::from_millis(window_ms))
            .with_reclaim(ReclaimInterval::Every(Duration::from_secs(1)))
            .with_clock(Arc::new(clock.clone())),
    )
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_background_sweep_evicts_only_expired() {
    let clock = ManualClock::new(0);
    let limiter = periodic(5, 1000, &clock);
    assert!(limiter.is_reclaiming());

    limiter.check_key("old").unwrap();
    clock.set(900);
    limiter.check_key("live").unwrap();

    clock.set(1_500);
    sleep(Duration::from_millis(1_100)).await;

    assert_eq!(limiter.len().unwrap(), 1);
    assert!(limiter.status_key("live").unwrap().is_some());
    assert!(limiter.status_key("old").unwrap().is_none());

    let stats = limiter.reclaimer_stats();
    assert!(stats.sweeps >= 1);
    assert_eq!(stats.evicted, 1);
}

#[tokio::test(start_paused = true)]
async fn test_destroy_stops_background_sweeps() {
    let clock = ManualClock::new(0);
    let limiter = periodic(5, 1000, &clock);

    sleep(Duration::from_millis(2_500)).await;
    let before = limiter.reclaimer_stats().sweeps;
    assert_eq!(before, 2);

    limiter.destroy();
    limiter.destroy();
    assert!(!limiter.is_reclaiming());

    sleep(Duration::from_secs(10)).await;
    assert_eq!(limiter.reclaimer_stats().sweeps, before);
}

#[tokio::test(start_paused = true)]
async fn test_registry_startup_and_shutdown() {
    let clock = ManualClock::new(0);
    let registry = LimiterRegistry::builder()
        .profiles(&RegistryConfig::standard())
        .clock(Arc::new(clock.clone()))
        .build()
        .unwrap();

    let identity = Identity::new().with_header("cf-connecting-ip", "9.9.9.9");
    let auth = registry.get(profiles::AUTH).unwrap();
    for _ in 0..5 {
        assert!(auth.check(&identity).unwrap().is_allowed());
    }
    assert!(auth.check(&identity).unwrap().is_denied());
    assert!(auth.is_reclaiming());

    registry.destroy_all();
    for name in registry.names() {
        let limiter = registry.get(name).unwrap();
        assert!(limiter.is_destroyed());
        assert!(!limiter.is_reclaiming());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_destroy_during_running_sweeps() {
    for _ in 0..20 {
        let clock = ManualClock::new(0);
        let limiter = Limiter::new(
            LimiterConfig::new("racing", 1, Duration::from_secs(60))
                .with_reclaim(ReclaimInterval::Every(Duration::from_millis(1)))
                .with_clock(Arc::new(clock.clone())),
        )
        .unwrap();

        // Live entries survive, so every sweep walks the whole table.
        for i in 0..20_000 {
            limiter.check_key(&format!("ip:{}", i)).unwrap();
        }
        while limiter.reclaimer_stats().sweeps == 0 {
            sleep(Duration::from_millis(1)).await;
        }

        limiter.destroy();
        let frozen = limiter.reclaimer_stats();
        assert!(!limiter.is_reclaiming());

        sleep(Duration::from_millis(20)).await;
        assert_eq!(limiter.reclaimer_stats(), frozen);
    }
}

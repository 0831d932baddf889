//! Background idle eviction, driven by the paused tokio clock.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::time::Duration;

use connpool::{MIN_IDLE_CHECK_INTERVAL, Pool, PoolConfig};
use connpool_testing::{MockConfig, MockConnector, init_tracing};

async fn saturated(min: usize, max: usize) -> (Pool<MockConnector>, MockConnector) {
    init_tracing();
    let mock = MockConnector::new();
    let config = PoolConfig::new()
        .min_active(min)
        .max_active(max)
        .max_idle_time(Duration::from_secs(1))
        .idle_check_interval(Duration::from_secs(1));
    assert_eq!(config.effective_idle_check_interval(), MIN_IDLE_CHECK_INTERVAL);

    let pool = Pool::new(config, mock.clone(), MockConfig::default()).unwrap();
    pool.init().await.unwrap();

    let mut held = Vec::new();
    for _ in 0..max {
        held.push(pool.borrow().await.unwrap());
    }
    for handle in held {
        assert!(pool.return_connection(handle).await.unwrap());
    }
    assert_eq!(pool.idle_count(), max);
    (pool, mock)
}

#[tokio::test(start_paused = true)]
async fn test_stale_connection_evicted_on_clamped_interval() {
    let (pool, mock) = saturated(2, 3).await;

    // The configured 1s interval is clamped, so nothing happens before 10s.
    tokio::time::sleep(Duration::from_secs(9)).await;
    assert_eq!(pool.connection_count(), 3);
    assert_eq!(mock.disconnects(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(pool.connection_count(), 2);
    assert_eq!(pool.idle_count(), 2);
    assert_eq!(mock.disconnects(), 1);
    assert_eq!(pool.metrics().idle_evictions, 1);
}

#[tokio::test(start_paused = true)]
async fn test_recently_returned_connection_survives() {
    let (pool, mock) = saturated(0, 2).await;

    tokio::time::sleep(Duration::from_millis(9500)).await;
    let handle = pool.borrow().await.unwrap();
    let kept = handle.id();
    assert!(pool.return_connection(handle).await.unwrap());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(pool.connection_count(), 1);
    assert_eq!(mock.disconnects(), 1);

    let handle = pool.borrow().await.unwrap();
    assert_eq!(handle.id(), kept);
}

#[tokio::test(start_paused = true)]
async fn test_eviction_stops_at_min_active() {
    let (pool, mock) = saturated(2, 2).await;

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(pool.connection_count(), 2);
    assert_eq!(pool.idle_count(), 2);
    assert_eq!(mock.disconnects(), 0);
    assert_eq!(pool.metrics().idle_evictions, 0);
}

#[tokio::test(start_paused = true)]
async fn test_balancer_stops_after_close() {
    let (pool, mock) = saturated(0, 3).await;
    assert!(pool.close().await);
    assert_eq!(mock.disconnects(), 3);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(mock.disconnects(), 3);
    assert_eq!(pool.metrics().idle_evictions, 0);
}

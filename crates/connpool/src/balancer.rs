//! Idle connection balancer.
//!
//! The idle queue cannot be inspected in place, so each pass pops handles,
//! evicts the stale ones and requeues the rest. A handle that cannot be
//! requeued is destroyed rather than lost. Evictions never take the live
//! count below `min_active`.

use std::sync::Weak;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::connector::Connector;
use crate::pool::PoolInner;

/// Outcome of one balancing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct BalanceReport {
    /// Handles destroyed for being idle too long.
    pub(crate) evicted: usize,
    /// Handles put back into the idle queue.
    pub(crate) requeued: usize,
    /// Handles destroyed because the queue refused them on requeue.
    pub(crate) dropped: usize,
}

/// Run the balancer every `interval` until `shutdown` fires or the pool is
/// gone.
pub(crate) fn spawn<C: Connector>(
    pool: Weak<PoolInner<C>>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let Some(inner) = pool.upgrade() else {
                break;
            };
            if inner.is_closed() {
                break;
            }

            let report = balance(&inner);
            if report.evicted > 0 || report.dropped > 0 {
                tracing::debug!(
                    evicted = report.evicted,
                    requeued = report.requeued,
                    dropped = report.dropped,
                    connections = inner.connection_count(),
                    "idle connections balanced"
                );
            }
        }

        tracing::trace!("idle balancer stopped");
    });
}

/// One balancing pass over the idle queue.
pub(crate) fn balance<C: Connector>(pool: &PoolInner<C>) -> BalanceReport {
    let floor = pool.config.min_active;
    let max_idle = pool.config.max_idle_time;
    let mut report = BalanceReport::default();
    let mut fresh = Vec::new();

    while pool.connection_count() > floor {
        let Some(handle) = pool.idle.try_pop() else {
            break;
        };

        if handle.idle_for() > max_idle && pool.release_slot_above(floor) {
            tracing::trace!(
                connection_id = handle.id(),
                idle_for = ?handle.idle_for(),
                "evicting idle connection"
            );
            pool.metrics.record_eviction();
            pool.dispose(handle);
            report.evicted += 1;
        } else {
            fresh.push(handle);
        }
    }

    for handle in fresh {
        match pool.idle.push(handle) {
            Ok(()) => report.requeued += 1,
            Err(handle) => {
                pool.destroy(handle);
                report.dropped += 1;
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConnectorError, Pool, PoolConfig};
    use async_trait::async_trait;

    struct Loopback;

    #[async_trait]
    impl Connector for Loopback {
        type Connection = u32;
        type Config = ();

        async fn connect(&self, _config: &()) -> Result<u32, ConnectorError> {
            Ok(0)
        }

        async fn disconnect(&self, _conn: u32) -> Result<(), ConnectorError> {
            Ok(())
        }

        async fn is_connected(&self, _conn: &u32) -> bool {
            true
        }
    }

    async fn saturated_pool(min: usize, max: usize) -> Pool<Loopback> {
        let config = PoolConfig::new()
            .min_active(min)
            .max_active(max)
            .max_idle_time(Duration::from_secs(1))
            .idle_check_interval(Duration::from_secs(3600));
        let pool = Pool::new(config, Loopback, ()).unwrap();
        assert!(pool.init().await.unwrap());

        let mut handles = Vec::new();
        for _ in 0..max {
            handles.push(pool.borrow().await.unwrap());
        }
        for handle in handles {
            assert!(pool.return_connection(handle).await.unwrap());
        }
        assert_eq!(pool.idle_count(), max);
        pool
    }

    #[tokio::test(start_paused = true)]
    async fn test_balance_evicts_stale_down_to_floor() {
        let pool = saturated_pool(2, 5).await;
        tokio::time::advance(Duration::from_secs(2)).await;

        let report = balance(pool.inner());
        assert_eq!(report.evicted, 3);
        assert_eq!(report.requeued, 2);
        assert_eq!(report.dropped, 0);
        assert_eq!(pool.connection_count(), 2);
        assert_eq!(pool.idle_count(), 2);
        assert_eq!(pool.metrics().idle_evictions, 3);

        // At the floor nothing is touched, however stale.
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(balance(pool.inner()), BalanceReport::default());
        assert_eq!(pool.connection_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_balance_requeues_fresh_connections() {
        let pool = saturated_pool(0, 3).await;
        tokio::time::advance(Duration::from_millis(500)).await;

        let report = balance(pool.inner());
        assert_eq!(report.evicted, 0);
        assert_eq!(report.requeued, 3);
        assert_eq!(pool.connection_count(), 3);
        assert_eq!(pool.idle_count(), 3);
    }
}

//! Pool counters and their public snapshot.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Internal metrics tracking.
#[derive(Debug, Default)]
struct Counters {
    connections_created: u64,
    connections_closed: u64,
    checkouts_successful: u64,
    checkouts_failed: u64,
    borrow_timeouts: u64,
    health_checks_performed: u64,
    health_checks_failed: u64,
    resets_performed: u64,
    resets_failed: u64,
    idle_evictions: u64,
    return_discards: u64,
    disconnect_failures: u64,
}

/// Shared recorder updated by the pool, the balancer and the disconnect
/// dispatcher.
#[derive(Debug)]
pub(crate) struct Metrics {
    created_at: Instant,
    counters: Mutex<Counters>,
}

impl Metrics {
    pub(crate) fn new() -> Self {
        Self {
            created_at: Instant::now(),
            counters: Mutex::new(Counters::default()),
        }
    }

    pub(crate) fn record_created(&self) {
        self.counters.lock().connections_created += 1;
    }

    pub(crate) fn record_closed(&self) {
        self.counters.lock().connections_closed += 1;
    }

    pub(crate) fn record_checkout(&self, success: bool) {
        let mut counters = self.counters.lock();
        if success {
            counters.checkouts_successful += 1;
        } else {
            counters.checkouts_failed += 1;
        }
    }

    pub(crate) fn record_timeout(&self) {
        let mut counters = self.counters.lock();
        counters.borrow_timeouts += 1;
        counters.checkouts_failed += 1;
    }

    pub(crate) fn record_health_check(&self, healthy: bool) {
        let mut counters = self.counters.lock();
        counters.health_checks_performed += 1;
        if !healthy {
            counters.health_checks_failed += 1;
        }
    }

    pub(crate) fn record_reset(&self, success: bool) {
        let mut counters = self.counters.lock();
        counters.resets_performed += 1;
        if !success {
            counters.resets_failed += 1;
        }
    }

    pub(crate) fn record_eviction(&self) {
        self.counters.lock().idle_evictions += 1;
    }

    pub(crate) fn record_return_discard(&self) {
        self.counters.lock().return_discards += 1;
    }

    pub(crate) fn record_disconnect_failure(&self) {
        self.counters.lock().disconnect_failures += 1;
    }

    pub(crate) fn snapshot(&self) -> PoolMetrics {
        let counters = self.counters.lock();
        PoolMetrics {
            connections_created: counters.connections_created,
            connections_closed: counters.connections_closed,
            checkouts_successful: counters.checkouts_successful,
            checkouts_failed: counters.checkouts_failed,
            borrow_timeouts: counters.borrow_timeouts,
            health_checks_performed: counters.health_checks_performed,
            health_checks_failed: counters.health_checks_failed,
            resets_performed: counters.resets_performed,
            resets_failed: counters.resets_failed,
            idle_evictions: counters.idle_evictions,
            return_discards: counters.return_discards,
            disconnect_failures: counters.disconnect_failures,
            uptime: self.created_at.elapsed(),
        }
    }
}

/// Metrics collected from the pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolMetrics {
    /// Total connections created since pool start.
    pub connections_created: u64,
    /// Total connections destroyed since pool start.
    pub connections_closed: u64,
    /// Successful borrows.
    pub checkouts_successful: u64,
    /// Failed borrows (timeouts, connect failures, closed pool).
    pub checkouts_failed: u64,
    /// Borrows that gave up after the maximum wait time.
    pub borrow_timeouts: u64,
    /// Liveness probes performed.
    pub health_checks_performed: u64,
    /// Liveness probes that found a dead connection.
    pub health_checks_failed: u64,
    /// Connection resets performed.
    pub resets_performed: u64,
    /// Connection resets that failed.
    pub resets_failed: u64,
    /// Idle connections evicted by the balancer.
    pub idle_evictions: u64,
    /// Returned connections destroyed instead of queued.
    pub return_discards: u64,
    /// Best-effort disconnects that reported an error.
    pub disconnect_failures: u64,
    /// Time since pool creation.
    pub uptime: Duration,
}

impl PoolMetrics {
    /// Calculate checkout success rate (0.0 to 1.0).
    #[must_use]
    pub fn checkout_success_rate(&self) -> f64 {
        let total = self.checkouts_successful + self.checkouts_failed;
        if total == 0 {
            return 1.0;
        }
        self.checkouts_successful as f64 / total as f64
    }

    /// Calculate health check success rate (0.0 to 1.0).
    #[must_use]
    pub fn health_check_success_rate(&self) -> f64 {
        if self.health_checks_performed == 0 {
            return 1.0;
        }
        let successful = self.health_checks_performed - self.health_checks_failed;
        successful as f64 / self.health_checks_performed as f64
    }
}

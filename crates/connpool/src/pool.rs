//! Connection pool implementation.
//!
//! The pool owns a bounded queue of idle connections and a live-connection
//! counter. Borrowers take idle connections or open new ones up to
//! `max_active`, and wait up to `max_wait_time` once the pool is saturated.
//! A background balancer trims connections that sat idle past
//! `max_idle_time` while keeping at least `min_active` alive.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use futures_util::stream::{self, StreamExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::balancer;
use crate::config::PoolConfig;
use crate::connector::Connector;
use crate::error::{PoolError, ReturnError};
use crate::handle::Handle;
use crate::idle::{IdleQueue, PopError};
use crate::metrics::{Metrics, PoolMetrics};
use crate::reaper::{self, Reaper};

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// A connection pool over any [`Connector`].
///
/// The pool moves through `uninitialized -> initialized -> closed` and never
/// goes back. Cloning is cheap; clones share the same pool.
///
/// # Example
///
/// ```rust,ignore
/// use connpool::{Pool, PoolConfig};
/// use std::time::Duration;
///
/// let pool_config = PoolConfig::new()
///     .min_active(10)
///     .max_active(30)
///     .max_wait_time(Duration::from_secs(5));
///
/// let pool = Pool::new(pool_config, MySqlConnector, mysql_config)?;
/// pool.init().await?;
///
/// let mut conn = pool.borrow().await?;
/// conn.get_mut().query("SHOW STATUS LIKE 'Threads_connected'").await?;
/// pool.return_connection(conn).await?;
///
/// pool.close().await;
/// ```
pub struct Pool<C: Connector> {
    inner: Arc<PoolInner<C>>,
}

impl<C: Connector> Clone for Pool<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: Connector> fmt::Debug for Pool<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("id", &self.inner.id)
            .field("status", &self.inner.status())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

pub(crate) struct PoolInner<C: Connector> {
    /// Identifies handles created by this pool.
    id: u64,

    /// Pool configuration.
    pub(crate) config: PoolConfig,

    /// Backend adapter.
    connector: Arc<C>,

    /// Passed verbatim to `connect` and `reset`.
    connector_config: C::Config,

    /// Connections not currently borrowed.
    pub(crate) idle: IdleQueue<C::Connection>,

    /// Live connections, idle plus borrowed.
    connection_count: AtomicUsize,

    initialized: AtomicBool,
    closed: AtomicBool,

    /// Counter for generating connection IDs.
    next_connection_id: AtomicU64,

    pub(crate) metrics: Arc<Metrics>,

    /// Background disconnects.
    reaper: Reaper<C>,

    /// Stops the balancer.
    shutdown: CancellationToken,
}

impl<C: Connector> Pool<C> {
    /// Create an uninitialized pool.
    ///
    /// No connection is opened and no background task is started until
    /// [`init`](Pool::init) is called.
    pub fn new(
        config: PoolConfig,
        connector: C,
        connector_config: C::Config,
    ) -> Result<Self, PoolError> {
        config.validate()?;

        let connector = Arc::new(connector);
        let metrics = Arc::new(Metrics::new());
        let inner = Arc::new(PoolInner {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            idle: IdleQueue::new(config.max_active),
            config,
            reaper: Reaper::new(connector.clone(), metrics.clone()),
            connector,
            connector_config,
            connection_count: AtomicUsize::new(0),
            initialized: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            next_connection_id: AtomicU64::new(1),
            metrics,
            shutdown: CancellationToken::new(),
        });

        tracing::info!(
            pool_id = inner.id,
            min = inner.config.min_active,
            max = inner.config.max_active,
            "connection pool created"
        );

        Ok(Self { inner })
    }

    /// Initialize the pool.
    ///
    /// Starts the balancer and the disconnect dispatcher, then opens
    /// `min_active` connections. Returns `Ok(false)` without doing anything
    /// if the pool was already initialized or has been closed.
    ///
    /// A connect failure is propagated; connections opened before it stay in
    /// the pool. If the pool is closed while connections are being opened,
    /// the rest are skipped, any connection the closed pool refuses is
    /// disconnected and `Ok(false)` is returned.
    pub async fn init(&self) -> Result<bool, PoolError> {
        let inner = &self.inner;
        if inner.closed.load(Ordering::Acquire) || inner.initialized.swap(true, Ordering::AcqRel)
        {
            return Ok(false);
        }

        inner.reaper.start(
            inner.config.disconnect_concurrency,
            inner.config.disconnect_queue_capacity,
        );
        balancer::spawn(
            Arc::downgrade(inner),
            inner.config.effective_idle_check_interval(),
            inner.shutdown.clone(),
        );

        for _ in 0..inner.config.min_active {
            if inner.is_closed() {
                break;
            }
            let Some(slot) = inner.reserve() else {
                break;
            };
            let handle = inner.connect(slot).await?;
            if let Err(handle) = inner.idle.push(handle) {
                inner.discard_now(handle).await;
            }
        }

        if inner.is_closed() {
            tracing::debug!(pool_id = inner.id, "pool closed during init");
            return Ok(false);
        }

        tracing::info!(
            pool_id = inner.id,
            connections = inner.connection_count(),
            "connection pool initialized"
        );

        Ok(true)
    }

    /// Borrow a connection from the pool.
    ///
    /// Opens a new connection right away when no idle connection is queued
    /// and the pool is below `max_active`. Otherwise waits up to
    /// `max_wait_time` for one to be returned. Reused connections are probed
    /// with [`Connector::is_connected`] and normalized with
    /// [`Connector::reset`]; dead ones are destroyed and replaced.
    pub async fn borrow(&self) -> Result<Handle<C::Connection>, PoolError> {
        let inner = &self.inner;
        let result = inner.borrow().await;
        match &result {
            Ok(handle) => {
                inner.metrics.record_checkout(true);
                tracing::trace!(
                    pool_id = inner.id,
                    connection_id = handle.id(),
                    "connection borrowed"
                );
            }
            Err(PoolError::BorrowTimeout { timeout }) => {
                inner.metrics.record_timeout();
                tracing::debug!(
                    pool_id = inner.id,
                    timeout = ?timeout,
                    connections = inner.connection_count(),
                    "timed out waiting for a connection"
                );
            }
            Err(_) => inner.metrics.record_checkout(false),
        }
        result
    }

    /// Return a borrowed connection to the pool.
    ///
    /// Returns `Ok(true)` if the connection was queued for reuse and
    /// `Ok(false)` if it was destroyed instead because the idle queue was
    /// full or the connection was dead. A connection from another pool, or
    /// one the connector does not recognize, is handed back inside
    /// [`ReturnError`] untouched, as is any connection returned after
    /// [`close`](Pool::close).
    pub async fn return_connection(
        &self,
        handle: Handle<C::Connection>,
    ) -> Result<bool, ReturnError<C::Connection>> {
        let inner = &self.inner;
        if handle.metadata().pool_id != inner.id || !inner.connector.validate(handle.get_ref()) {
            return Err(ReturnError::new(PoolError::InvalidConnection, handle));
        }
        if inner.closed.load(Ordering::Acquire) {
            return Err(ReturnError::new(PoolError::PoolClosed, handle));
        }

        let id = handle.id();
        let guard = InFlight::new(inner, handle);

        // A borrowed handle keeps the idle queue below `max_active`, so this
        // only fires if the live count and the queue disagree.
        if inner.idle.is_full() {
            inner.metrics.record_return_discard();
            tracing::debug!(
                pool_id = inner.id,
                connection_id = id,
                "idle queue full, discarding returned connection"
            );
            return Ok(false);
        }

        let alive = inner.connector.is_connected(guard.get()).await;
        inner.metrics.record_health_check(alive);
        if !alive {
            inner.metrics.record_return_discard();
            tracing::debug!(
                pool_id = inner.id,
                connection_id = id,
                "discarding dead connection on return"
            );
            return Ok(false);
        }

        let mut handle = guard.into_inner();
        handle.touch();
        match inner.idle.push(handle) {
            Ok(()) => {
                tracing::trace!(pool_id = inner.id, connection_id = id, "connection returned");
                Ok(true)
            }
            Err(handle) => {
                // Closed while the liveness probe was running.
                inner.metrics.record_return_discard();
                inner.discard_now(handle).await;
                Ok(false)
            }
        }
    }

    /// Borrow a connection wrapped in a guard that returns it on drop.
    pub async fn get(&self) -> Result<PooledConnection<C>, PoolError> {
        let handle = self.borrow().await?;
        Ok(PooledConnection {
            handle: Some(handle),
            pool: self.clone(),
        })
    }

    /// Close the pool.
    ///
    /// Stops the balancer, disconnects every idle connection and waits for
    /// pending background disconnects. Borrowed connections are not
    /// reclaimed; returning them afterwards fails with
    /// [`PoolError::PoolClosed`] and they stay in
    /// [`connection_count`](Pool::connection_count). Disconnect failures are
    /// logged and counted, never propagated.
    ///
    /// Returns `false` if the pool was already closed.
    pub async fn close(&self) -> bool {
        let inner = &self.inner;
        if inner.closed.swap(true, Ordering::AcqRel) {
            return false;
        }

        inner.shutdown.cancel();

        let drained = inner.idle.close();
        let count = drained.len();
        inner.connection_count.fetch_sub(count, Ordering::AcqRel);

        stream::iter(drained)
            .for_each_concurrent(inner.config.disconnect_concurrency, |handle| async move {
                inner.metrics.record_closed();
                let id = handle.id();
                reaper::disconnect_quietly(&*inner.connector, &inner.metrics, id, handle.into_inner())
                    .await;
            })
            .await;

        inner.reaper.shutdown().await;

        tracing::info!(
            pool_id = inner.id,
            disconnected = count,
            outstanding = inner.connection_count(),
            "connection pool closed"
        );
        true
    }

    /// Number of live connections, idle plus borrowed.
    ///
    /// After [`close`](Pool::close) this only counts connections that were
    /// borrowed at the time. The closed pool refuses them back and leaves the
    /// count as it is, so it does not fall to zero unless nothing was
    /// borrowed.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.inner.connection_count()
    }

    /// Number of idle connections.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.inner.idle.len()
    }

    /// Get the current pool status.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        self.inner.status()
    }

    /// Get pool metrics.
    #[must_use]
    pub fn metrics(&self) -> PoolMetrics {
        self.inner.metrics.snapshot()
    }

    /// Check if the pool has been initialized.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::Acquire)
    }

    /// Check if the pool is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Get the pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// The connector managing this pool's connections.
    ///
    /// Useful to disconnect a connection the pool refused.
    #[must_use]
    pub fn connector(&self) -> &C {
        &self.inner.connector
    }

    /// The backend configuration passed to the connector.
    #[must_use]
    pub fn connector_config(&self) -> &C::Config {
        &self.inner.connector_config
    }

    #[cfg(test)]
    pub(crate) fn inner(&self) -> &PoolInner<C> {
        &self.inner
    }
}

impl<C: Connector> PoolInner<C> {
    pub(crate) fn connection_count(&self) -> usize {
        self.connection_count.load(Ordering::Acquire)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn status(&self) -> PoolStatus {
        let total = self.connection_count();
        let available = self.idle.len();
        PoolStatus {
            available,
            in_use: total.saturating_sub(available),
            total,
            max: self.config.max_active,
        }
    }

    fn check_open(&self) -> Result<(), PoolError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PoolError::PoolClosed);
        }
        if !self.initialized.load(Ordering::Acquire) {
            return Err(PoolError::NotInitialized);
        }
        Ok(())
    }

    async fn borrow(&self) -> Result<Handle<C::Connection>, PoolError> {
        let deadline = Instant::now() + self.config.max_wait_time;

        loop {
            self.check_open()?;

            if self.idle.is_empty() {
                if let Some(slot) = self.reserve() {
                    return self.connect(slot).await;
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            let handle = match self.idle.pop(remaining).await {
                Ok(handle) => handle,
                Err(PopError::Timeout) => {
                    return Err(PoolError::BorrowTimeout {
                        timeout: self.config.max_wait_time,
                    });
                }
                Err(PopError::Closed) => return Err(PoolError::PoolClosed),
            };

            let id = handle.id();
            let mut guard = InFlight::new(self, handle);

            let alive = self.connector.is_connected(guard.get()).await;
            self.metrics.record_health_check(alive);
            if !alive {
                tracing::debug!(pool_id = self.id, connection_id = id, "replacing dead connection");
                continue;
            }

            match self
                .connector
                .reset(guard.get_mut(), &self.connector_config)
                .await
            {
                Ok(()) => self.metrics.record_reset(true),
                Err(e) => {
                    self.metrics.record_reset(false);
                    tracing::warn!(
                        pool_id = self.id,
                        connection_id = id,
                        error = %e,
                        "failed to reset connection, replacing it"
                    );
                    continue;
                }
            }

            return Ok(guard.into_inner());
        }
    }

    /// Claim room for one more connection if the pool is below `max_active`.
    fn reserve(&self) -> Option<Slot<'_, C>> {
        let max = self.config.max_active;
        self.connection_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (count < max).then_some(count + 1)
            })
            .ok()
            .map(|_| Slot {
                pool: self,
                armed: true,
            })
    }

    /// Open a connection into a reserved slot.
    async fn connect(&self, mut slot: Slot<'_, C>) -> Result<Handle<C::Connection>, PoolError> {
        match self.connector.connect(&self.connector_config).await {
            Ok(raw) => {
                slot.armed = false;
                let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
                self.metrics.record_created();
                tracing::trace!(pool_id = self.id, connection_id = id, "connection created");
                Ok(Handle::new(raw, id, self.id))
            }
            Err(e) => {
                tracing::warn!(pool_id = self.id, error = %e, "failed to create connection");
                Err(PoolError::ConnectFailed(e))
            }
        }
    }

    /// Give up one slot, but only while more than `floor` connections are live.
    pub(crate) fn release_slot_above(&self, floor: usize) -> bool {
        self.connection_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (count > floor).then(|| count - 1)
            })
            .is_ok()
    }

    /// Disconnect a connection whose slot was already released.
    pub(crate) fn dispose(&self, handle: Handle<C::Connection>) {
        self.metrics.record_closed();
        let id = handle.id();
        self.reaper.dispatch(id, handle.into_inner());
    }

    /// Release a connection's slot and disconnect it in the background.
    pub(crate) fn destroy(&self, handle: Handle<C::Connection>) {
        self.connection_count.fetch_sub(1, Ordering::AcqRel);
        self.dispose(handle);
    }

    /// Release a connection's slot and disconnect it before returning.
    async fn discard_now(&self, handle: Handle<C::Connection>) {
        self.connection_count.fetch_sub(1, Ordering::AcqRel);
        self.metrics.record_closed();
        let id = handle.id();
        reaper::disconnect_quietly(&*self.connector, &self.metrics, id, handle.into_inner()).await;
    }
}

impl<C: Connector> Drop for PoolInner<C> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// A reserved connection slot, released again unless a connection fills it.
struct Slot<'a, C: Connector> {
    pool: &'a PoolInner<C>,
    armed: bool,
}

impl<C: Connector> Drop for Slot<'_, C> {
    fn drop(&mut self) {
        if self.armed {
            self.pool.connection_count.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

/// A connection held by the pool across an await point. Destroyed if the
/// surrounding operation bails out or is cancelled before taking it.
struct InFlight<'a, C: Connector> {
    pool: &'a PoolInner<C>,
    handle: Option<Handle<C::Connection>>,
}

impl<'a, C: Connector> InFlight<'a, C> {
    fn new(pool: &'a PoolInner<C>, handle: Handle<C::Connection>) -> Self {
        Self {
            pool,
            handle: Some(handle),
        }
    }

    fn get(&self) -> &C::Connection {
        match &self.handle {
            Some(handle) => handle.get_ref(),
            None => unreachable!("in-flight connection already taken"),
        }
    }

    fn get_mut(&mut self) -> &mut C::Connection {
        match &mut self.handle {
            Some(handle) => handle.get_mut(),
            None => unreachable!("in-flight connection already taken"),
        }
    }

    fn into_inner(mut self) -> Handle<C::Connection> {
        match self.handle.take() {
            Some(handle) => handle,
            None => unreachable!("in-flight connection already taken"),
        }
    }
}

impl<C: Connector> Drop for InFlight<'_, C> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.pool.destroy(handle);
        }
    }
}

/// Builder for creating a connection pool.
///
/// # Example
///
/// ```rust,ignore
/// let pool = PoolBuilder::new()
///     .min_active(2)
///     .max_active(5)
///     .max_wait_time(Duration::from_secs(1))
///     .connect(RedisConnector, redis_config)
///     .await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct PoolBuilder {
    pool_config: PoolConfig,
}

impl PoolBuilder {
    /// Create a new pool builder with default settings.
    pub fn new() -> Self {
        Self {
            pool_config: PoolConfig::default(),
        }
    }

    /// Set the pool configuration.
    #[must_use]
    pub fn pool_config(mut self, config: PoolConfig) -> Self {
        self.pool_config = config;
        self
    }

    /// Set the minimum number of active connections.
    #[must_use]
    pub fn min_active(mut self, count: usize) -> Self {
        self.pool_config.min_active = count;
        self
    }

    /// Set the maximum number of active connections.
    #[must_use]
    pub fn max_active(mut self, count: usize) -> Self {
        self.pool_config.max_active = count;
        self
    }

    /// Set the maximum time to wait for a connection.
    #[must_use]
    pub fn max_wait_time(mut self, timeout: std::time::Duration) -> Self {
        self.pool_config.max_wait_time = timeout;
        self
    }

    /// Set the idle time after which surplus connections are evicted.
    #[must_use]
    pub fn max_idle_time(mut self, timeout: std::time::Duration) -> Self {
        self.pool_config.max_idle_time = timeout;
        self
    }

    /// Set the balancer interval.
    #[must_use]
    pub fn idle_check_interval(mut self, interval: std::time::Duration) -> Self {
        self.pool_config.idle_check_interval = interval;
        self
    }

    /// Build an uninitialized pool.
    pub fn build<C: Connector>(
        self,
        connector: C,
        connector_config: C::Config,
    ) -> Result<Pool<C>, PoolError> {
        Pool::new(self.pool_config, connector, connector_config)
    }

    /// Build the pool and initialize it.
    pub async fn connect<C: Connector>(
        self,
        connector: C,
        connector_config: C::Config,
    ) -> Result<Pool<C>, PoolError> {
        let pool = self.build(connector, connector_config)?;
        pool.init().await?;
        Ok(pool)
    }
}

/// Status information about the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Number of idle connections available.
    pub available: usize,
    /// Number of connections currently borrowed.
    pub in_use: usize,
    /// Total number of live connections.
    pub total: usize,
    /// Maximum allowed connections.
    pub max: usize,
}

impl PoolStatus {
    /// Calculate the utilization percentage.
    #[must_use]
    pub fn utilization(&self) -> f64 {
        if self.max == 0 {
            return 0.0;
        }
        (self.in_use as f64 / self.max as f64) * 100.0
    }

    /// Check if the pool is at capacity.
    #[must_use]
    pub fn is_at_capacity(&self) -> bool {
        self.total >= self.max
    }
}

/// A connection retrieved from the pool with [`Pool::get`].
///
/// When dropped, the connection is returned to the pool in the background.
/// Use [`release`](PooledConnection::release) to return it and observe the
/// outcome, or [`detach`](PooledConnection::detach) to take it out of the
/// pool for good.
pub struct PooledConnection<C: Connector> {
    handle: Option<Handle<C::Connection>>,
    pool: Pool<C>,
}

impl<C: Connector> PooledConnection<C> {
    /// The pooled handle.
    #[must_use]
    pub fn handle(&self) -> &Handle<C::Connection> {
        match &self.handle {
            Some(handle) => handle,
            None => unreachable!("pooled connection already released"),
        }
    }

    /// Borrow the raw backend connection.
    pub fn get_ref(&self) -> &C::Connection {
        self.handle().get_ref()
    }

    /// Mutably borrow the raw backend connection.
    pub fn get_mut(&mut self) -> &mut C::Connection {
        match &mut self.handle {
            Some(handle) => handle.get_mut(),
            None => unreachable!("pooled connection already released"),
        }
    }

    /// Return the connection now.
    ///
    /// Same outcome as [`Pool::return_connection`]. A refused connection is
    /// disconnected.
    pub async fn release(mut self) -> Result<bool, PoolError> {
        let Some(handle) = self.handle.take() else {
            return Ok(false);
        };
        let pool = self.pool.clone();
        give_back(pool, handle).await
    }

    /// Detach the connection from the pool.
    ///
    /// The connection no longer counts against `max_active` and will not be
    /// returned when dropped; the caller becomes responsible for closing it.
    pub fn detach(mut self) -> C::Connection {
        let handle = match self.handle.take() {
            Some(handle) => handle,
            None => unreachable!("pooled connection already released"),
        };
        let inner = &self.pool.inner;
        if !inner.is_closed() {
            inner.connection_count.fetch_sub(1, Ordering::AcqRel);
        }
        tracing::trace!(
            pool_id = inner.id,
            connection_id = handle.id(),
            "connection detached from pool"
        );
        handle.into_inner()
    }
}

impl<C: Connector> fmt::Debug for PooledConnection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("connection_id", &self.handle.as_ref().map(Handle::id))
            .field("pool", &self.pool)
            .finish()
    }
}

async fn give_back<C: Connector>(
    pool: Pool<C>,
    handle: Handle<C::Connection>,
) -> Result<bool, PoolError> {
    match pool.return_connection(handle).await {
        Ok(retained) => Ok(retained),
        Err(rejected) => {
            let ReturnError { error, connection } = rejected;
            let inner = &pool.inner;
            if !error.is_closed() {
                inner.connection_count.fetch_sub(1, Ordering::AcqRel);
            }
            reaper::disconnect_quietly(
                &*inner.connector,
                &inner.metrics,
                connection.id(),
                connection.into_inner(),
            )
            .await;
            Err(error)
        }
    }
}

impl<C: Connector> Drop for PooledConnection<C> {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        tracing::trace!(connection_id = handle.id(), "returning connection to pool");
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let pool = self.pool.clone();
                runtime.spawn(async move {
                    if let Err(e) = give_back(pool, handle).await {
                        tracing::debug!(error = %e, "pool refused returned connection");
                    }
                });
            }
            Err(_) => {
                // No runtime to run the return on; dropping closes the raw connection.
                if !self.pool.is_closed() {
                    self.pool.inner.destroy(handle);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectorError;
    use async_trait::async_trait;

    struct Counting;

    #[async_trait]
    impl Connector for Counting {
        type Connection = u32;
        type Config = ();

        async fn connect(&self, _config: &()) -> Result<u32, ConnectorError> {
            Ok(1)
        }

        async fn disconnect(&self, _conn: u32) -> Result<(), ConnectorError> {
            Ok(())
        }

        async fn is_connected(&self, _conn: &u32) -> bool {
            true
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_return_to_full_queue_discards() {
        let config = PoolConfig::new().min_active(0).max_active(2);
        let pool = Pool::new(config, Counting, ()).unwrap();
        assert!(pool.init().await.unwrap());

        let first = pool.borrow().await.unwrap();
        let _second = pool.borrow().await.unwrap();
        assert_eq!(pool.connection_count(), 2);

        let inner = pool.inner();
        for id in [100, 101] {
            assert!(inner.idle.push(Handle::new(0, id, inner.id)).is_ok());
        }
        assert!(inner.idle.is_full());

        assert!(!pool.return_connection(first).await.unwrap());
        assert_eq!(pool.connection_count(), 1);
        assert_eq!(pool.idle_count(), 2);
        assert_eq!(pool.metrics().return_discards, 1);
    }

    #[test]
    fn test_pool_status_utilization() {
        let status = PoolStatus {
            available: 5,
            in_use: 5,
            total: 10,
            max: 20,
        };
        assert!((status.utilization() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pool_status_at_capacity() {
        let status = PoolStatus {
            available: 0,
            in_use: 10,
            total: 10,
            max: 10,
        };
        assert!(status.is_at_capacity());

        let status2 = PoolStatus {
            available: 5,
            in_use: 5,
            total: 10,
            max: 20,
        };
        assert!(!status2.is_at_capacity());
    }

    #[test]
    fn test_builder_default() {
        let builder = PoolBuilder::new();
        assert_eq!(builder.pool_config.min_active, 20);
        assert_eq!(builder.pool_config.max_active, 100);
    }

    #[test]
    fn test_builder_fluent() {
        let builder = PoolBuilder::new()
            .min_active(5)
            .max_active(50)
            .max_wait_time(std::time::Duration::from_secs(2));

        assert_eq!(builder.pool_config.min_active, 5);
        assert_eq!(builder.pool_config.max_active, 50);
        assert_eq!(
            builder.pool_config.max_wait_time,
            std::time::Duration::from_secs(2)
        );
    }
}

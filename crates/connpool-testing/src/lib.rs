//! # connpool-testing
//!
//! Test infrastructure for `connpool`.
//!
//! [`MockConnector`] hands out in-memory connections and records every call
//! the pool makes, so tests can assert on connects, disconnects, resets and
//! liveness without a real backend. Faults are injected through setters:
//!
//! ```rust,ignore
//! use connpool::{Pool, PoolConfig};
//! use connpool_testing::{MockConfig, MockConnector};
//!
//! let mock = MockConnector::new();
//! let pool = Pool::new(PoolConfig::new().min_active(2), mock.clone(), MockConfig::default())?;
//! pool.init().await?;
//!
//! let conn = pool.borrow().await?;
//! mock.kill(conn.get_ref().id());
//! assert!(!pool.return_connection(conn).await?);
//! assert_eq!(mock.disconnects(), 1);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use connpool::{Connector, ConnectorError, async_trait};
use parking_lot::Mutex;

static NEXT_ORIGIN: AtomicU64 = AtomicU64::new(1);

/// Backend configuration for [`MockConnector`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockConfig {
    /// Logical database selected on connect and on every reset.
    pub database: u32,
}

/// An in-memory connection produced by [`MockConnector`].
#[derive(Debug, PartialEq, Eq)]
pub struct MockConnection {
    id: u64,
    origin: u64,
    database: u32,
}

impl MockConnection {
    /// Connection identifier, unique per connector.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Currently selected logical database.
    #[must_use]
    pub fn database(&self) -> u32 {
        self.database
    }

    /// Switch the logical database, as a borrower might.
    pub fn select(&mut self, database: u32) {
        self.database = database;
    }
}

#[derive(Debug)]
struct MockState {
    origin: u64,
    next_id: AtomicU64,
    connects: AtomicUsize,
    resets: AtomicUsize,
    open: Mutex<HashSet<u64>>,
    dead: Mutex<HashSet<u64>>,
    disconnected: Mutex<Vec<u64>>,
    fail_connect: AtomicBool,
    fail_disconnect: AtomicBool,
    fail_reset: AtomicBool,
    connect_delay: Mutex<Duration>,
    probe_delay: Mutex<Duration>,
}

/// A [`Connector`] backed by memory, with call recording and fault
/// injection.
///
/// Clones share state, so a test can keep one clone for assertions after
/// moving another into a pool.
#[derive(Debug, Clone)]
pub struct MockConnector {
    state: Arc<MockState>,
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnector {
    /// Create a connector with no faults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockState {
                origin: NEXT_ORIGIN.fetch_add(1, Ordering::Relaxed),
                next_id: AtomicU64::new(1),
                connects: AtomicUsize::new(0),
                resets: AtomicUsize::new(0),
                open: Mutex::new(HashSet::new()),
                dead: Mutex::new(HashSet::new()),
                disconnected: Mutex::new(Vec::new()),
                fail_connect: AtomicBool::new(false),
                fail_disconnect: AtomicBool::new(false),
                fail_reset: AtomicBool::new(false),
                connect_delay: Mutex::new(Duration::ZERO),
                probe_delay: Mutex::new(Duration::ZERO),
            }),
        }
    }

    /// Number of successful connects.
    #[must_use]
    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::Acquire)
    }

    /// Number of disconnect calls, failed ones included.
    #[must_use]
    pub fn disconnects(&self) -> usize {
        self.state.disconnected.lock().len()
    }

    /// Ids passed to `disconnect`, in call order.
    #[must_use]
    pub fn disconnected_ids(&self) -> Vec<u64> {
        self.state.disconnected.lock().clone()
    }

    /// Number of reset calls.
    #[must_use]
    pub fn resets(&self) -> usize {
        self.state.resets.load(Ordering::Acquire)
    }

    /// Connections opened and not yet disconnected.
    #[must_use]
    pub fn open_connections(&self) -> usize {
        self.state.open.lock().len()
    }

    /// Make a connection fail its liveness probe from now on.
    pub fn kill(&self, id: u64) {
        self.state.dead.lock().insert(id);
    }

    /// Make every open connection fail its liveness probe.
    pub fn kill_all(&self) {
        let open = self.state.open.lock().clone();
        self.state.dead.lock().extend(open);
    }

    /// Make `connect` fail.
    pub fn set_fail_connect(&self, fail: bool) {
        self.state.fail_connect.store(fail, Ordering::Release);
    }

    /// Make `disconnect` report an error (the connection is still closed).
    pub fn set_fail_disconnect(&self, fail: bool) {
        self.state.fail_disconnect.store(fail, Ordering::Release);
    }

    /// Make `reset` fail.
    pub fn set_fail_reset(&self, fail: bool) {
        self.state.fail_reset.store(fail, Ordering::Release);
    }

    /// Delay every `connect` by `delay`.
    pub fn set_connect_delay(&self, delay: Duration) {
        *self.state.connect_delay.lock() = delay;
    }

    /// Delay every liveness probe by `delay`.
    pub fn set_probe_delay(&self, delay: Duration) {
        *self.state.probe_delay.lock() = delay;
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Connection = MockConnection;
    type Config = MockConfig;

    async fn connect(&self, config: &MockConfig) -> Result<MockConnection, ConnectorError> {
        let delay = *self.state.connect_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.state.fail_connect.load(Ordering::Acquire) {
            return Err(ConnectorError::with_code(2002, "Connection refused"));
        }

        let id = self.state.next_id.fetch_add(1, Ordering::Relaxed);
        self.state.open.lock().insert(id);
        self.state.connects.fetch_add(1, Ordering::AcqRel);
        tracing::trace!(connection_id = id, "mock connection opened");

        Ok(MockConnection {
            id,
            origin: self.state.origin,
            database: config.database,
        })
    }

    async fn disconnect(&self, conn: MockConnection) -> Result<(), ConnectorError> {
        self.state.open.lock().remove(&conn.id);
        self.state.disconnected.lock().push(conn.id);

        if self.state.fail_disconnect.load(Ordering::Acquire) {
            return Err(ConnectorError::new("connection reset by peer"));
        }
        Ok(())
    }

    async fn is_connected(&self, conn: &MockConnection) -> bool {
        let delay = *self.state.probe_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        !self.state.dead.lock().contains(&conn.id)
    }

    async fn reset(
        &self,
        conn: &mut MockConnection,
        config: &MockConfig,
    ) -> Result<(), ConnectorError> {
        self.state.resets.fetch_add(1, Ordering::AcqRel);
        if self.state.fail_reset.load(Ordering::Acquire) {
            return Err(ConnectorError::with_code(1049, "Unknown database"));
        }
        conn.database = config.database;
        Ok(())
    }

    fn validate(&self, conn: &MockConnection) -> bool {
        conn.origin == self.state.origin
    }
}

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_calls() {
        let mock = MockConnector::new();
        let config = MockConfig { database: 3 };

        let mut conn = mock.connect(&config).await.unwrap();
        assert_eq!(conn.database(), 3);
        assert_eq!(mock.connects(), 1);
        assert_eq!(mock.open_connections(), 1);
        assert!(mock.validate(&conn));
        assert!(mock.is_connected(&conn).await);

        conn.select(7);
        mock.reset(&mut conn, &config).await.unwrap();
        assert_eq!(conn.database(), 3);
        assert_eq!(mock.resets(), 1);

        mock.kill(conn.id());
        assert!(!mock.is_connected(&conn).await);

        let id = conn.id();
        mock.disconnect(conn).await.unwrap();
        assert_eq!(mock.disconnected_ids(), vec![id]);
        assert_eq!(mock.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_foreign_connection_fails_validation() {
        let a = MockConnector::new();
        let b = MockConnector::new();
        let conn = a.connect(&MockConfig::default()).await.unwrap();
        assert!(!b.validate(&conn));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let mock = MockConnector::new();
        mock.set_fail_connect(true);
        let err = mock.connect(&MockConfig::default()).await.unwrap_err();
        assert_eq!(err.code, Some(2002));

        mock.set_fail_connect(false);
        mock.set_fail_disconnect(true);
        let conn = mock.connect(&MockConfig::default()).await.unwrap();
        assert!(mock.disconnect(conn).await.is_err());
        assert_eq!(mock.disconnects(), 1);
    }
}

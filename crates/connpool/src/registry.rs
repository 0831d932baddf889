//! Named pools owned by a server.
//!
//! A server typically holds one pool per backend (`"mysql"`, `"redis"`, ...)
//! and ties them to its own lifecycle: [`PoolRegistry::start`] when a worker
//! starts, [`PoolRegistry::stop`] when it shuts down.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use parking_lot::RwLock;

use crate::connector::Connector;
use crate::error::PoolError;
use crate::pool::{Pool, PoolStatus};

/// Lifecycle operations shared by pools of any connector type.
#[async_trait]
pub trait ManagedPool: Send + Sync + 'static {
    /// Initialize the pool. See [`Pool::init`].
    async fn init(&self) -> Result<bool, PoolError>;

    /// Close the pool. See [`Pool::close`].
    async fn close(&self) -> bool;

    /// Current pool status.
    fn status(&self) -> PoolStatus;

    /// Check if the pool is closed.
    fn is_closed(&self) -> bool;

    /// Access the concrete pool type.
    fn as_any(&self) -> &dyn Any;
}

#[async_trait]
impl<C: Connector> ManagedPool for Pool<C> {
    async fn init(&self) -> Result<bool, PoolError> {
        Pool::init(self).await
    }

    async fn close(&self) -> bool {
        Pool::close(self).await
    }

    fn status(&self) -> PoolStatus {
        Pool::status(self)
    }

    fn is_closed(&self) -> bool {
        Pool::is_closed(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A set of pools addressed by name.
#[derive(Default)]
pub struct PoolRegistry {
    pools: RwLock<BTreeMap<String, Arc<dyn ManagedPool>>>,
}

impl PoolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pool under `name`, returning the pool it replaces.
    ///
    /// A replaced pool is not closed.
    pub fn insert(
        &self,
        name: impl Into<String>,
        pool: impl ManagedPool,
    ) -> Option<Arc<dyn ManagedPool>> {
        self.pools.write().insert(name.into(), Arc::new(pool))
    }

    /// Get a pool by name with its concrete connector type.
    ///
    /// Returns `None` if no pool has that name or it uses another connector.
    #[must_use]
    pub fn get<C: Connector>(&self, name: &str) -> Option<Pool<C>> {
        let pools = self.pools.read();
        pools
            .get(name)?
            .as_any()
            .downcast_ref::<Pool<C>>()
            .cloned()
    }

    /// Get a pool by name without knowing its connector type.
    #[must_use]
    pub fn get_managed(&self, name: &str) -> Option<Arc<dyn ManagedPool>> {
        self.pools.read().get(name).cloned()
    }

    /// Unregister a pool. The pool is not closed.
    pub fn remove(&self, name: &str) -> Option<Arc<dyn ManagedPool>> {
        self.pools.write().remove(name)
    }

    /// Registered pool names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.pools.read().keys().cloned().collect()
    }

    /// Number of registered pools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.read().len()
    }

    /// Check if no pool is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.read().is_empty()
    }

    /// Initialize every registered pool in name order.
    ///
    /// Stops at the first failure. Returns how many pools were initialized
    /// by this call.
    pub async fn start(&self) -> Result<usize, PoolError> {
        let pools = self.snapshot();
        let mut started = 0;
        for (name, pool) in pools {
            if pool.init().await? {
                tracing::debug!(pool = %name, "pool started");
                started += 1;
            }
        }
        Ok(started)
    }

    /// Close one pool by name. Returns `None` if no pool has that name.
    pub async fn close(&self, name: &str) -> Option<bool> {
        let pool = self.get_managed(name)?;
        Some(pool.close().await)
    }

    /// Close every registered pool concurrently.
    ///
    /// Returns how many pools were closed by this call.
    pub async fn stop(&self) -> usize {
        let pools = self.snapshot();
        let closed = join_all(pools.iter().map(|(_, pool)| pool.close())).await;
        let count = closed.into_iter().filter(|closed| *closed).count();
        tracing::info!(closed = count, "connection pools stopped");
        count
    }

    fn snapshot(&self) -> Vec<(String, Arc<dyn ManagedPool>)> {
        self.pools
            .read()
            .iter()
            .map(|(name, pool)| (name.clone(), pool.clone()))
            .collect()
    }
}

impl std::fmt::Debug for PoolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("pools", &self.names())
            .finish()
    }
}

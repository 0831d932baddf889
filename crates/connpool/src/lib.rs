//! # connpool
//!
//! Backend-agnostic connection pool for short-lived request/response
//! workloads on tokio.
//!
//! The pool knows nothing about wire protocols. A [`Connector`] opens,
//! probes, resets and closes connections for one backend (MySQL, Redis,
//! PostgreSQL, ...), and the pool handles sizing, fair bounded waits and
//! idle eviction on top of it.
//!
//! ## Features
//!
//! - `min_active` connections opened on init and kept by the balancer
//! - At most `max_active` live connections, new ones opened on demand
//! - `borrow` waits at most `max_wait_time`, then fails with
//!   [`PoolError::BorrowTimeout`]
//! - Liveness probe and session reset before a connection is reused
//! - Background eviction of connections idle longer than `max_idle_time`
//! - Bounded background disconnects for discarded connections
//! - Metrics and status for observability
//! - [`PoolRegistry`] for servers that own several named pools
//!
//! ## Example
//!
//! ```rust,ignore
//! use connpool::{Pool, PoolConfig};
//! use std::time::Duration;
//!
//! let config = PoolConfig::new()
//!     .min_active(10)
//!     .max_active(30)
//!     .max_wait_time(Duration::from_secs(5))
//!     .max_idle_time(Duration::from_secs(20));
//!
//! let pool = Pool::new(config, RedisConnector, redis_config)?;
//! pool.init().await?;
//!
//! // Explicit borrow / return
//! let mut conn = pool.borrow().await?;
//! redis::cmd("SET").arg("key").arg("value").query_async(conn.get_mut()).await?;
//! pool.return_connection(conn).await?;
//!
//! // Or let a guard return it on drop
//! let conn = pool.get().await?;
//!
//! let status = pool.status();
//! println!("Pool utilization: {:.1}%", status.utilization());
//!
//! pool.close().await;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod balancer;
pub mod config;
pub mod connector;
pub mod error;
pub mod handle;
mod idle;
pub mod metrics;
pub mod pool;
mod reaper;
pub mod registry;

// Configuration
pub use config::{MIN_IDLE_CHECK_INTERVAL, PoolConfig};
#[cfg(feature = "serde")]
pub use config::PoolOptions;

// Connector contract
pub use connector::Connector;

// Error types
pub use error::{ConnectorError, PoolError, ReturnError};

// Pool types
pub use handle::{ConnectionMetadata, Handle};
pub use metrics::PoolMetrics;
pub use pool::{Pool, PoolBuilder, PoolStatus, PooledConnection};
pub use registry::{ManagedPool, PoolRegistry};

// Re-exported so connector implementations need no direct dependency.
pub use async_trait::async_trait;

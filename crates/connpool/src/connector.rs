//! Backend connector contract.
//!
//! A [`Connector`] is the only part of the pool that knows how to talk to a
//! concrete backend. The pool calls it to open, probe, normalize and close
//! connections, and never touches the raw connection otherwise.

use async_trait::async_trait;

use crate::error::ConnectorError;

/// Backend-specific adapter used by the pool to manage raw connections.
///
/// Implementations must be safe to call concurrently for different
/// connections. Calls for the same connection are never concurrent because a
/// connection has a single holder at any time.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use connpool::{Connector, ConnectorError};
///
/// struct RedisConnector;
///
/// #[async_trait]
/// impl Connector for RedisConnector {
///     type Connection = redis::aio::Connection;
///     type Config = RedisConfig;
///
///     async fn connect(&self, config: &RedisConfig) -> Result<Self::Connection, ConnectorError> {
///         let client = redis::Client::open(config.url.as_str())
///             .map_err(|e| ConnectorError::new(e.to_string()))?;
///         client.get_async_connection().await.map_err(|e| ConnectorError::new(e.to_string()))
///     }
///
///     async fn disconnect(&self, _conn: Self::Connection) -> Result<(), ConnectorError> {
///         Ok(())
///     }
///
///     async fn is_connected(&self, _conn: &Self::Connection) -> bool {
///         true
///     }
///
///     async fn reset(&self, conn: &mut Self::Connection, config: &RedisConfig) -> Result<(), ConnectorError> {
///         redis::cmd("SELECT").arg(config.database).query_async(conn).await
///             .map_err(|e| ConnectorError::new(e.to_string()))
///     }
/// }
/// ```
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The raw backend connection.
    ///
    /// `Sync` lets the pool probe a connection by reference across an await.
    type Connection: Send + Sync + 'static;

    /// Backend configuration, passed verbatim to `connect` and `reset`.
    type Config: Send + Sync + 'static;

    /// Open a new backend connection.
    async fn connect(&self, config: &Self::Config) -> Result<Self::Connection, ConnectorError>;

    /// Close a backend connection and free its resources.
    ///
    /// The pool treats this as best-effort: errors are logged and counted,
    /// never propagated.
    async fn disconnect(&self, conn: Self::Connection) -> Result<(), ConnectorError>;

    /// Cheap liveness probe.
    ///
    /// Should avoid a network round-trip where the backend client tracks
    /// connection state locally.
    async fn is_connected(&self, conn: &Self::Connection) -> bool;

    /// Normalize session state before a reused connection is handed out,
    /// e.g. re-select the logical database.
    async fn reset(
        &self,
        _conn: &mut Self::Connection,
        _config: &Self::Config,
    ) -> Result<(), ConnectorError> {
        Ok(())
    }

    /// Check that a connection handed back to the pool belongs to this
    /// backend.
    fn validate(&self, _conn: &Self::Connection) -> bool {
        true
    }
}

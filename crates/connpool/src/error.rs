//! Pool error types.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::handle::Handle;

/// Errors that can occur during pool operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PoolError {
    /// The connector could not establish a new backend connection.
    #[error("failed to connect: {0}")]
    ConnectFailed(#[from] ConnectorError),

    /// No connection became available within the configured wait time.
    #[error("timed out borrowing a connection after {:.2}s", .timeout.as_secs_f64())]
    BorrowTimeout {
        /// The configured maximum wait time.
        timeout: Duration,
    },

    /// A returned connection failed the validity check.
    #[error("invalid connection returned to pool")]
    InvalidConnection,

    /// The pool has been closed.
    #[error("pool is closed")]
    PoolClosed,

    /// The pool has not been initialized yet.
    #[error("pool is not initialized")]
    NotInitialized,

    /// Invalid pool configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl PoolError {
    /// Check if this error is a borrow timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::BorrowTimeout { .. })
    }

    /// Check if this error was caused by a closed pool.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::PoolClosed)
    }

    /// The configured wait time, if this is a borrow timeout.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            Self::BorrowTimeout { timeout } => Some(*timeout),
            _ => None,
        }
    }
}

/// Error reported by a [`Connector`](crate::Connector) operation.
///
/// Carries the backend-reported error code when one is available.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}{message}", code_prefix(.code))]
pub struct ConnectorError {
    /// Backend-specific error code.
    pub code: Option<i64>,
    /// Human-readable error message.
    pub message: String,
}

fn code_prefix(code: &Option<i64>) -> String {
    code.map(|code| format!("[{code}] ")).unwrap_or_default()
}

impl ConnectorError {
    /// Create an error without a backend code.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// Create an error with a backend code.
    pub fn with_code(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }
}

/// A connection handed back to [`Pool::return_connection`](crate::Pool::return_connection)
/// that the pool refused.
///
/// The caller keeps ownership of the rejected connection and decides how to
/// dispose of it.
#[derive(Error)]
#[error("{error}")]
pub struct ReturnError<T> {
    /// Why the connection was refused.
    #[source]
    pub error: PoolError,
    /// The rejected connection.
    pub connection: Handle<T>,
}

impl<T> ReturnError<T> {
    pub(crate) fn new(error: PoolError, connection: Handle<T>) -> Self {
        Self { error, connection }
    }

    /// Take back the rejected connection.
    pub fn into_inner(self) -> Handle<T> {
        self.connection
    }
}

impl<T> fmt::Debug for ReturnError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReturnError")
            .field("error", &self.error)
            .field("connection", self.connection.metadata())
            .finish()
    }
}

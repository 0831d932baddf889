//! Pooled connection handles.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

/// Bookkeeping the pool keeps for every connection it manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionMetadata {
    /// Identifier unique within the owning pool.
    pub id: u64,
    /// Identifier of the pool that created the connection.
    pub pool_id: u64,
    /// When the connection was opened.
    pub created_at: Instant,
    /// When the connection was opened or last returned to the pool.
    pub last_active: Instant,
}

impl ConnectionMetadata {
    pub(crate) fn new(id: u64, pool_id: u64) -> Self {
        let now = Instant::now();
        Self {
            id,
            pool_id,
            created_at: now,
            last_active: now,
        }
    }

    /// Time since the connection was opened.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Time since the connection was last active.
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }
}

/// A raw backend connection owned by exactly one holder: the pool's idle
/// queue, a borrower, or the disconnect path.
///
/// The handle never forwards backend operations. Use
/// [`get_ref`](Handle::get_ref) / [`get_mut`](Handle::get_mut) to reach the
/// raw connection.
pub struct Handle<T> {
    raw: T,
    metadata: ConnectionMetadata,
}

impl<T> Handle<T> {
    pub(crate) fn new(raw: T, id: u64, pool_id: u64) -> Self {
        Self {
            raw,
            metadata: ConnectionMetadata::new(id, pool_id),
        }
    }

    /// Connection bookkeeping.
    #[must_use]
    pub fn metadata(&self) -> &ConnectionMetadata {
        &self.metadata
    }

    /// Identifier unique within the owning pool.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.metadata.id
    }

    /// When the connection was opened or last returned to the pool.
    #[must_use]
    pub fn last_active(&self) -> Instant {
        self.metadata.last_active
    }

    /// Time since the connection was last active.
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.metadata.idle_for()
    }

    /// Borrow the raw backend connection.
    pub fn get_ref(&self) -> &T {
        &self.raw
    }

    /// Mutably borrow the raw backend connection.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.raw
    }

    /// Take the raw connection out of the handle.
    ///
    /// The connection no longer counts against any pool once it leaves the
    /// handle this way; call this only on handles the pool gave up.
    pub fn into_inner(self) -> T {
        self.raw
    }

    pub(crate) fn touch(&mut self) {
        self.metadata.last_active = Instant::now();
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_touch_updates_last_active() {
        let mut handle = Handle::new("raw", 7, 1);
        assert_eq!(handle.id(), 7);
        assert_eq!(handle.metadata().pool_id, 1);
        assert_eq!(handle.idle_for(), Duration::ZERO);

        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(handle.idle_for(), Duration::from_secs(3));
        assert_eq!(handle.metadata().age(), Duration::from_secs(3));

        handle.touch();
        assert_eq!(handle.idle_for(), Duration::ZERO);
        assert_eq!(handle.metadata().age(), Duration::from_secs(3));
        assert_eq!(*handle.get_ref(), "raw");
    }
}

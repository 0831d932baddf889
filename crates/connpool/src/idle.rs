//! Bounded queue of idle connections.
//!
//! The queue pairs a `VecDeque` with a semaphore whose permit count tracks
//! the number of queued handles, so waiters can block on "a handle is
//! available" with a timeout. A permit is always added after its handle is
//! queued and taken before its handle is removed, which keeps
//! `permits <= len` at every point.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::handle::Handle;

/// Why a blocking pop did not yield a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PopError {
    /// Nothing became available within the wait window.
    Timeout,
    /// The queue was closed while waiting.
    Closed,
}

pub(crate) struct IdleQueue<T> {
    items: Mutex<VecDeque<Handle<T>>>,
    available: Semaphore,
    capacity: usize,
}

impl<T> IdleQueue<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            available: Semaphore::new(0),
            capacity,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.items.lock().len() >= self.capacity
    }

    /// Queue a handle, giving it back if the queue is full or closed.
    pub(crate) fn push(&self, handle: Handle<T>) -> Result<(), Handle<T>> {
        {
            let mut items = self.items.lock();
            if self.available.is_closed() || items.len() >= self.capacity {
                return Err(handle);
            }
            items.push_back(handle);
        }
        self.available.add_permits(1);
        Ok(())
    }

    /// Take a handle if one is queued right now.
    pub(crate) fn try_pop(&self) -> Option<Handle<T>> {
        let permit = self.available.try_acquire().ok()?;
        permit.forget();
        self.items.lock().pop_front()
    }

    /// Wait up to `timeout` for a handle.
    pub(crate) async fn pop(&self, timeout: Duration) -> Result<Handle<T>, PopError> {
        let permit = match tokio::time::timeout(timeout, self.available.acquire()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(PopError::Closed),
            Err(_) => return Err(PopError::Timeout),
        };
        permit.forget();

        // Empty only if `close` drained the queue after our permit was granted.
        self.items.lock().pop_front().ok_or(PopError::Closed)
    }

    /// Close the queue, waking every waiter, and take all queued handles.
    pub(crate) fn close(&self) -> Vec<Handle<T>> {
        let mut items = self.items.lock();
        self.available.close();
        items.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(id: u64) -> Handle<u64> {
        Handle::new(id, id, 1)
    }

    #[test]
    fn test_push_respects_capacity() {
        let queue = IdleQueue::new(2);
        assert!(queue.is_empty());
        assert!(queue.push(handle(1)).is_ok());
        assert!(queue.push(handle(2)).is_ok());
        assert!(queue.is_full());

        let rejected = queue.push(handle(3)).unwrap_err();
        assert_eq!(rejected.id(), 3);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_fifo_order() {
        let queue = IdleQueue::new(3);
        for id in 1..=3 {
            queue.push(handle(id)).unwrap();
        }
        let order: Vec<u64> = std::iter::from_fn(|| queue.try_pop().map(|h| h.id())).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert!(queue.try_pop().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pop_times_out() {
        let queue: IdleQueue<u64> = IdleQueue::new(1);
        let start = tokio::time::Instant::now();
        let err = queue.pop(Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err, PopError::Timeout);
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pop_wakes_on_push() {
        let queue = std::sync::Arc::new(IdleQueue::new(1));
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop(Duration::from_secs(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        queue.push(handle(9)).unwrap();

        let got = waiter.await.unwrap().unwrap();
        assert_eq!(got.id(), 9);
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_drains_and_wakes_waiters() {
        let queue = std::sync::Arc::new(IdleQueue::new(2));
        queue.push(handle(1)).unwrap();
        queue.push(handle(2)).unwrap();

        let drained = queue.close();
        assert_eq!(drained.len(), 2);
        assert!(queue.is_empty());
        assert!(queue.push(handle(3)).is_err());
        assert!(queue.try_pop().is_none());
        assert_eq!(
            queue.pop(Duration::from_secs(1)).await.unwrap_err(),
            PopError::Closed
        );
    }
}

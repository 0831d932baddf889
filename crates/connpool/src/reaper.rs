//! Bounded background disconnects.
//!
//! Connections destroyed on the hot path (dead on borrow, discarded on
//! return, evicted by the balancer) are handed to a dispatcher task through
//! a bounded queue. The dispatcher runs at most `concurrency` disconnects at
//! once. When the queue is full the connection is dropped in place instead,
//! so a storm of bad connections can never pile up unbounded work.
//!
//! Once the dispatcher has stopped (the pool is closed), stragglers are
//! disconnected on a task of their own.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::{JoinHandle, JoinSet};

use crate::connector::Connector;
use crate::metrics::Metrics;

struct Discard<T> {
    id: u64,
    raw: T,
}

pub(crate) struct Reaper<C: Connector> {
    connector: Arc<C>,
    metrics: Arc<Metrics>,
    tx: Mutex<Option<mpsc::Sender<Discard<C::Connection>>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<C: Connector> Reaper<C> {
    /// A reaper whose dispatcher is not running yet.
    pub(crate) fn new(connector: Arc<C>, metrics: Arc<Metrics>) -> Self {
        Self {
            connector,
            metrics,
            tx: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    /// Start the dispatcher task on the current runtime.
    pub(crate) fn start(&self, concurrency: usize, capacity: usize) {
        let (tx, rx) = mpsc::channel(capacity);
        let task = tokio::spawn(run(
            self.connector.clone(),
            self.metrics.clone(),
            rx,
            concurrency,
        ));
        *self.tx.lock() = Some(tx);
        *self.task.lock() = Some(task);
    }

    /// Queue a connection for disconnect without waiting.
    pub(crate) fn dispatch(&self, id: u64, raw: C::Connection) {
        let tx = self.tx.lock().clone();
        let Some(tx) = tx else {
            self.disconnect_detached(id, raw);
            return;
        };

        match tx.try_send(Discard { id, raw }) {
            Ok(()) => {}
            Err(TrySendError::Full(discard)) => {
                tracing::warn!(
                    connection_id = discard.id,
                    "disconnect queue full, dropping connection without disconnect"
                );
            }
            Err(TrySendError::Closed(discard)) => {
                self.disconnect_detached(discard.id, discard.raw);
            }
        }
    }

    /// Disconnect outside the dispatcher, on the current runtime if any.
    fn disconnect_detached(&self, id: u64, raw: C::Connection) {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let connector = self.connector.clone();
                let metrics = self.metrics.clone();
                runtime.spawn(async move {
                    disconnect_quietly(&*connector, &metrics, id, raw).await;
                });
            }
            Err(_) => {
                tracing::debug!(connection_id = id, "no runtime to disconnect on, dropping connection");
            }
        }
    }

    /// Stop accepting work and wait for every queued disconnect to finish.
    pub(crate) async fn shutdown(&self) {
        drop(self.tx.lock().take());
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "disconnect dispatcher terminated abnormally");
            }
        }
    }
}

async fn run<C: Connector>(
    connector: Arc<C>,
    metrics: Arc<Metrics>,
    mut rx: mpsc::Receiver<Discard<C::Connection>>,
    concurrency: usize,
) {
    let limit = Arc::new(Semaphore::new(concurrency));
    let mut running = JoinSet::new();

    while let Some(Discard { id, raw }) = rx.recv().await {
        let Ok(permit) = limit.clone().acquire_owned().await else {
            break;
        };
        let connector = connector.clone();
        let metrics = metrics.clone();
        running.spawn(async move {
            disconnect_quietly(&*connector, &metrics, id, raw).await;
            drop(permit);
        });

        while running.try_join_next().is_some() {}
    }

    while running.join_next().await.is_some() {}
}

/// Disconnect a connection, logging and counting failures instead of
/// propagating them.
pub(crate) async fn disconnect_quietly<C: Connector>(
    connector: &C,
    metrics: &Metrics,
    id: u64,
    raw: C::Connection,
) {
    match connector.disconnect(raw).await {
        Ok(()) => tracing::trace!(connection_id = id, "connection disconnected"),
        Err(e) => {
            metrics.record_disconnect_failure();
            tracing::warn!(connection_id = id, error = %e, "failed to disconnect connection");
        }
    }
}

//! Tracking and reaping of spawned connection workers

use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::warn;

/// Identifier assigned to each accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Handle to one running or finished connection worker.
///
/// The completion flag is set by the worker just before it returns; the
/// registry joins the task and discards the handle once the flag is
/// observed set.
pub struct WorkerHandle {
    done: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl WorkerHandle {
    /// Pair a spawned task's join handle with its completion flag.
    pub fn new(done: Arc<AtomicBool>, handle: JoinHandle<()>) -> Self {
        Self { done, handle }
    }

    fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    async fn join(self, id: ConnectionId) {
        if let Err(e) = self.handle.await {
            warn!("{} terminated abnormally: {}", id, e);
        }
    }
}

/// Unordered collection of live worker handles.
///
/// Membership is all that matters: the accept loop sweeps it
/// opportunistically and the shutdown path drains it. Joining any handle
/// happens exactly once, because removal from the map transfers ownership.
pub struct WorkerRegistry {
    workers: DashMap<ConnectionId, WorkerHandle>,
    next_id: AtomicU64,
}

impl WorkerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            workers: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Reserve the next connection id.
    pub fn next_id(&self) -> ConnectionId {
        ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Insert a worker handle under its connection id.
    pub fn register(&self, id: ConnectionId, worker: WorkerHandle) {
        self.workers.insert(id, worker);
    }

    /// Join and remove every worker whose completion flag is set.
    ///
    /// Workers still running are left untouched, so this never blocks on a
    /// live connection.
    pub async fn sweep(&self) {
        let finished: Vec<ConnectionId> = self
            .workers
            .iter()
            .filter(|entry| entry.value().is_done())
            .map(|entry| *entry.key())
            .collect();

        for id in finished {
            if let Some((_, worker)) = self.workers.remove(&id) {
                worker.join(id).await;
            }
        }
    }

    /// Join and remove every remaining worker, finished or not.
    ///
    /// Blocks until the slowest worker returns; only the shutdown path
    /// calls this.
    pub async fn drain(&self) {
        let ids: Vec<ConnectionId> = self.workers.iter().map(|entry| *entry.key()).collect();

        for id in ids {
            if let Some((_, worker)) = self.workers.remove(&id) {
                worker.join(id).await;
            }
        }
    }

    /// Number of registered workers.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Whether no workers are registered.
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

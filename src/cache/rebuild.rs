//! Bounded background pool for logical-expiry rebuilds.
//!
//! A fixed set of workers drains a bounded queue. Submissions never block the caller:
//! when the queue is full the task is handed back as rejected. [`RebuildPool::shutdown`]
//! stops intake and waits for every queued task, so a short-lived process does not lose
//! rebuilds when its runtime exits.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

pub type RebuildTask = BoxFuture<'static, ()>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RebuildRejected {
    #[error("rebuild queue is full")]
    Full,
    #[error("rebuild pool is shut down")]
    Closed,
}

pub struct RebuildPool {
    sender: StdMutex<Option<mpsc::Sender<RebuildTask>>>,
    handles: StdMutex<Vec<JoinHandle<()>>>,
    workers: usize,
    capacity: usize,
}

impl RebuildPool {
    /// Spawn `workers` tasks on the current Tokio runtime.
    pub fn new(workers: usize, capacity: usize) -> Self {
        let workers = workers.max(1);
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel::<RebuildTask>(capacity);
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..workers)
            .map(|worker| {
                let receiver = Arc::clone(&receiver);
                tokio::spawn(async move {
                    loop {
                        let task = { receiver.lock().await.recv().await };
                        let Some(task) = task else {
                            debug!(worker, "Rebuild worker stopping: queue closed");
                            break;
                        };
                        if AssertUnwindSafe(task).catch_unwind().await.is_err() {
                            error!(worker, "Rebuild task panicked");
                        }
                    }
                })
            })
            .collect();

        Self {
            sender: StdMutex::new(Some(sender)),
            handles: StdMutex::new(handles),
            workers,
            capacity,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Queue `task` without waiting. The rejected task is dropped.
    pub fn submit(&self, task: RebuildTask) -> Result<(), RebuildRejected> {
        let sender = lock_unpoisoned(&self.sender);
        let Some(sender) = sender.as_ref() else {
            return Err(RebuildRejected::Closed);
        };
        sender.try_send(task).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => RebuildRejected::Full,
            mpsc::error::TrySendError::Closed(_) => RebuildRejected::Closed,
        })
    }

    /// Stop accepting tasks, then wait until the workers have run everything queued.
    ///
    /// Later submissions fail with [`RebuildRejected::Closed`]. Calling it again is a no-op.
    pub async fn shutdown(&self) {
        drop(lock_unpoisoned(&self.sender).take());
        let handles = std::mem::take(&mut *lock_unpoisoned(&self.handles));
        if handles.is_empty() {
            return;
        }

        let pending = handles.len();
        for handle in handles {
            if let Err(err) = handle.await {
                warn!(error = %err, "Rebuild worker ended abnormally");
            }
        }
        debug!(workers = pending, "Rebuild pool drained");
    }
}

fn lock_unpoisoned<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl std::fmt::Debug for RebuildPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RebuildPool")
            .field("workers", &self.workers)
            .field("capacity", &self.capacity)
            .finish()
    }
}

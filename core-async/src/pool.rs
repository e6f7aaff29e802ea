//! Bounded worker pool for fire-and-forget background jobs.
//!
//! Jobs are spawned immediately but only run once they hold one of the pool's
//! permits, so at most `max_workers` of them execute at the same time. The
//! caller never has to await the returned handle; dropping it detaches the job.
//!
//! ```rust
//! use core_async::pool::WorkerPool;
//!
//! # core_async::runtime::block_on(async {
//! let pool = WorkerPool::new("cache-reclaim", 1);
//! let handle = pool.submit(async { 7 });
//! assert_eq!(handle.await.unwrap(), Some(7));
//! pool.shutdown().await;
//! # });
//! ```

use crate::sync::Semaphore;
use crate::task::JoinHandle;
use std::future::Future;
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tracing::trace;

/// A named pool that caps how many submitted jobs run concurrently.
#[derive(Clone)]
pub struct WorkerPool {
    name: Arc<str>,
    max_workers: usize,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl WorkerPool {
    /// Creates a pool. `max_workers` is clamped to at least one.
    pub fn new(name: impl Into<String>, max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            name: Arc::from(name.into()),
            max_workers,
            permits: Arc::new(Semaphore::new(max_workers)),
            tracker: TaskTracker::new(),
        }
    }

    /// Submits a job.
    ///
    /// The handle resolves to `None` if the pool was shut down before the job
    /// obtained a worker slot.
    pub fn submit<F>(&self, job: F) -> JoinHandle<Option<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let name = Arc::clone(&self.name);
        self.tracker.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                trace!(pool = %name, "pool closed, dropping job");
                return None;
            };
            Some(job.await)
        })
    }

    /// Number of jobs currently holding a worker slot.
    pub fn active(&self) -> usize {
        self.max_workers - self.permits.available_permits()
    }

    /// Number of submitted jobs that have not finished yet.
    pub fn outstanding(&self) -> usize {
        self.tracker.len()
    }

    /// The configured concurrency bound.
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Rejects queued jobs and waits for running ones to finish.
    pub async fn shutdown(&self) {
        self.permits.close();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.name)
            .field("max_workers", &self.max_workers)
            .field("active", &self.active())
            .finish()
    }
}

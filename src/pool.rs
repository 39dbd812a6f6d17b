// pool.rs - Bounded worker pool
// Purpose: Run probes concurrently with a fixed number of execution slots

use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

pub const DEFAULT_WORKERS: usize = 4;

/// Every submitted task waits for a semaphore permit before it runs, so at most
/// `capacity` probes are in flight at once.
#[derive(Clone, Debug)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        let capacity = workers.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Submit a task without waiting for a free slot.
    pub fn submit<F, T>(&self, task: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            task.await
        })
    }

    /// Wait for every handle. Results come back in submission order; a task that
    /// panicked yields `None`.
    pub async fn join<T>(handles: Vec<JoinHandle<T>>) -> Vec<Option<T>> {
        join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.ok())
            .collect()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

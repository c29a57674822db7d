use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info, warn};
use tokio::sync::oneshot;

use crate::error::WorkerError;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Fixed set of OS threads for blocking work (geocoding, rendering,
/// archive packaging).
///
/// Callers hand in a closure and await its result; the async side never
/// blocks while a worker is busy.
pub struct WorkerPool {
    task_sender: Sender<Task>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn new(worker_count: usize) -> Result<Self, WorkerError> {
        if worker_count == 0 {
            return Err(WorkerError::SpawnFailed(
                "worker_count must be > 0".to_string(),
            ));
        }

        let (task_sender, task_receiver) = unbounded::<Task>();
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let task_rx = task_receiver.clone();
            let shutdown_flag = Arc::clone(&shutdown);

            let spawned = thread::Builder::new()
                .name(format!("mapposter-worker-{}", worker_id))
                .spawn(move || run_worker(worker_id, task_rx, shutdown_flag));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    shutdown.store(true, Ordering::Relaxed);
                    return Err(WorkerError::SpawnFailed(e.to_string()));
                }
            }
        }

        info!("Started {} workers", worker_count);

        Ok(Self {
            task_sender,
            workers,
            shutdown,
        })
    }

    /// Runs `task` on a worker thread and resolves with its return value.
    ///
    /// A panic inside `task` is contained to the task and surfaces as
    /// [`WorkerError::TaskPanicked`]; the worker keeps serving.
    pub async fn execute<F, T>(&self, task: F) -> Result<T, WorkerError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(WorkerError::ChannelClosed);
        }

        let (result_tx, result_rx) = oneshot::channel();
        let boxed: Task = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(task));
            // Receiver may be gone if the caller stopped waiting.
            let _ = result_tx.send(outcome);
        });

        self.task_sender
            .send(boxed)
            .map_err(|_| WorkerError::ChannelClosed)?;

        match result_rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(WorkerError::TaskPanicked),
            Err(_) => Err(WorkerError::ChannelClosed),
        }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    pub fn wait(self) {
        // Drop sender to signal workers to exit
        drop(self.task_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }
}

fn run_worker(worker_id: usize, task_receiver: Receiver<Task>, shutdown: Arc<AtomicBool>) {
    debug!("Worker {} started", worker_id);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match task_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(task) => task(),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Worker {} task channel disconnected", worker_id);
                break;
            }
        }
    }

    if !task_receiver.is_empty() {
        warn!(
            "Worker {} stopped with {} queued task(s)",
            worker_id,
            task_receiver.len()
        );
    }
    debug!("Worker {} stopped", worker_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_worker_pool_creation() {
        let pool = WorkerPool::new(2).unwrap();
        assert_eq!(pool.size(), 2);
        assert!(!pool.is_shutdown());

        pool.shutdown();
        assert!(pool.is_shutdown());

        pool.wait();
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(
            WorkerPool::new(0),
            Err(WorkerError::SpawnFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_execute_returns_value() {
        let pool = WorkerPool::new(2).unwrap();

        let value = pool.execute(|| 21 * 2).await.unwrap();
        assert_eq!(value, 42);

        pool.shutdown();
        pool.wait();
    }

    #[tokio::test]
    async fn test_execute_runs_off_the_caller_thread() {
        let pool = WorkerPool::new(1).unwrap();

        let name = pool
            .execute(|| thread::current().name().map(str::to_string))
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("mapposter-worker-0"));

        pool.shutdown();
        pool.wait();
    }

    #[tokio::test]
    async fn test_panicking_task_does_not_kill_worker() {
        let pool = WorkerPool::new(1).unwrap();

        let result: Result<(), WorkerError> = pool.execute(|| panic!("boom")).await;
        assert!(matches!(result, Err(WorkerError::TaskPanicked)));

        // The single worker is still serving.
        let value = pool.execute(|| "still alive").await.unwrap();
        assert_eq!(value, "still alive");

        pool.shutdown();
        pool.wait();
    }

    #[tokio::test]
    async fn test_concurrent_tasks_all_complete() {
        let pool = Arc::new(WorkerPool::new(3).unwrap());
        let counter = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let pool = Arc::clone(&pool);
            let counter = Arc::clone(&counter);
            handles.push(tokio::spawn(async move {
                pool.execute(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_execute_after_shutdown_fails() {
        let pool = WorkerPool::new(1).unwrap();
        pool.shutdown();

        let result = pool.execute(|| 1).await;
        assert!(matches!(result, Err(WorkerError::ChannelClosed)));

        pool.wait();
    }
}

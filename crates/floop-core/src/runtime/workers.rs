//! Bounded background worker pool + graceful shutdown (spec §4.10, §5, §9).
//!
//! A fixed-capacity semaphore guards every fire-and-forget task (auto-backup,
//! reinforcement bookkeeping, PageRank refresh, Hebbian updates). A task that
//! would overflow the pool is dropped with a warning, never queued. Every
//! worker observes a closable `done` signal and must not touch a closed
//! store after it fires.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Semaphore};

pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    // `watch` (not `Notify`) so a task that subscribes before shutdown but
    // doesn't poll its `select!` arm until after `shutdown()` has already
    // fired still observes the change — `Notify::notify_waiters` only wakes
    // tasks already parked in `.notified()`, and a freshly `tokio::spawn`ed
    // task may not have reached its `select!` yet.
    done: watch::Sender<bool>,
    closed: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn new(capacity: usize) -> Self {
        let (done, _) = watch::channel(false);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity.max(1))),
            done,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns `true` the task was spawned, `false` if the pool was full and
    /// the task was dropped (caller should `tracing::warn!`).
    pub fn spawn<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        let Ok(permit) = Arc::clone(&self.semaphore).try_acquire_owned() else {
            return false;
        };
        let mut done = self.done.subscribe();
        tokio::spawn(async move {
            let _permit = permit;
            tokio::select! {
                _ = task => {}
                _ = done.changed() => {}
            }
        });
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Idempotent close: signals `done` to every in-flight worker, including
    /// ones that haven't started polling their `select!` yet.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.done.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn pool_drops_tasks_beyond_capacity() {
        let pool = WorkerPool::new(1);
        let counter = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(tokio::sync::Notify::new());

        let c1 = Arc::clone(&counter);
        let g1 = Arc::clone(&gate);
        let spawned_first = pool.spawn(async move {
            g1.notified().await;
            c1.fetch_add(1, Ordering::SeqCst);
        });
        assert!(spawned_first);

        let c2 = Arc::clone(&counter);
        let spawned_second = pool.spawn(async move {
            c2.fetch_add(1, Ordering::SeqCst);
        });
        assert!(!spawned_second);

        gate.notify_waiters();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let pool = WorkerPool::new(2);
        pool.shutdown();
        pool.shutdown();
        assert!(pool.is_closed());
    }
}

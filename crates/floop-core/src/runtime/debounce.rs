//! Generic reset-on-call debounce timer (spec §4.10, §5).
//!
//! A burst of `trigger()` calls within the window coalesces into a single
//! delayed execution of the most recently supplied closure.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;

pub struct Debouncer {
    window: Duration,
    generation: Arc<AtomicU64>,
    inner: Arc<AsyncMutex<()>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            generation: Arc::new(AtomicU64::new(0)),
            inner: Arc::new(AsyncMutex::new(())),
        }
    }

    /// Schedule `task` to run after the debounce window, cancelling any
    /// previously-scheduled invocation that hasn't fired yet.
    pub fn trigger<F>(&self, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);
        let inner = Arc::clone(&self.inner);
        let window = self.window;

        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if generation.load(Ordering::SeqCst) != my_generation {
                return; // superseded by a later trigger
            }
            let _guard = inner.lock().await;
            if generation.load(Ordering::SeqCst) == my_generation {
                task.await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn burst_of_triggers_runs_once() {
        let debouncer = Debouncer::new(Duration::from_millis(20));
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let c = Arc::clone(&counter);
            debouncer.trigger(async move {
                c.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}

//! Detached background work.
//!
//! Revalidations and deferred sync routines run here. Each task has its own
//! error boundary: failures are logged and never reach the event that
//! spawned them. Callers never join these tasks; `settle` exists so tests and
//! shutdown can wait for them.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use harbor_core::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
pub struct Background {
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Background {
    pub fn new() -> Self {
        Self::default()
    }

    fn tasks(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Spawn a detached task. Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, label: &'static str, task: F)
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            match task.await {
                Ok(()) => tracing::trace!(task = label, "background task finished"),
                Err(e) => tracing::warn!(task = label, "background task failed: {e}"),
            }
        });

        let mut tasks = self.tasks();
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    /// Tasks spawned and not yet finished.
    pub fn pending(&self) -> usize {
        self.tasks().iter().filter(|task| !task.is_finished()).count()
    }

    /// Wait until every task, including ones spawned meanwhile, has finished.
    pub async fn settle(&self) {
        loop {
            let batch = std::mem::take(&mut *self.tasks());
            if batch.is_empty() {
                return;
            }
            for task in batch {
                if let Err(e) = task.await
                    && e.is_panic()
                {
                    tracing::error!("background task panicked: {e}");
                }
            }
        }
    }

    /// Abort everything still running.
    pub fn shutdown(&self) {
        let batch = std::mem::take(&mut *self.tasks());
        if !batch.is_empty() {
            tracing::info!(count = batch.len(), "aborting background tasks");
        }
        for task in batch {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_settle_waits_for_tasks() {
        let background = Background::new();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let counter = counter.clone();
            background.spawn("count", async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        background.settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(background.pending(), 0);
    }

    #[tokio::test]
    async fn test_failures_are_contained() {
        let background = Background::new();
        background.spawn("fail", async { Err(Error::Network("offline".into())) });
        background.settle().await;
        assert_eq!(background.pending(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_aborts() {
        let background = Background::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let task_counter = counter.clone();
        background.spawn("slow", async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            task_counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        background.shutdown();
        background.settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}

//! Bounded pool for upstream and CPU-bound work.
//!
//! At most `max_concurrent` calls run at once. Up to `max_queued` more may
//! wait for a slot; beyond that a call fails fast with
//! [`UpstreamError::Saturated`]. Every call observes a cancellation token.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rh_domain::config::PoolConfig;
use rh_domain::error::{UpstreamError, UpstreamResult};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct UpstreamPool {
    permits: Arc<Semaphore>,
    max_queued: usize,
    waiting: AtomicUsize,
}

/// Decrements the waiting counter however the wait ends.
struct QueueSlot<'a>(&'a AtomicUsize);

impl Drop for QueueSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl UpstreamPool {
    pub fn new(cfg: &PoolConfig) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(cfg.max_concurrent.max(1))),
            max_queued: cfg.max_queued,
            waiting: AtomicUsize::new(0),
        }
    }

    /// Slots free right now.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    async fn acquire(&self, cancel: &CancellationToken) -> UpstreamResult<OwnedSemaphorePermit> {
        if let Ok(permit) = self.permits.clone().try_acquire_owned() {
            return Ok(permit);
        }

        let queued = self.waiting.fetch_add(1, Ordering::AcqRel);
        let _slot = QueueSlot(&self.waiting);
        if queued >= self.max_queued {
            tracing::warn!(waiting = queued, "upstream pool saturated");
            return Err(UpstreamError::Saturated);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(UpstreamError::Cancelled),
            permit = self.permits.clone().acquire_owned() => {
                permit.map_err(|_| UpstreamError::Saturated)
            }
        }
    }

    /// Run an upstream future under a permit.
    pub async fn run<T, F>(&self, cancel: &CancellationToken, fut: F) -> UpstreamResult<T>
    where
        F: Future<Output = UpstreamResult<T>>,
    {
        if cancel.is_cancelled() {
            return Err(UpstreamError::Cancelled);
        }
        let _permit = self.acquire(cancel).await?;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(UpstreamError::Cancelled),
            out = fut => out,
        }
    }

    /// Run CPU-bound work on the blocking pool under a permit.
    pub async fn run_blocking<T, F>(&self, cancel: &CancellationToken, f: F) -> UpstreamResult<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        if cancel.is_cancelled() {
            return Err(UpstreamError::Cancelled);
        }
        let permit = self.acquire(cancel).await?;
        let handle = tokio::task::spawn_blocking(move || {
            let out = f();
            drop(permit);
            out
        });
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(UpstreamError::Cancelled),
            joined = handle => joined.map_err(|e| UpstreamError::Transport(format!("blocking task failed: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn pool(max_concurrent: usize, max_queued: usize) -> Arc<UpstreamPool> {
        Arc::new(UpstreamPool::new(&PoolConfig {
            max_concurrent,
            max_queued,
        }))
    }

    #[tokio::test]
    async fn runs_work_and_releases_permit() {
        let pool = pool(1, 0);
        let cancel = CancellationToken::new();
        let out = pool.run(&cancel, async { Ok::<_, UpstreamError>(7) }).await;
        assert_eq!(out, Ok(7));
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn full_queue_fails_fast() {
        let pool = pool(1, 0);
        let cancel = CancellationToken::new();
        let gate = Arc::new(tokio::sync::Notify::new());

        let holder = {
            let pool = pool.clone();
            let cancel = cancel.clone();
            let gate = gate.clone();
            tokio::spawn(async move {
                pool.run(&cancel, async move {
                    gate.notified().await;
                    Ok::<_, UpstreamError>(())
                })
                .await
            })
        };
        while pool.available() > 0 {
            tokio::task::yield_now().await;
        }

        let rejected = pool.run(&cancel, async { Ok::<_, UpstreamError>(()) }).await;
        assert_eq!(rejected, Err(UpstreamError::Saturated));

        gate.notify_one();
        assert_eq!(holder.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn queued_call_waits_for_a_slot() {
        let pool = pool(1, 1);
        let cancel = CancellationToken::new();
        let first = {
            let pool = pool.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                pool.run(&cancel, async {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    Ok::<_, UpstreamError>(1)
                })
                .await
            })
        };
        while pool.available() > 0 {
            tokio::task::yield_now().await;
        }
        let second = pool.run(&cancel, async { Ok::<_, UpstreamError>(2) }).await;
        assert_eq!(second, Ok(2));
        assert_eq!(first.await.unwrap(), Ok(1));
    }

    #[tokio::test]
    async fn cancel_interrupts_running_call() {
        let pool = pool(2, 2);
        let cancel = CancellationToken::new();
        let child = cancel.child_token();
        let task = {
            let pool = pool.clone();
            tokio::spawn(async move {
                pool.run(&child, async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok::<_, UpstreamError>(())
                })
                .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
        assert_eq!(task.await.unwrap(), Err(UpstreamError::Cancelled));
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn blocking_work_runs_off_the_runtime() {
        let pool = pool(1, 0);
        let cancel = CancellationToken::new();
        let sum = pool.run_blocking(&cancel, || (1..=10).sum::<u32>()).await;
        assert_eq!(sum, Ok(55));
    }

    #[tokio::test]
    async fn already_cancelled_does_no_work() {
        let pool = pool(1, 0);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let out = pool.run(&cancel, async { Ok::<_, UpstreamError>(()) }).await;
        assert_eq!(out, Err(UpstreamError::Cancelled));
    }

    #[tokio::test]
    async fn cancel_while_queued_stops_waiting() {
        let pool = pool(1, 1);
        let gate = Arc::new(tokio::sync::Notify::new());
        let holder = {
            let pool = pool.clone();
            let gate = gate.clone();
            tokio::spawn(async move {
                pool.run(&CancellationToken::new(), async move {
                    gate.notified().await;
                    Ok::<_, UpstreamError>(())
                })
                .await
            })
        };
        while pool.available() > 0 {
            tokio::task::yield_now().await;
        }

        let cancel = CancellationToken::new();
        let waiter = {
            let pool = pool.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { pool.run(&cancel, async { Ok::<_, UpstreamError>(()) }).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
        assert_eq!(waiter.await.unwrap(), Err(UpstreamError::Cancelled));

        gate.notify_one();
        assert_eq!(holder.await.unwrap(), Ok(()));
    }
}

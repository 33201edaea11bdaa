//! Counting admission gate for benchmark jobs.
//!
//! At most `limit` futures passed to [`ConcurrencyLimiter::run`] make
//! progress at once. Waiters are admitted in arrival order because tokio's
//! semaphore is fair.

use keepsake::{KeepsakeError, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl ConcurrencyLimiter {
    pub fn new(limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(KeepsakeError::Config(
                "concurrency limit must be at least 1".into(),
            ));
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Permits not currently held.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a slot, run `fut` to completion, release the slot.
    pub async fn run<F: Future>(&self, fut: F) -> F::Output {
        // The semaphore is never closed.
        let _permit = self.semaphore.acquire().await.ok();
        fut.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn zero_limit_is_rejected() {
        assert!(matches!(
            ConcurrencyLimiter::new(0),
            Err(KeepsakeError::Config(_))
        ));
    }

    #[tokio::test]
    async fn never_exceeds_limit() {
        let limiter = ConcurrencyLimiter::new(3).unwrap();
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        let jobs = (0..10).map(|_| {
            limiter.run(async {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            })
        });
        futures::future::join_all(jobs).await;

        assert_eq!(peak.load(Ordering::SeqCst), 3);
        assert_eq!(limiter.available(), 3);
    }

    #[tokio::test]
    async fn waiters_are_admitted_in_order() {
        let limiter = ConcurrencyLimiter::new(1).unwrap();
        let order = Mutex::new(Vec::new());

        let jobs = (0..5).map(|i| {
            let limiter = &limiter;
            let order = &order;
            async move {
                limiter
                    .run(async move {
                        order.lock().unwrap().push(i);
                        tokio::task::yield_now().await;
                    })
                    .await
            }
        });
        futures::future::join_all(jobs).await;

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn returns_future_output() {
        let limiter = ConcurrencyLimiter::new(2).unwrap();
        assert_eq!(limiter.run(async { 41 + 1 }).await, 42);
    }
}

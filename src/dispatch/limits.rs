//! Admission control for the dispatcher
//!
//! Two process-wide gates with different scopes: a semaphore bounding
//! concurrent dispatches, acquired up front, and a token-bucket rate limiter
//! bounding outbound attempts per second, consumed only when a dispatch is
//! about to go upstream. Cache hits never touch the rate budget. The
//! concurrency slot is held by an RAII permit, so it releases exactly once on
//! every exit path, including cancellation.

use governor::clock::DefaultClock;
use governor::state::InMemoryState;
use governor::state::direct::NotKeyed;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

pub struct AdmissionControl {
    semaphore: Arc<Semaphore>,
    limiter: DirectRateLimiter,
}

impl AdmissionControl {
    pub fn new(max_concurrency: usize, rate_limit_per_sec: u32) -> Self {
        let per_sec =
            NonZeroU32::new(rate_limit_per_sec.max(1)).expect("rate limit is non-zero after max");

        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            limiter: RateLimiter::direct(Quota::per_second(per_sec)),
        }
    }

    /// Wait for a concurrency slot; dropping the permit frees it
    pub async fn admit(&self) -> OwnedSemaphorePermit {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("admission semaphore is never closed")
    }

    /// Wait for outbound rate budget; returns true when the dispatch was
    /// delayed
    pub async fn acquire_rate_budget(&self) -> bool {
        let delayed = self.limiter.check().is_err();
        if delayed {
            self.limiter.until_ready().await;
        }
        delayed
    }

    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_permit_released_on_drop() {
        let control = AdmissionControl::new(2, 1000);

        let first = control.admit().await;
        let second = control.admit().await;
        assert_eq!(control.available_slots(), 0);

        drop(first);
        assert_eq!(control.available_slots(), 1);
        drop(second);
        assert_eq!(control.available_slots(), 2);
    }

    #[tokio::test]
    async fn test_concurrency_bound_blocks_third() {
        let control = Arc::new(AdmissionControl::new(2, 1000));

        let _a = control.admit().await;
        let _b = control.admit().await;

        let control2 = Arc::clone(&control);
        let blocked = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            async move { control2.admit().await },
        )
        .await;
        assert!(blocked.is_err());
    }

    #[tokio::test]
    async fn test_rate_budget_delays_burst() {
        let control = AdmissionControl::new(16, 1);

        assert!(!control.acquire_rate_budget().await);

        // Second acquisition in the same second exceeds the budget
        let start = std::time::Instant::now();
        let delayed = tokio::time::timeout(
            std::time::Duration::from_secs(3),
            control.acquire_rate_budget(),
        )
        .await
        .expect("budget should eventually free up");
        assert!(delayed);
        assert!(start.elapsed() >= std::time::Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_admit_does_not_touch_rate_budget() {
        let control = AdmissionControl::new(16, 1);

        // Concurrency admissions leave the full outbound budget available
        for _ in 0..5 {
            drop(control.admit().await);
        }
        assert!(!control.acquire_rate_budget().await);
    }
}

//! Token bucket rate limiting for outbound lookup calls.
//!
//! All workers of a run share one [`TokenBucket`]. The [`RateBudget`] is
//! injected by the caller so the server, the CLI and tests each pick their
//! own limits instead of sharing process-global state.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Rate limit for outbound calls: at most `capacity` acquisitions within
/// any window of length `period`, once the initial burst has drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateBudget {
    /// Maximum number of tokens the bucket holds.
    pub capacity: u32,
    /// Time to refill an empty bucket back to `capacity`.
    pub period: Duration,
}

impl RateBudget {
    /// Creates a budget of `capacity` calls per `period`.
    #[must_use]
    pub const fn new(capacity: u32, period: Duration) -> Self {
        Self { capacity, period }
    }
}

/// Shared token bucket. Starts full and refills continuously at
/// `capacity / period` tokens per second, capped at `capacity`.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    refreshed: Instant,
}

impl TokenBucket {
    /// Creates a full bucket for `budget`. A zero period disables the
    /// limit entirely; a zero capacity is treated as one so the bucket
    /// can always make progress.
    #[must_use]
    pub fn new(budget: RateBudget) -> Self {
        let capacity = f64::from(budget.capacity.max(1));
        let refill_per_sec = if budget.period.is_zero() {
            f64::INFINITY
        } else {
            capacity / budget.period.as_secs_f64()
        };
        Self {
            capacity,
            refill_per_sec,
            state: Mutex::new(BucketState {
                tokens: capacity,
                refreshed: Instant::now(),
            }),
        }
    }

    /// Waits until a token is available and consumes it.
    ///
    /// The lock is held only to inspect and update the token count; the
    /// wait itself happens outside the critical section so workers queue
    /// on time, not on the mutex.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                self.refill(&mut state);
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - state.tokens) / self.refill_per_sec)
            };
            tokio::time::sleep(wait).await;
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        if self.refill_per_sec.is_infinite() {
            state.tokens = self.capacity;
        } else {
            let elapsed = now.duration_since(state.refreshed).as_secs_f64();
            state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        }
        state.refreshed = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(capacity: u32, period_ms: u64) -> RateBudget {
        RateBudget::new(capacity, Duration::from_millis(period_ms))
    }

    #[tokio::test(start_paused = true)]
    async fn initial_burst_is_immediate() {
        let bucket = TokenBucket::new(budget(5, 5_000));
        let start = Instant::now();
        for _ in 0..5 {
            bucket.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn next_acquisition_after_the_burst_waits_for_refill() {
        let bucket = TokenBucket::new(budget(5, 5_000));
        for _ in 0..5 {
            bucket.acquire().await;
        }
        let start = Instant::now();
        bucket.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn warmed_up_window_never_exceeds_capacity() {
        let capacity = 3_usize;
        let period = Duration::from_millis(3_000);
        let bucket = TokenBucket::new(RateBudget::new(3, period));

        let mut timestamps = Vec::new();
        for _ in 0..12 {
            bucket.acquire().await;
            timestamps.push(Instant::now());
        }

        // The initial burst is allowed to be instantaneous; the window
        // property holds from the first post-burst acquisition on.
        let warmed = &timestamps[capacity..];
        for (earlier, later) in warmed.iter().zip(warmed.iter().skip(capacity)) {
            assert!(later.duration_since(*earlier) >= period);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn idle_time_does_not_accumulate_beyond_capacity() {
        let bucket = TokenBucket::new(budget(2, 1_000));
        tokio::time::sleep(Duration::from_secs(60)).await;
        for _ in 0..2 {
            bucket.acquire().await;
        }
        let start = Instant::now();
        bucket.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_never_blocks() {
        let bucket = TokenBucket::new(budget(1, 0));
        let start = Instant::now();
        for _ in 0..100 {
            bucket.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}

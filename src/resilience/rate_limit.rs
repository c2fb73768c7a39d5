//! Per-pool token bucket rate limiter.
//!
//! Tokens refill continuously at `refill_rate` per second up to `capacity`.
//! Every refill-and-take happens inside one short critical section, so many
//! tasks can hammer the same pool's bucket concurrently. The limiter never
//! blocks; callers decide whether to wait using [`TokenBucketLimiter::wait_time`].

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Mutable bucket state.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn refill(&mut self, capacity: f64, refill_rate: f64) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_refill = now;
    }
}

/// A token bucket guarding a single pool.
#[derive(Debug)]
pub struct TokenBucketLimiter {
    capacity: f64,
    refill_rate: f64,
    bucket: Mutex<TokenBucket>,
}

impl TokenBucketLimiter {
    /// Create a full bucket holding `capacity` tokens, refilling at
    /// `refill_rate` tokens per second.
    pub fn new(capacity: f64, refill_rate: f64) -> Self {
        Self {
            capacity,
            refill_rate,
            bucket: Mutex::new(TokenBucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Bucket sized from a per-minute rate and a burst fraction of that rate.
    pub fn per_minute(rate_per_minute: u32, burst_fraction: f64) -> Self {
        let rate = f64::from(rate_per_minute);
        let capacity = (rate * burst_fraction).max(1.0);
        Self::new(capacity, rate / 60.0)
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    /// Take `n` tokens if available.
    pub fn acquire(&self, n: f64) -> bool {
        let mut bucket = self.bucket.lock().expect("token bucket mutex poisoned");
        bucket.refill(self.capacity, self.refill_rate);

        if bucket.tokens >= n {
            bucket.tokens -= n;
            true
        } else {
            false
        }
    }

    /// Time until `n` tokens will be available. Zero if they already are.
    pub fn wait_time(&self, n: f64) -> Duration {
        let mut bucket = self.bucket.lock().expect("token bucket mutex poisoned");
        bucket.refill(self.capacity, self.refill_rate);

        if bucket.tokens >= n {
            return Duration::ZERO;
        }
        if self.refill_rate <= 0.0 {
            return Duration::MAX;
        }
        Duration::from_secs_f64((n - bucket.tokens) / self.refill_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_burst_then_refill() {
        let limiter = TokenBucketLimiter::new(10.0, 1.0);

        for _ in 0..10 {
            assert!(limiter.acquire(1.0));
        }
        assert!(!limiter.acquire(1.0));
        assert_eq!(limiter.wait_time(1.0), Duration::from_secs(1));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(limiter.acquire(1.0));
        assert!(!limiter.acquire(1.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_caps_at_capacity() {
        let limiter = TokenBucketLimiter::new(3.0, 1.0);
        tokio::time::advance(Duration::from_secs(60)).await;
        for _ in 0..3 {
            assert!(limiter.acquire(1.0));
        }
        assert!(!limiter.acquire(1.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_time_for_partial_tokens() {
        let limiter = TokenBucketLimiter::new(2.0, 4.0);
        assert!(limiter.acquire(2.0));
        assert_eq!(limiter.wait_time(1.0), Duration::from_millis(250));
        assert_eq!(limiter.wait_time(2.0), Duration::from_millis(500));
    }

    #[test]
    fn test_per_minute_sizing() {
        let limiter = TokenBucketLimiter::per_minute(600, 0.1);
        assert_eq!(limiter.capacity(), 60.0);
        assert_eq!(limiter.refill_rate(), 10.0);

        // Tiny rates still get a single token of burst.
        let limiter = TokenBucketLimiter::per_minute(5, 0.1);
        assert_eq!(limiter.capacity(), 1.0);
    }

    #[test]
    fn test_concurrent_acquire_never_overdraws() {
        let limiter = Arc::new(TokenBucketLimiter::new(100.0, 0.0));
        let granted = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                let granted = granted.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        if limiter.acquire(1.0) {
                            granted.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(granted.load(Ordering::Relaxed), 100);
    }
}

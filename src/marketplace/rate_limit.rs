//! Minimum-gap rate limiter owned by a single client instance.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum gap between consecutive requests.
///
/// The lock is held across the wait, so concurrent callers queue up and are
/// released one gap apart.
#[derive(Debug)]
pub struct RateLimiter {
    min_gap: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_gap: Duration) -> Self {
        Self {
            min_gap,
            last_request: Mutex::new(None),
        }
    }

    /// Wait until a request may be sent, then record it as sent.
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_gap {
                tokio::time::sleep(self.min_gap - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_request_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        let started = std::time::Instant::now();
        limiter.wait().await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_consecutive_requests_are_spaced() {
        let limiter = RateLimiter::new(Duration::from_millis(40));
        let started = std::time::Instant::now();
        limiter.wait().await;
        limiter.wait().await;
        limiter.wait().await;
        assert!(started.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_instances_do_not_share_state() {
        let a = RateLimiter::new(Duration::from_secs(60));
        let b = RateLimiter::new(Duration::from_secs(60));
        a.wait().await;
        let started = std::time::Instant::now();
        b.wait().await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}

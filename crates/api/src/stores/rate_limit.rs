//! Rate limiting on top of the expiring key/value store.

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;

use super::kv::ExpiringKv;

/// Rate limiter trait for checking and incrementing counters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one hit against `key` in a fixed window of `window` starting at
    /// the first hit, and report whether the count is still within `limit`.
    async fn check(&self, key: &str, limit: i64, window: Duration) -> Result<RateLimitResult>;
}

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Under the limit, includes current count.
    Allowed(i64),
    /// Over the limit, includes current count.
    Exceeded(i64),
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed(_))
    }
}

/// RateLimiter counting hits in the expiring key/value store.
#[derive(Clone)]
pub struct KvRateLimiter {
    kv: Arc<dyn ExpiringKv>,
}

impl KvRateLimiter {
    pub fn new(kv: Arc<dyn ExpiringKv>) -> Self {
        Self { kv }
    }
}

#[async_trait]
impl RateLimiter for KvRateLimiter {
    async fn check(&self, key: &str, limit: i64, window: Duration) -> Result<RateLimitResult> {
        let count = self.kv.increment(key, window).await?;

        if count > limit {
            Ok(RateLimitResult::Exceeded(count))
        } else {
            Ok(RateLimitResult::Allowed(count))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::kv::MemoryKv;

    #[tokio::test(start_paused = true)]
    async fn allows_up_to_limit_then_recovers_after_window() {
        let limiter = KvRateLimiter::new(Arc::new(MemoryKv::new()));
        let window = Duration::from_secs(3600);

        for n in 1..=5 {
            assert_eq!(
                limiter.check("ratelimit:test", 5, window).await.unwrap(),
                RateLimitResult::Allowed(n)
            );
        }
        let result = limiter.check("ratelimit:test", 5, window).await.unwrap();
        assert_eq!(result, RateLimitResult::Exceeded(6));
        assert!(!result.is_allowed());

        tokio::time::advance(window).await;

        assert!(limiter.check("ratelimit:test", 5, window).await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn keys_are_counted_separately() {
        let limiter = KvRateLimiter::new(Arc::new(MemoryKv::new()));
        let window = Duration::from_secs(60);

        limiter.check("ratelimit:a", 1, window).await.unwrap();

        assert!(!limiter.check("ratelimit:a", 1, window).await.unwrap().is_allowed());
        assert!(limiter.check("ratelimit:b", 1, window).await.unwrap().is_allowed());
    }
}

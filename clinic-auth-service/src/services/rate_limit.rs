use std::sync::Arc;

use crate::config::RateLimitConfig;
use crate::services::redis::AuthCache;

/// Fixed-window request counter keyed by client IP and endpoint.
#[derive(Clone)]
pub struct RateLimitService {
    cache: Arc<dyn AuthCache>,
    max_requests: i64,
    window_seconds: i64,
}

impl RateLimitService {
    pub fn new(cache: Arc<dyn AuthCache>, config: &RateLimitConfig) -> Self {
        Self {
            cache,
            max_requests: config.max_requests,
            window_seconds: config.window_seconds,
        }
    }

    /// Counts this request and decides whether it may proceed. Fails open:
    /// when the counter is unreachable the request is admitted and the
    /// durable lockout still bounds per-account guessing.
    pub async fn admit(&self, client_ip: &str, endpoint: &str) -> bool {
        let key = format!("ratelimit:{}:{}", client_ip, endpoint);
        match self.cache.incr(&key, self.window_seconds).await {
            Ok(count) => count <= self.max_requests,
            Err(e) => {
                tracing::warn!(error = %e, endpoint, "Rate limit counter unavailable, admitting request");
                true
            }
        }
    }

    pub fn window_seconds(&self) -> i64 {
        self.window_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::redis::{DisabledCache, FailingCache, MockCache};

    fn limiter(cache: Arc<dyn AuthCache>) -> RateLimitService {
        RateLimitService::new(
            cache,
            &RateLimitConfig {
                max_requests: 5,
                window_seconds: 900,
            },
        )
    }

    #[tokio::test]
    async fn admits_up_to_the_limit_then_denies() {
        let limiter = limiter(Arc::new(MockCache::new()));
        for _ in 0..5 {
            assert!(limiter.admit("10.0.0.1", "login").await);
        }
        assert!(!limiter.admit("10.0.0.1", "login").await);
        assert!(!limiter.admit("10.0.0.1", "login").await);
    }

    #[tokio::test]
    async fn counters_are_scoped_per_ip() {
        let limiter = limiter(Arc::new(MockCache::new()));
        for _ in 0..6 {
            limiter.admit("10.0.0.1", "login").await;
        }
        assert!(limiter.admit("10.0.0.2", "login").await);
    }

    #[tokio::test]
    async fn counters_are_scoped_per_endpoint() {
        let limiter = limiter(Arc::new(MockCache::new()));
        for _ in 0..6 {
            limiter.admit("10.0.0.1", "login").await;
        }
        assert!(limiter.admit("10.0.0.1", "signup").await);
    }

    #[tokio::test]
    async fn fails_open_when_the_counter_errors() {
        let limiter = limiter(Arc::new(FailingCache));
        for _ in 0..20 {
            assert!(limiter.admit("10.0.0.1", "login").await);
        }
    }

    #[tokio::test]
    async fn disabled_cache_never_limits() {
        let limiter = limiter(Arc::new(DisabledCache));
        for _ in 0..20 {
            assert!(limiter.admit("10.0.0.1", "login").await);
        }
    }
}

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Client;

/// Per-operation deadline so a wedged Redis cannot stall request handling.
const OP_TIMEOUT: Duration = Duration::from_secs(2);

/// Cache operations used by session mirroring and rate limiting. Callers
/// treat every error as "cache unavailable" and continue on the durable
/// path, so implementations never need to retry.
#[async_trait]
pub trait AuthCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error>;
    async fn set(&self, key: &str, value: &str, ttl_seconds: i64) -> Result<(), anyhow::Error>;
    async fn delete(&self, key: &str) -> Result<(), anyhow::Error>;
    /// Increments a counter, arming the expiry window if the key does
    /// not already carry one. Returns the post-increment count.
    async fn incr(&self, key: &str, window_seconds: i64) -> Result<i64, anyhow::Error>;
    async fn set_add(&self, key: &str, member: &str, ttl_seconds: i64)
        -> Result<(), anyhow::Error>;
    async fn set_remove(&self, key: &str, member: &str) -> Result<(), anyhow::Error>;
    async fn set_members(&self, key: &str) -> Result<Vec<String>, anyhow::Error>;
    async fn health_check(&self) -> Result<(), anyhow::Error>;
}

/// Redis-backed cache using a multiplexed connection manager.
pub struct RedisCache {
    _client: Client,
    manager: ConnectionManager,
}

impl RedisCache {
    pub async fn new(redis_url: &str) -> Result<Self, anyhow::Error> {
        let client = Client::open(redis_url)
            .map_err(|e| anyhow::anyhow!("Invalid Redis URL: {}", e))?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to Redis: {}", e))?;
        tracing::info!("Connected to Redis");
        Ok(Self {
            _client: client,
            manager,
        })
    }

    async fn call<T>(
        &self,
        label: &str,
        op: impl Future<Output = Result<T, redis::RedisError>> + Send,
    ) -> Result<T, anyhow::Error> {
        match tokio::time::timeout(OP_TIMEOUT, op).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(anyhow::anyhow!("Redis {} failed: {}", label, e)),
            Err(_) => Err(anyhow::anyhow!(
                "Redis {} timed out after {:?}",
                label,
                OP_TIMEOUT
            )),
        }
    }
}

#[async_trait]
impl AuthCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        let mut conn = self.manager.clone();
        let key = key.to_string();
        self.call("GET", async move {
            redis::cmd("GET").arg(&key).query_async(&mut conn).await
        })
        .await
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: i64) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        let key = key.to_string();
        let value = value.to_string();
        self.call("SET", async move {
            redis::cmd("SET")
                .arg(&key)
                .arg(&value)
                .arg("EX")
                .arg(ttl_seconds)
                .query_async(&mut conn)
                .await
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        let key = key.to_string();
        self.call("DEL", async move {
            redis::cmd("DEL").arg(&key).query_async(&mut conn).await
        })
        .await
    }

    async fn incr(&self, key: &str, window_seconds: i64) -> Result<i64, anyhow::Error> {
        let mut conn = self.manager.clone();
        let key = key.to_string();
        self.call("INCR", async move {
            let count: i64 = redis::cmd("INCR").arg(&key).query_async(&mut conn).await?;
            // NX only arms the window when the key has no TTL yet, so a
            // counter stranded by a drop between INCR and EXPIRE is
            // repaired by the next increment instead of living forever.
            let _: () = redis::cmd("EXPIRE")
                .arg(&key)
                .arg(window_seconds)
                .arg("NX")
                .query_async(&mut conn)
                .await?;
            Ok(count)
        })
        .await
    }

    async fn set_add(
        &self,
        key: &str,
        member: &str,
        ttl_seconds: i64,
    ) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        let key = key.to_string();
        let member = member.to_string();
        self.call("SADD", async move {
            let _: () = redis::cmd("SADD")
                .arg(&key)
                .arg(&member)
                .query_async(&mut conn)
                .await?;
            // The set only needs to outlive its longest-lived member.
            let _: () = redis::cmd("EXPIRE")
                .arg(&key)
                .arg(ttl_seconds)
                .query_async(&mut conn)
                .await?;
            Ok(())
        })
        .await
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        let key = key.to_string();
        let member = member.to_string();
        self.call("SREM", async move {
            redis::cmd("SREM")
                .arg(&key)
                .arg(&member)
                .query_async(&mut conn)
                .await
        })
        .await
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, anyhow::Error> {
        let mut conn = self.manager.clone();
        let key = key.to_string();
        self.call("SMEMBERS", async move {
            redis::cmd("SMEMBERS")
                .arg(&key)
                .query_async(&mut conn)
                .await
        })
        .await
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        self.call("PING", async move {
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(())
        })
        .await
    }
}

/// In-memory cache for tests. Counters never expire and TTLs are ignored,
/// which is sufficient for single-request assertions.
#[derive(Default)]
pub struct MockCache {
    entries: Mutex<HashMap<String, String>>,
    sets: Mutex<HashMap<String, HashSet<String>>>,
}

impl MockCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthCache for MockCache {
    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str, _ttl_seconds: i64) -> Result<(), anyhow::Error> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), anyhow::Error> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn incr(&self, key: &str, _window_seconds: i64) -> Result<i64, anyhow::Error> {
        let mut entries = self.entries.lock().unwrap();
        let count = entries
            .get(key)
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0)
            + 1;
        entries.insert(key.to_string(), count.to_string());
        Ok(count)
    }

    async fn set_add(
        &self,
        key: &str,
        member: &str,
        _ttl_seconds: i64,
    ) -> Result<(), anyhow::Error> {
        self.sets
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), anyhow::Error> {
        if let Some(set) = self.sets.lock().unwrap().get_mut(key) {
            set.remove(member);
        }
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, anyhow::Error> {
        Ok(self
            .sets
            .lock()
            .unwrap()
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

/// Cache that fails every operation. Used to exercise degraded paths.
pub struct FailingCache;

#[async_trait]
impl AuthCache for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, anyhow::Error> {
        Err(anyhow::anyhow!("cache unavailable"))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl_seconds: i64) -> Result<(), anyhow::Error> {
        Err(anyhow::anyhow!("cache unavailable"))
    }

    async fn delete(&self, _key: &str) -> Result<(), anyhow::Error> {
        Err(anyhow::anyhow!("cache unavailable"))
    }

    async fn incr(&self, _key: &str, _window_seconds: i64) -> Result<i64, anyhow::Error> {
        Err(anyhow::anyhow!("cache unavailable"))
    }

    async fn set_add(
        &self,
        _key: &str,
        _member: &str,
        _ttl_seconds: i64,
    ) -> Result<(), anyhow::Error> {
        Err(anyhow::anyhow!("cache unavailable"))
    }

    async fn set_remove(&self, _key: &str, _member: &str) -> Result<(), anyhow::Error> {
        Err(anyhow::anyhow!("cache unavailable"))
    }

    async fn set_members(&self, _key: &str) -> Result<Vec<String>, anyhow::Error> {
        Err(anyhow::anyhow!("cache unavailable"))
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        Err(anyhow::anyhow!("cache unavailable"))
    }
}

/// No-op cache used when REDIS_URL is not configured. Reads miss, writes
/// succeed silently, and counters stay at zero so rate limiting admits
/// everything. Health checks still report the tier as absent.
pub struct DisabledCache;

#[async_trait]
impl AuthCache for DisabledCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, anyhow::Error> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl_seconds: i64) -> Result<(), anyhow::Error> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<(), anyhow::Error> {
        Ok(())
    }

    async fn incr(&self, _key: &str, _window_seconds: i64) -> Result<i64, anyhow::Error> {
        Ok(0)
    }

    async fn set_add(
        &self,
        _key: &str,
        _member: &str,
        _ttl_seconds: i64,
    ) -> Result<(), anyhow::Error> {
        Ok(())
    }

    async fn set_remove(&self, _key: &str, _member: &str) -> Result<(), anyhow::Error> {
        Ok(())
    }

    async fn set_members(&self, _key: &str) -> Result<Vec<String>, anyhow::Error> {
        Ok(Vec::new())
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        Err(anyhow::anyhow!("cache disabled"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_cache_round_trips_entries() {
        let cache = MockCache::new();
        assert_eq!(cache.get("k").await.unwrap(), None);
        cache.set("k", "v", 60).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
        cache.delete("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn mock_cache_counts_increments() {
        let cache = MockCache::new();
        assert_eq!(cache.incr("c", 900).await.unwrap(), 1);
        assert_eq!(cache.incr("c", 900).await.unwrap(), 2);
        assert_eq!(cache.incr("other", 900).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn mock_cache_tracks_set_members() {
        let cache = MockCache::new();
        cache.set_add("s", "a", 60).await.unwrap();
        cache.set_add("s", "b", 60).await.unwrap();
        let mut members = cache.set_members("s").await.unwrap();
        members.sort();
        assert_eq!(members, vec!["a".to_string(), "b".to_string()]);

        cache.set_remove("s", "a").await.unwrap();
        assert_eq!(cache.set_members("s").await.unwrap(), vec!["b".to_string()]);
    }

    async fn redis_cache() -> RedisCache {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        RedisCache::new(&url).await.expect("Failed to connect to Redis")
    }

    #[tokio::test]
    #[ignore] // Requires running Redis
    async fn incr_rearms_the_window_on_a_counter_left_without_ttl() {
        let cache = redis_cache().await;
        let key = format!("ratelimit-test:{}", uuid::Uuid::new_v4());

        assert_eq!(cache.incr(&key, 900).await.unwrap(), 1);
        let mut conn = cache.manager.clone();
        let ttl: i64 = redis::cmd("TTL")
            .arg(&key)
            .query_async(&mut conn)
            .await
            .unwrap();
        assert!(ttl > 0 && ttl <= 900);

        // A counter stranded without expiry picks its window back up on
        // the next increment.
        let _: () = redis::cmd("PERSIST")
            .arg(&key)
            .query_async(&mut conn)
            .await
            .unwrap();
        assert_eq!(cache.incr(&key, 900).await.unwrap(), 2);
        let ttl: i64 = redis::cmd("TTL")
            .arg(&key)
            .query_async(&mut conn)
            .await
            .unwrap();
        assert!(ttl > 0 && ttl <= 900);

        cache.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn disabled_cache_misses_and_counts_nothing() {
        let cache = DisabledCache;
        cache.set("k", "v", 60).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert_eq!(cache.incr("c", 900).await.unwrap(), 0);
        assert!(cache.health_check().await.is_err());
    }
}

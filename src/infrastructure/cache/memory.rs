use crate::domain::errors::CacheError;
use crate::domain::ports::SignalCache;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct CacheSlot {
    expires_at: Instant,
    payload: String,
}

/// Process-local TTL cache behind the `SignalCache` port. Entries are
/// immutable once written and expire strictly by TTL; expired slots are
/// swept lazily on writes.
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, CacheSlot>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored slots, including not-yet-swept expired ones.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalCache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(slot) if slot.expires_at > Instant::now() => Ok(Some(slot.payload.clone())),
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, slot| slot.expires_at > now);
        entries.insert(
            key.to_string(),
            CacheSlot {
                expires_at: now + ttl,
                payload: value.to_string(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get_within_ttl() {
        let cache = InMemoryCache::new();
        cache
            .set("k1", "{\"signal\":\"BUY\"}", Duration::from_secs(60))
            .await
            .unwrap();

        let value = cache.get("k1").await.unwrap();
        assert_eq!(value.as_deref(), Some("{\"signal\":\"BUY\"}"));
    }

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let cache = InMemoryCache::new();
        assert!(cache.get("absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entries_expire_strictly_by_ttl() {
        let cache = InMemoryCache::new();
        cache
            .set("k1", "payload", Duration::from_millis(20))
            .await
            .unwrap();

        assert!(cache.get("k1").await.unwrap().is_some());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(cache.get("k1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_writes_sweep_expired_slots() {
        let cache = InMemoryCache::new();
        cache
            .set("old", "payload", Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        cache
            .set("new", "payload", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_ping_is_healthy() {
        let cache = InMemoryCache::new();
        assert!(cache.ping().await.is_ok());
    }
}

//! Generic TTL cache, keyed by venue for the pool aggregator and reused
//! by the oracle aggregator keyed by mint. In-process and
//! advisory only — store-backed state is never cached here.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

struct Entry<V> {
    value: V,
    fetched_at: Instant,
}

pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        entries.get(key).and_then(|e| {
            if e.fetched_at.elapsed() < self.ttl {
                Some(e.value.clone())
            } else {
                None
            }
        })
    }

    pub async fn put(&self, key: K, value: V) {
        self.entries.write().await.insert(
            key,
            Entry {
                value,
                fetched_at: Instant::now(),
            },
        );
    }

    pub async fn invalidate(&self, key: &K) {
        self.entries.write().await.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn expired_entries_are_not_returned() {
        let cache: TtlCache<&str, i32> = TtlCache::new(Duration::from_millis(10));
        cache.put("k", 1).await;
        assert_eq!(cache.get(&"k").await, Some(1));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get(&"k").await, None);
    }
}

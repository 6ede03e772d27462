//! In-memory fallback store, used when the durable store is unreachable
//! and in tests.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::Result;

use super::StateStore;

#[derive(Default)]
struct Inner {
    strings: HashMap<String, String>,
    lists: HashMap<String, Vec<String>>,
    sets: HashMap<String, Vec<String>>,
    hashes: HashMap<String, HashMap<String, String>>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.read().unwrap().strings.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.inner
            .write()
            .unwrap()
            .strings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.strings.remove(key);
        inner.lists.remove(key);
        inner.sets.remove(key);
        inner.hashes.remove(key);
        Ok(())
    }

    async fn list_push(&self, key: &str, value: &str, cap: usize) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let list = inner.lists.entry(key.to_string()).or_default();
        list.insert(0, value.to_string());
        list.truncate(cap);
        Ok(())
    }

    async fn list_range(&self, key: &str) -> Result<Vec<String>> {
        Ok(self.inner.read().unwrap().lists.get(key).cloned().unwrap_or_default())
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let set = inner.sets.entry(key.to_string()).or_default();
        if !set.iter().any(|m| m == member) {
            set.push(member.to_string());
        }
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        if let Some(set) = inner.sets.get_mut(key) {
            set.retain(|m| m != member);
        }
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        Ok(self.inner.read().unwrap().sets.get(key).cloned().unwrap_or_default())
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .hashes
            .get(key)
            .and_then(|h| h.get(field))
            .cloned())
    }

    async fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .hashes
            .get(key)
            .map(|h| h.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_push_trims_to_cap() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.list_push("k", &i.to_string(), 3).await.unwrap();
        }
        let values = store.list_range("k").await.unwrap();
        assert_eq!(values, vec!["4", "3", "2"]);
    }

    #[tokio::test]
    async fn set_membership_is_idempotent() {
        let store = MemoryStore::new();
        store.sadd("s", "a").await.unwrap();
        store.sadd("s", "a").await.unwrap();
        assert_eq!(store.smembers("s").await.unwrap(), vec!["a"]);
    }
}

//! A thin interface over a durable key-value
//! store with an in-memory fallback when the store is unreachable.
//! Writes are idempotent at the key level; there are no multi-key
//! transactions.

pub mod keys;
pub mod memory;

#[cfg(feature = "full")]
pub mod redis_store;

use async_trait::async_trait;

use crate::error::Result;

/// Capped durable ring buffer size for worker logs.
pub const WORKER_LOG_CAP: usize = 500;

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn del(&self, key: &str) -> Result<()>;

    /// Push a value onto the front of a list, then trim it to `cap` entries.
    async fn list_push(&self, key: &str, value: &str, cap: usize) -> Result<()>;
    async fn list_range(&self, key: &str) -> Result<Vec<String>>;

    async fn sadd(&self, key: &str, member: &str) -> Result<()>;
    async fn srem(&self, key: &str, member: &str) -> Result<()>;
    async fn smembers(&self, key: &str) -> Result<Vec<String>>;

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()>;
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>>;
    async fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>>;
}

/// Serialize a value to JSON for storage; callers use `get`/`set` with
/// typed values through these helpers rather than raw strings directly.
pub async fn get_json<T: serde::de::DeserializeOwned>(
    store: &dyn StateStore,
    key: &str,
) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(raw) => {
            let value = serde_json::from_str(&raw)
                .map_err(|e| crate::error::EngineError::Internal(format!("store decode: {e}")))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

pub async fn set_json<T: serde::Serialize>(
    store: &dyn StateStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let raw = serde_json::to_string(value)
        .map_err(|e| crate::error::EngineError::Internal(format!("store encode: {e}")))?;
    store.set(key, &raw).await
}

//! Redis-backed `StateStore` implementation. Connection failures
//! are surfaced as `EngineError::Internal`; callers fall back to
//! `MemoryStore` at the composition root when construction fails.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::error::Result;

use super::StateStore;

pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| crate::error::EngineError::Internal(format!("redis url: {e}")))?;
        let manager = client.get_connection_manager().await?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl StateStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.manager.clone();
        Ok(conn.get(key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.set(key, value).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.del(key).await?;
        Ok(())
    }

    async fn list_push(&self, key: &str, value: &str, cap: usize) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.lpush(key, value).await?;
        conn.ltrim(key, 0, cap as isize - 1).await?;
        Ok(())
    }

    async fn list_range(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.manager.clone();
        Ok(conn.lrange(key, 0, -1).await?)
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.sadd(key, member).await?;
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.srem(key, member).await?;
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.manager.clone();
        Ok(conn.smembers(key).await?)
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.hset(key, field, value).await?;
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut conn = self.manager.clone();
        Ok(conn.hget(key, field).await?)
    }

    async fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>> {
        let mut conn = self.manager.clone();
        let map: std::collections::HashMap<String, String> = conn.hgetall(key).await?;
        Ok(map.into_iter().collect())
    }
}

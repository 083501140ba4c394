//! Redis cache backend
//!
//! One multiplexed [`ConnectionManager`] is shared by every request; it
//! reconnects on its own after connection loss. Each command runs under a
//! deadline so a stalled Redis cannot hold requests forever.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::IntoConnectionInfo;
use redis::aio::ConnectionManager;

use super::{CacheBackend, CacheError, CacheResult};

#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    timeout: Duration,
}

impl RedisCache {
    /// Connect to `addr` (`host:port`) and select `db`
    pub async fn connect(
        addr: &str,
        password: Option<&str>,
        db: i64,
        timeout: Duration,
    ) -> CacheResult<Self> {
        let mut info = format!("redis://{addr}").into_connection_info()?;
        info.redis.db = db;
        info.redis.password = password.map(str::to_owned);

        let client = redis::Client::open(info)?;
        let conn = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Timeout)??;

        tracing::info!(addr = %addr, db, "Connected to Redis");
        Ok(Self { conn, timeout })
    }

    async fn with_deadline<T>(
        &self,
        fut: impl Future<Output = redis::RedisResult<T>>,
    ) -> CacheResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(CacheError::Timeout),
        }
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = self
            .with_deadline(redis::cmd("GET").arg(key).query_async(&mut conn))
            .await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        // SETEX rejects a zero expiry
        let secs = ttl.as_secs().max(1);
        let _: () = self
            .with_deadline(
                redis::cmd("SETEX")
                    .arg(key)
                    .arg(secs)
                    .arg(value)
                    .query_async(&mut conn),
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let _: i64 = self
            .with_deadline(redis::cmd("DEL").arg(key).query_async(&mut conn))
            .await?;
        Ok(())
    }
}

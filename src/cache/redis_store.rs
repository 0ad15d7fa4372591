//! Redis-backed cache store.
//!
//! Every command runs under the configured timeout; a timeout is reported as
//! [`CacheStoreError::Timeout`] and treated by callers exactly like an
//! unreachable server.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};

use super::store::{CacheStore, CacheStoreError};

pub struct RedisStore {
    connection: ConnectionManager,
    op_timeout: Duration,
}

impl RedisStore {
    /// Open a managed connection and verify it with `PING`.
    pub async fn connect(url: &str, op_timeout: Duration) -> Result<Self, CacheStoreError> {
        let client = Client::open(url).map_err(map_redis_error)?;
        let connection = tokio::time::timeout(op_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheStoreError::Timeout(op_timeout))?
            .map_err(map_redis_error)?;

        let store = Self {
            connection,
            op_timeout,
        };
        store.ping().await?;
        Ok(store)
    }

    pub async fn ping(&self) -> Result<(), CacheStoreError> {
        let mut conn = self.connection.clone();
        self.bounded(async move { redis::cmd("PING").query_async::<()>(&mut conn).await })
            .await
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, CacheStoreError>
    where
        F: Future<Output = Result<T, RedisError>>,
    {
        tokio::time::timeout(self.op_timeout, op)
            .await
            .map_err(|_| CacheStoreError::Timeout(self.op_timeout))?
            .map_err(map_redis_error)
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheStoreError> {
        let mut conn = self.connection.clone();
        self.bounded(async move {
            let found: bool = conn.exists(key).await?;
            Ok(found)
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheStoreError> {
        let mut conn = self.connection.clone();
        let value = self
            .bounded(async move {
                let value: Option<Vec<u8>> = conn.get(key).await?;
                Ok(value)
            })
            .await?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheStoreError> {
        let mut conn = self.connection.clone();
        let seconds = ttl_seconds(ttl);
        self.bounded(async move {
            let _: () = conn.set_ex(key, value.as_ref(), seconds).await?;
            Ok(())
        })
        .await
    }
}

/// Redis expiries are whole seconds; anything shorter still lives one second.
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

fn map_redis_error(err: RedisError) -> CacheStoreError {
    if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
        CacheStoreError::Unavailable(err.to_string())
    } else if err.is_timeout() {
        CacheStoreError::Unavailable(format!("redis timeout: {err}"))
    } else {
        CacheStoreError::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_second_ttl_rounds_up() {
        assert_eq!(ttl_seconds(Duration::from_millis(10)), 1);
        assert_eq!(ttl_seconds(Duration::from_secs(3600)), 3600);
    }

    #[tokio::test]
    async fn malformed_url_is_reported_not_panicked() {
        let result = RedisStore::connect("not-a-redis-url", Duration::from_millis(100)).await;
        assert!(result.is_err());
    }
}

//! Cache store contract.
//!
//! Stores hold opaque bytes under string keys with a per-entry TTL. A store is
//! an optimization only: errors are returned to [`super::CacheAside`], which
//! absorbs them, so implementations should report failures rather than retry.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
    #[error("cache store timed out after {0:?}")]
    Timeout(Duration),
    #[error("cache store error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short backend name used in logs and metrics.
    fn backend(&self) -> &'static str;

    async fn exists(&self, key: &str) -> Result<bool, CacheStoreError>;

    /// `Ok(None)` is a miss; an expired entry is a miss.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheStoreError>;

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheStoreError>;
}

/// Store used when caching is disabled: every lookup misses, every write is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

#[async_trait]
impl CacheStore for NullStore {
    fn backend(&self) -> &'static str {
        "disabled"
    }

    async fn exists(&self, _key: &str) -> Result<bool, CacheStoreError> {
        Ok(false)
    }

    async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheStoreError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Bytes, _ttl: Duration) -> Result<(), CacheStoreError> {
        Ok(())
    }
}

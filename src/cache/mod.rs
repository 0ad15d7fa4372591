//! Pressroom cache-aside layer.
//!
//! - **Key deriver** ([`KeyDeriver`]): canonical string keys from single-id and
//!   collection fetches.
//! - **Stores** ([`CacheStore`]): in-process TTL/LRU ([`MemoryStore`]), Redis
//!   ([`RedisStore`]), or none ([`NullStore`]).
//! - **Read-through** ([`CacheAside`]): lookup, fall through, populate.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! backend = "redis"        # memory | redis | disabled
//! ttl_seconds = 3600
//! redis_url = "redis://127.0.0.1:6379"
//! redis_timeout_ms = 250
//! ```
//!
//! Writes never touch the cache. A record edited after it was cached keeps
//! being served in its old form until the entry's TTL runs out.

mod aside;
mod config;
mod keys;
mod lock;
mod memory;
mod redis_store;
mod store;

use std::sync::Arc;

use tracing::{info, warn};

pub use aside::CacheAside;
pub use config::{CacheBackend, CacheConfig};
pub use keys::{ABSENT, Dimension, EntityKind, KeyDeriver, KeyDimensions, Selector};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use store::{CacheStore, CacheStoreError, NullStore};

/// Build the store selected by `config`.
///
/// An unreachable Redis server is not fatal: the process continues with
/// [`NullStore`] and every read goes to the repository.
pub async fn build_store(config: &CacheConfig) -> Arc<dyn CacheStore> {
    match config.backend {
        CacheBackend::Disabled => Arc::new(NullStore),
        CacheBackend::Memory => Arc::new(MemoryStore::new(config.memory_capacity_non_zero())),
        CacheBackend::Redis => {
            let Some(url) = config.redis_url.as_deref() else {
                warn!("cache.backend is redis but cache.redis_url is unset; caching disabled");
                return Arc::new(NullStore);
            };
            match RedisStore::connect(url, config.redis_timeout).await {
                Ok(store) => {
                    info!(timeout_ms = config.redis_timeout.as_millis() as u64, "Connected to redis cache");
                    Arc::new(store)
                }
                Err(err) => {
                    warn!(error = %err, "Redis cache unavailable; caching disabled");
                    Arc::new(NullStore)
                }
            }
        }
    }
}

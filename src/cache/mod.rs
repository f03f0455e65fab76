//! Cache layer
//!
//! Read-mostly data (the course outline, catalog listings) is kept in an
//! in-process moka cache. Values are stored as JSON so one cache can hold
//! any serializable type.
//!
//! # Usage
//!
//! ```rust,ignore
//! use coursegate::cache::{create_cache, CacheLayer};
//! use coursegate::config::CacheConfig;
//!
//! let cache = create_cache(&CacheConfig::default());
//! cache.set("catalog:topics", &topics, cache.default_ttl()).await?;
//! cache.delete_pattern("catalog:*").await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

pub use memory::MemoryCache;

/// Cache operations used by the services.
///
/// The methods are generic, so this trait is not object safe; services hold a
/// concrete [`Cache`].
#[async_trait]
pub trait CacheLayer: Send + Sync {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Store a value that expires after `ttl`
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete every key matching a glob pattern (`*` and `?` wildcards)
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// The cache shared by the application.
pub type Cache = MemoryCache;

/// Create the application cache from configuration.
pub fn create_cache(config: &CacheConfig) -> Arc<Cache> {
    let ttl = Duration::from_secs(config.ttl_seconds);
    tracing::debug!(capacity = config.capacity, ttl_seconds = config.ttl_seconds, "Creating cache");
    Arc::new(MemoryCache::with_capacity_and_ttl(config.capacity, ttl))
}

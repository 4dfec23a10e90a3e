//! Minimal key-value surface the cache needs from its backing store.

use async_trait::async_trait;
use std::sync::Arc;

use crate::CacheError;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// `GET key`; `None` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    /// `SET key value`, dropping any previous expiry.
    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;
    /// `SETEX key ttl_secs value`
    async fn set_ex(
        &self,
        key: &str,
        value: &str,
        ttl_secs: u64,
    ) -> Result<(), CacheError>;
    /// `INCR key`, returns the value after the increment.
    async fn incr(&self, key: &str) -> Result<i64, CacheError>;
    /// `RPUSH key value`, returns the list length after the push.
    async fn rpush(&self, key: &str, value: &str) -> Result<usize, CacheError>;
    /// `LRANGE key 0 -1`
    async fn lrange_all(&self, key: &str) -> Result<Vec<String>, CacheError>;
    /// `FLUSHDB`
    async fn flush(&self) -> Result<(), CacheError>;
}

pub type AbstractStore = Arc<dyn KeyValueStore>;

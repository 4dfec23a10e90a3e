use async_trait::async_trait;
use rustis::client::Client;
use rustis::commands::{FlushingMode, ListCommands, ServerCommands, StringCommands};
use tracing::info;

use crate::{CacheError, KeyValueStore};

/// Redis store over a single multiplexed rustis connection.
///
/// Cloning is cheap and every clone talks over the same connection, so one
/// store built at startup can be handed to every stage that needs it.
#[derive(Clone)]
pub struct RedisStore {
    pub client: Client,
}

impl RedisStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn connect(uri: &str) -> Result<Self, CacheError> {
        let client = Client::connect(uri).await?;
        info!("Connected to redis");
        Ok(Self { client })
    }

    /// Close the underlying connection. Other clones stop working too.
    pub async fn close(self) -> Result<(), CacheError> {
        self.client.close().await?;
        info!("Redis connection closed");
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let value: Option<String> = self.client.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.client.set(key, value).await?;
        Ok(())
    }

    async fn set_ex(
        &self,
        key: &str,
        value: &str,
        ttl_secs: u64,
    ) -> Result<(), CacheError> {
        self.client.setex(key, ttl_secs, value).await?;
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, CacheError> {
        Ok(self.client.incr(key).await?)
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<usize, CacheError> {
        Ok(self.client.rpush(key, value).await?)
    }

    async fn lrange_all(&self, key: &str) -> Result<Vec<String>, CacheError> {
        let items: Vec<String> = self.client.lrange(key, 0, -1).await?;
        Ok(items)
    }

    async fn flush(&self) -> Result<(), CacheError> {
        self.client.flushdb(FlushingMode::Default).await?;
        Ok(())
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

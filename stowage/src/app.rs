use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use stowage_cache::{
    CacheError, HttpFetcher, PageCache, PageSource, Recorder, RedisStore, Replay,
    STORE_METHOD, StoredValue,
};
use stowage_config::{
    Configurable, HttpClientParams, PageCacheSettings, StoreSettings,
};
use stowage_mongo::{LogStats, StudentAverage, mongodb::Database};
use tracing::info;

/// Everything the binary reads from its config file and the environment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppConfig {
    pub stores: StoreSettings,
    pub cache: PageCacheSettings,
    pub http: HttpClientParams,
}

impl AppConfig {
    /// Read `path` if given (defaults otherwise), then apply environment
    /// overrides for the connection targets.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => serde_yaml::Value::load_config(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => serde_yaml::Value::Null,
        };
        let mut app = Self::from_config(&config)?;
        app.stores = app.stores.with_env_overrides();
        Ok(app)
    }

    pub fn from_config(config: &serde_yaml::Value) -> anyhow::Result<Self> {
        Ok(Self {
            stores: StoreSettings::from_config(config)?,
            cache: PageCacheSettings::from_config(config)?,
            http: HttpClientParams::from_config(config)?,
        })
    }
}

/// Request `url` through `cache` `repeat` times (at least once) and return
/// the body of the last call.
pub async fn fetch_pages<P: PageSource>(
    cache: &PageCache<P>,
    url: &str,
    repeat: u32,
) -> Result<String, CacheError> {
    let mut page = cache.get_page(url).await?;
    for _ in 1..repeat {
        page = cache.get_page(url).await?;
    }
    let requests = cache.request_count(url).await?;
    info!(url, requests, bytes = page.len(), "page served");
    Ok(page)
}

pub async fn get_page(
    config: &AppConfig,
    url: &str,
    repeat: u32,
) -> anyhow::Result<String> {
    let store = RedisStore::connect(&config.stores.redis_uri)
        .await
        .context("connecting to redis")?;
    let fetcher = HttpFetcher::from_params(&config.http)?;
    let cache =
        PageCache::new(Arc::new(store.clone()), fetcher, config.cache.clone());

    let page = fetch_pages(&cache, url, repeat).await;
    store.close().await?;
    Ok(page?)
}

/// Store each value through a fresh [`Recorder`] (flushing the redis
/// database first) and return the recorded history.
pub async fn record(
    config: &AppConfig,
    values: &[String],
) -> anyhow::Result<Replay> {
    let store = RedisStore::connect(&config.stores.redis_uri)
        .await
        .context("connecting to redis")?;
    let recorder = Recorder::new(Arc::new(store.clone())).await?;

    for raw in values {
        let value: StoredValue = raw.parse()?;
        recorder.store(value).await?;
    }
    let replay = recorder.replay(STORE_METHOD).await?;
    store.close().await?;
    Ok(replay)
}

async fn mongo_database(config: &AppConfig) -> anyhow::Result<Database> {
    let stores = &config.stores;
    stowage_mongo::connect(&stores.mongodb_uri, &stores.mongodb_database)
        .await
        .context("connecting to mongodb")
}

pub async fn log_stats(config: &AppConfig, top: i64) -> anyhow::Result<LogStats> {
    let db = mongo_database(config).await?;
    let collection = db.collection(&config.stores.nginx_collection);
    Ok(LogStats::collect(&collection, top).await?)
}

pub async fn top_students(
    config: &AppConfig,
) -> anyhow::Result<Vec<StudentAverage>> {
    let db = mongo_database(config).await?;
    let collection = db.collection(&config.stores.students_collection);
    Ok(stowage_mongo::top_students(&collection).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use stowage_cache::InMemoryStore;

    #[derive(Clone, Default)]
    struct CountingSource {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PageSource for CountingSource {
        async fn get_page(&self, url: &str) -> Result<String, CacheError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("page of {}", url))
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = AppConfig::from_config(&serde_yaml::Value::Null).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.cache.ttl, 10);
    }

    #[test]
    fn test_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cache:\n  ttl: 30\nmongodb:\n  database: web").unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.cache.ttl, 30);
        assert_eq!(config.stores.mongodb_database, "web");
    }

    #[test]
    fn test_config_missing_file() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/stowage.yml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_invalid_value() {
        let config: serde_yaml::Value =
            serde_yaml::from_str("cache:\n  ttl: forever").unwrap();
        assert!(AppConfig::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_fetch_pages_repeats() {
        let source = CountingSource::default();
        let store = Arc::new(InMemoryStore::new());
        let cache =
            PageCache::new(store, source.clone(), PageCacheSettings::default());

        let page = fetch_pages(&cache, "http://x", 5).await.unwrap();
        assert_eq!(page, "page of http://x");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.request_count("http://x").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_fetch_pages_runs_at_least_once() {
        let source = CountingSource::default();
        let store = Arc::new(InMemoryStore::new());
        let cache =
            PageCache::new(store, source.clone(), PageCacheSettings::default());

        fetch_pages(&cache, "http://x", 0).await.unwrap();
        assert_eq!(cache.request_count("http://x").await.unwrap(), 1);
    }
}

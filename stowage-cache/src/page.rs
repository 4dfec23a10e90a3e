//! Page request pipeline.
//!
//! Each stage takes a URL and returns the page body, so stages nest:
//! `CountRequests<CachePage<HttpFetcher>>` counts every call, serves cached
//! bodies while they last and fetches otherwise.
//!
//! Two callers missing the cache for the same URL at the same time will
//! both fetch and both write; the later write wins.
use async_trait::async_trait;
use stowage_config::{
    HttpClientParams, PageCacheSettings, build_http_client, fetch_url_content,
};
use tracing::{debug, warn};

use crate::{AbstractStore, CacheError};

#[async_trait]
pub trait PageSource: Send + Sync {
    async fn get_page(&self, url: &str) -> Result<String, CacheError>;
}

/// Fetches pages over HTTP. A non-2xx status is an error.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    retry_max_elapsed: Option<u64>,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            retry_max_elapsed: None,
        }
    }

    pub fn from_params(params: &HttpClientParams) -> Result<Self, CacheError> {
        Ok(Self {
            client: build_http_client(params)?,
            retry_max_elapsed: params.retry_max_elapsed,
        })
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn get_page(&self, url: &str) -> Result<String, CacheError> {
        let (status, body) =
            fetch_url_content(&self.client, url, self.retry_max_elapsed)
                .await
                .inspect_err(|e| warn!("Fetching {} failed: {}", url, e))?;

        if !status.is_success() {
            warn!("Fetching {} returned {}", url, status);
            return Err(CacheError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        debug!("Fetched {} ({} bytes)", url, body.len());
        Ok(body)
    }
}

/// Serves `cached:{url}` when present, otherwise asks `inner` and stores the
/// body with the configured TTL. An empty cached body is still a hit.
pub struct CachePage<P> {
    inner: P,
    store: AbstractStore,
    settings: PageCacheSettings,
}

impl<P: PageSource> CachePage<P> {
    pub fn new(inner: P, store: AbstractStore, settings: PageCacheSettings) -> Self {
        Self {
            inner,
            store,
            settings,
        }
    }
}

#[async_trait]
impl<P: PageSource> PageSource for CachePage<P> {
    async fn get_page(&self, url: &str) -> Result<String, CacheError> {
        let key = self.settings.cache_key(url);

        if let Some(page) = self.store.get(&key).await? {
            debug!("Cache hit for {}", url);
            return Ok(page);
        }

        debug!("Cache miss for {}", url);
        let page = self.inner.get_page(url).await?;
        self.store.set_ex(&key, &page, self.settings.ttl).await?;
        Ok(page)
    }
}

/// Bumps `count:{url}` once per call before delegating to `inner`. The
/// count is kept even when `inner` fails.
pub struct CountRequests<P> {
    inner: P,
    store: AbstractStore,
    settings: PageCacheSettings,
}

impl<P: PageSource> CountRequests<P> {
    pub fn new(inner: P, store: AbstractStore, settings: PageCacheSettings) -> Self {
        Self {
            inner,
            store,
            settings,
        }
    }
}

#[async_trait]
impl<P: PageSource> PageSource for CountRequests<P> {
    async fn get_page(&self, url: &str) -> Result<String, CacheError> {
        self.store.incr(&self.settings.count_key(url)).await?;
        self.inner.get_page(url).await
    }
}

/// Counting and caching around a fetcher, built from one shared store.
pub struct PageCache<P = HttpFetcher> {
    pipeline: CountRequests<CachePage<P>>,
    store: AbstractStore,
    settings: PageCacheSettings,
}

impl<P: PageSource> PageCache<P> {
    pub fn new(store: AbstractStore, fetcher: P, settings: PageCacheSettings) -> Self {
        let cached = CachePage::new(fetcher, store.clone(), settings.clone());
        let pipeline = CountRequests::new(cached, store.clone(), settings.clone());
        Self {
            pipeline,
            store,
            settings,
        }
    }

    /// How many times `url` has been requested so far.
    pub async fn request_count(&self, url: &str) -> Result<i64, CacheError> {
        let key = self.settings.count_key(url);
        match self.store.get(&key).await? {
            None => Ok(0),
            Some(count) => count
                .parse()
                .map_err(|_| CacheError::Conversion(format!("{} = {:?}", key, count))),
        }
    }

    /// The cached body for `url`, if one is still live.
    pub async fn cached(&self, url: &str) -> Result<Option<String>, CacheError> {
        self.store.get(&self.settings.cache_key(url)).await
    }

    pub fn settings(&self) -> &PageCacheSettings {
        &self.settings
    }
}

#[async_trait]
impl<P: PageSource> PageSource for PageCache<P> {
    async fn get_page(&self, url: &str) -> Result<String, CacheError> {
        self.pipeline.get_page(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryStore, KeyValueStore};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Returns a fixed body and counts how often it was asked.
    #[derive(Clone)]
    struct FakeSource {
        body: &'static str,
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl FakeSource {
        fn new(body: &'static str) -> Self {
            Self {
                body,
                calls: Arc::new(AtomicUsize::new(0)),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new("")
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageSource for FakeSource {
        async fn get_page(&self, url: &str) -> Result<String, CacheError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CacheError::Status {
                    url: url.to_string(),
                    status: 503,
                });
            }
            Ok(self.body.to_string())
        }
    }

    fn setup(source: FakeSource) -> (Arc<InMemoryStore>, PageCache<FakeSource>) {
        let store = Arc::new(InMemoryStore::new());
        let cache = PageCache::new(store.clone(), source, PageCacheSettings::default());
        (store, cache)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_call_fetches_and_caches() {
        let source = FakeSource::new("<html>x</html>");
        let (store, cache) = setup(source.clone());

        let page = cache.get_page("http://x").await.unwrap();
        assert_eq!(page, "<html>x</html>");
        assert_eq!(source.calls(), 1);
        assert_eq!(
            store.get("count:http://x").await.unwrap().as_deref(),
            Some("1")
        );
        assert_eq!(
            store.get("cached:http://x").await.unwrap().as_deref(),
            Some("<html>x</html>")
        );
        assert_eq!(
            store.ttl("cached:http://x").unwrap(),
            Some(Duration::from_secs(10))
        );
    }

    #[tokio::test]
    async fn test_second_call_within_ttl_is_served_from_cache() {
        let source = FakeSource::new("<html>x</html>");
        let (_store, cache) = setup(source.clone());

        let first = cache.get_page("http://x").await.unwrap();
        let second = cache.get_page("http://x").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.calls(), 1);
        assert_eq!(cache.request_count("http://x").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_counts_every_call() {
        let source = FakeSource::new("body");
        let (_store, cache) = setup(source.clone());

        for _ in 0..25 {
            cache.get_page("http://x").await.unwrap();
        }

        assert_eq!(cache.request_count("http://x").await.unwrap(), 25);
        assert_eq!(source.calls(), 1);
        assert_eq!(cache.request_count("http://other").await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_refetched() {
        let source = FakeSource::new("body");
        let (_store, cache) = setup(source.clone());

        cache.get_page("http://x").await.unwrap();
        tokio::time::advance(Duration::from_secs(9)).await;
        cache.get_page("http://x").await.unwrap();
        assert_eq!(source.calls(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.cached("http://x").await.unwrap(), None);
        cache.get_page("http://x").await.unwrap();
        assert_eq!(source.calls(), 2);
        assert_eq!(cache.request_count("http://x").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_empty_body_is_a_hit() {
        let source = FakeSource::new("");
        let (_store, cache) = setup(source.clone());

        assert_eq!(cache.get_page("http://empty").await.unwrap(), "");
        assert_eq!(cache.get_page("http://empty").await.unwrap(), "");
        assert_eq!(source.calls(), 1);
        assert_eq!(cache.cached("http://empty").await.unwrap().as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_failed_fetch_is_counted_but_not_cached() {
        let source = FakeSource::failing();
        let (store, cache) = setup(source.clone());

        let result = cache.get_page("http://down").await;
        assert!(matches!(result, Err(CacheError::Status { status: 503, .. })));
        assert_eq!(cache.request_count("http://down").await.unwrap(), 1);
        assert_eq!(store.get("cached:http://down").await.unwrap(), None);

        assert!(cache.get_page("http://down").await.is_err());
        assert_eq!(source.calls(), 2);
        assert_eq!(cache.request_count("http://down").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_urls_are_cached_independently() {
        let source = FakeSource::new("body");
        let (_store, cache) = setup(source.clone());

        cache.get_page("http://a").await.unwrap();
        cache.get_page("http://b").await.unwrap();
        cache.get_page("http://a").await.unwrap();

        assert_eq!(source.calls(), 2);
        assert_eq!(cache.request_count("http://a").await.unwrap(), 2);
        assert_eq!(cache.request_count("http://b").await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_settings() {
        let source = FakeSource::new("body");
        let store = Arc::new(InMemoryStore::new());
        let settings = PageCacheSettings {
            ttl: 60,
            count_prefix: "hits:".to_string(),
            cache_prefix: "page:".to_string(),
        };
        let cache = PageCache::new(store.clone(), source, settings);

        cache.get_page("http://x").await.unwrap();
        assert_eq!(store.get("hits:http://x").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.ttl("page:http://x").unwrap(), Some(Duration::from_secs(60)));
        assert_eq!(cache.settings().ttl, 60);
    }

    #[tokio::test]
    async fn test_stages_compose_by_hand() {
        let source = FakeSource::new("body");
        let store: AbstractStore = Arc::new(InMemoryStore::new());
        let settings = PageCacheSettings::default();
        let counted_only = CountRequests::new(source.clone(), store.clone(), settings);

        counted_only.get_page("http://x").await.unwrap();
        counted_only.get_page("http://x").await.unwrap();

        assert_eq!(source.calls(), 2);
        assert_eq!(store.get("count:http://x").await.unwrap().as_deref(), Some("2"));
        assert_eq!(store.get("cached:http://x").await.unwrap(), None);
    }
}

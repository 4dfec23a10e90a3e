//! In-memory implementation of the KeyValueStore trait. Mirrors the Redis
//! semantics the cache relies on: absent keys read as `None`, `INCR` starts
//! from zero and keeps an existing expiry, `SET` clears it, and lists and
//! strings cannot be mixed under one key.
//!
//! Expiry is measured with `tokio::time::Instant`, so tests running on a
//! paused clock can move past a TTL with `tokio::time::advance`.
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use crate::{CacheError, KeyValueStore};

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    List(Vec<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn persistent(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub fn len(&self) -> Result<usize, CacheError> {
        let now = Instant::now();
        let entries = self.lock()?;
        Ok(entries.values().filter(|e| !e.is_expired(now)).count())
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }

    /// Remaining time to live, `None` for missing or persistent keys.
    pub fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        purge_expired(&mut entries, key, now);
        Ok(entries
            .get(key)
            .and_then(|e| e.expires_at)
            .map(|deadline| deadline.saturating_duration_since(now)))
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>, CacheError> {
        self.entries
            .lock()
            .map_err(|e| CacheError::Backend(e.to_string()))
    }
}

fn purge_expired(entries: &mut HashMap<String, Entry>, key: &str, now: Instant) {
    if entries.get(key).is_some_and(|e| e.is_expired(now)) {
        entries.remove(key);
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.lock()?;
        purge_expired(&mut entries, key, Instant::now());

        match entries.get(key) {
            None => Ok(None),
            Some(Entry {
                value: Value::Str(s),
                ..
            }) => Ok(Some(s.clone())),
            Some(_) => Err(CacheError::WrongType(key.to_string())),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut entries = self.lock()?;
        entries.insert(
            key.to_string(),
            Entry::persistent(Value::Str(value.to_string())),
        );
        Ok(())
    }

    async fn set_ex(
        &self,
        key: &str,
        value: &str,
        ttl_secs: u64,
    ) -> Result<(), CacheError> {
        if ttl_secs == 0 {
            return Err(CacheError::Backend(
                "invalid expire time in 'setex' command".to_string(),
            ));
        }

        let mut entries = self.lock()?;
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: Some(Instant::now() + Duration::from_secs(ttl_secs)),
            },
        );
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, CacheError> {
        let mut entries = self.lock()?;
        purge_expired(&mut entries, key, Instant::now());

        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::persistent(Value::Str("0".to_string())));

        let Value::Str(current) = &mut entry.value else {
            return Err(CacheError::WrongType(key.to_string()));
        };
        let next = current
            .parse::<i64>()
            .ok()
            .and_then(|n| n.checked_add(1))
            .ok_or_else(|| {
                CacheError::Conversion(format!(
                    "value at {} is not an integer or out of range",
                    key
                ))
            })?;
        *current = next.to_string();
        Ok(next)
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<usize, CacheError> {
        let mut entries = self.lock()?;
        purge_expired(&mut entries, key, Instant::now());

        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::persistent(Value::List(Vec::new())));

        match &mut entry.value {
            Value::List(items) => {
                items.push(value.to_string());
                Ok(items.len())
            }
            Value::Str(_) => Err(CacheError::WrongType(key.to_string())),
        }
    }

    async fn lrange_all(&self, key: &str) -> Result<Vec<String>, CacheError> {
        let mut entries = self.lock()?;
        purge_expired(&mut entries, key, Instant::now());

        match entries.get(key) {
            None => Ok(Vec::new()),
            Some(Entry {
                value: Value::List(items),
                ..
            }) => Ok(items.clone()),
            Some(_) => Err(CacheError::WrongType(key.to_string())),
        }
    }

    async fn flush(&self) -> Result<(), CacheError> {
        self.lock()?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_set() {
        let store = InMemoryStore::new();
        assert_eq!(store.get("missing").await.unwrap(), None);

        store.set("key", "value").await.unwrap();
        assert_eq!(store.get("key").await.unwrap().as_deref(), Some("value"));

        store.set("empty", "").await.unwrap();
        assert_eq!(store.get("empty").await.unwrap().as_deref(), Some(""));
        assert_eq!(store.len().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_ex_expires() {
        let store = InMemoryStore::new();
        store.set_ex("page", "<html/>", 10).await.unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(store.get("page").await.unwrap().as_deref(), Some("<html/>"));
        assert_eq!(store.ttl("page").unwrap(), Some(Duration::from_secs(1)));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(store.get("page").await.unwrap(), None);
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_clears_expiry() {
        let store = InMemoryStore::new();
        store.set_ex("key", "a", 5).await.unwrap();
        store.set("key", "b").await.unwrap();

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(store.get("key").await.unwrap().as_deref(), Some("b"));
        assert_eq!(store.ttl("key").unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_ex_zero_ttl() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.set_ex("key", "value", 0).await,
            Err(CacheError::Backend(_))
        ));
    }

    #[tokio::test]
    async fn test_incr() {
        let store = InMemoryStore::new();
        assert_eq!(store.incr("counter").await.unwrap(), 1);
        assert_eq!(store.incr("counter").await.unwrap(), 2);
        assert_eq!(store.get("counter").await.unwrap().as_deref(), Some("2"));

        store.set("text", "abc").await.unwrap();
        assert!(matches!(
            store.incr("text").await,
            Err(CacheError::Conversion(_))
        ));

        store.set("max", &i64::MAX.to_string()).await.unwrap();
        assert!(store.incr("max").await.is_err());
    }

    #[tokio::test]
    async fn test_lists() {
        let store = InMemoryStore::new();
        assert!(store.lrange_all("list").await.unwrap().is_empty());

        assert_eq!(store.rpush("list", "a").await.unwrap(), 1);
        assert_eq!(store.rpush("list", "b").await.unwrap(), 2);
        assert_eq!(store.lrange_all("list").await.unwrap(), vec!["a", "b"]);

        assert!(matches!(
            store.get("list").await,
            Err(CacheError::WrongType(_))
        ));
        assert!(matches!(
            store.incr("list").await,
            Err(CacheError::WrongType(_))
        ));

        store.set("scalar", "x").await.unwrap();
        assert!(matches!(
            store.rpush("scalar", "y").await,
            Err(CacheError::WrongType(_))
        ));
    }

    #[tokio::test]
    async fn test_flush() {
        let store = InMemoryStore::new();
        store.set("a", "1").await.unwrap();
        store.rpush("b", "2").await.unwrap();

        store.flush().await.unwrap();
        assert!(store.is_empty().unwrap());
    }
}

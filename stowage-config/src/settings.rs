//! Typed settings read from a YAML config.
//!
//! Every field has a default, so an empty config (or no config file at all)
//! yields a local setup: Redis and MongoDB on `127.0.0.1`, pages cached for
//! 10 seconds under `cached:{url}`, requests counted under `count:{url}`.
//!
//! ```yaml
//! redis:
//!   uri: redis://127.0.0.1:6379
//! mongodb:
//!   uri: mongodb://127.0.0.1:27017
//!   database: logs
//! cache:
//!   ttl: 10
//!   count_prefix: "count:"
//!   cache_prefix: "cached:"
//! ```
use crate::config::{ConfigError, Configurable};

pub const DEFAULT_REDIS_URI: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_MONGODB_URI: &str = "mongodb://127.0.0.1:27017";
pub const DEFAULT_DATABASE: &str = "logs";
pub const DEFAULT_NGINX_COLLECTION: &str = "nginx";
pub const DEFAULT_SCHOOLS_COLLECTION: &str = "school";
pub const DEFAULT_STUDENTS_COLLECTION: &str = "students";

pub const DEFAULT_CACHE_TTL: u64 = 10;
pub const DEFAULT_COUNT_PREFIX: &str = "count:";
pub const DEFAULT_CACHE_PREFIX: &str = "cached:";

/// Connection targets for the backing stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub redis_uri: String,
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub nginx_collection: String,
    pub schools_collection: String,
    pub students_collection: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            redis_uri: DEFAULT_REDIS_URI.to_string(),
            mongodb_uri: DEFAULT_MONGODB_URI.to_string(),
            mongodb_database: DEFAULT_DATABASE.to_string(),
            nginx_collection: DEFAULT_NGINX_COLLECTION.to_string(),
            schools_collection: DEFAULT_SCHOOLS_COLLECTION.to_string(),
            students_collection: DEFAULT_STUDENTS_COLLECTION.to_string(),
        }
    }
}

impl StoreSettings {
    pub fn from_config(config: &serde_yaml::Value) -> Result<Self, ConfigError> {
        Ok(Self {
            redis_uri: config.get_config_str("redis.uri", DEFAULT_REDIS_URI)?,
            mongodb_uri: config.get_config_str("mongodb.uri", DEFAULT_MONGODB_URI)?,
            mongodb_database: config
                .get_config_str("mongodb.database", DEFAULT_DATABASE)?,
            nginx_collection: config.get_config_str(
                "mongodb.nginx_collection",
                DEFAULT_NGINX_COLLECTION,
            )?,
            schools_collection: config.get_config_str(
                "mongodb.schools_collection",
                DEFAULT_SCHOOLS_COLLECTION,
            )?,
            students_collection: config.get_config_str(
                "mongodb.students_collection",
                DEFAULT_STUDENTS_COLLECTION,
            )?,
        })
    }

    /// Apply `REDIS_URI` / `MONGODB_URI` from the process environment,
    /// loading a `.env` file first if one exists.
    pub fn with_env_overrides(self) -> Self {
        dotenvy::dotenv().ok();
        self.with_overrides(
            std::env::var("REDIS_URI").ok(),
            std::env::var("MONGODB_URI").ok(),
        )
    }

    pub fn with_overrides(
        mut self,
        redis_uri: Option<String>,
        mongodb_uri: Option<String>,
    ) -> Self {
        if let Some(uri) = redis_uri.filter(|uri| !uri.is_empty()) {
            tracing::debug!("Redis uri overridden from environment");
            self.redis_uri = uri;
        }
        if let Some(uri) = mongodb_uri.filter(|uri| !uri.is_empty()) {
            tracing::debug!("MongoDB uri overridden from environment");
            self.mongodb_uri = uri;
        }
        self
    }
}

/// Key layout and expiry for the page cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCacheSettings {
    /// Seconds a cached page stays readable.
    pub ttl: u64,
    pub count_prefix: String,
    pub cache_prefix: String,
}

impl Default for PageCacheSettings {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CACHE_TTL,
            count_prefix: DEFAULT_COUNT_PREFIX.to_string(),
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
        }
    }
}

impl PageCacheSettings {
    pub fn from_config(config: &serde_yaml::Value) -> Result<Self, ConfigError> {
        let ttl = config.get_config_u64("cache.ttl", DEFAULT_CACHE_TTL)?;
        if ttl == 0 {
            // SETEX rejects a zero expiry
            return Err(ConfigError::InvalidValue {
                key: "cache.ttl".to_string(),
                expected: "positive number of seconds",
            });
        }

        Ok(Self {
            ttl,
            count_prefix: config
                .get_config_str("cache.count_prefix", DEFAULT_COUNT_PREFIX)?,
            cache_prefix: config
                .get_config_str("cache.cache_prefix", DEFAULT_CACHE_PREFIX)?,
        })
    }

    pub fn count_key(&self, url: &str) -> String {
        format!("{}{}", self.count_prefix, url)
    }

    pub fn cache_key(&self, url: &str) -> String {
        format!("{}{}", self.cache_prefix, url)
    }
}

//! Configuration for stowage tools.
//!
//! YAML files are loaded into a [`serde_yaml::Value`] through the
//! [`Configurable`] trait, and typed settings are read from that value with
//! defaults for everything that is missing. Connection targets can be
//! overridden from the environment (`REDIS_URI`, `MONGODB_URI`, `.env`
//! supported).
pub mod config;
pub mod http;
pub mod settings;

pub use backoff;
pub use config::{ConfigError, Configurable};
pub use http::{HttpClientParams, build_http_client, fetch_url_content};
pub use settings::{PageCacheSettings, StoreSettings};

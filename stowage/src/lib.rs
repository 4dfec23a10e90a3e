//! # stowage
//!
//! Small tools over Redis and MongoDB.
//!
//! - `cache`: page fetching with a per-URL request counter and a short-lived
//!   Redis cache, plus a value cache that records its own calls.
//! - `mongo`: collection helpers and Nginx log statistics.
//! - `config`: YAML config, typed settings and the HTTP client builder.
//! - `app`: the operations behind the `stowage` binary.
pub mod app;

pub use stowage_cache as cache;
pub use stowage_config as config;
pub use stowage_mongo as mongo;
// re-export
pub use anyhow;
pub use tracing;
pub use tracing_subscriber;

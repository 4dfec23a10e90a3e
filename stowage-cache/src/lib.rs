//! Redis-backed page cache with request counting.
//!
//! A page request runs through named stages that all implement
//! [`PageSource`]:
//!
//! - [`CountRequests`] bumps `count:{url}` on every call,
//! - [`CachePage`] serves `cached:{url}` when present, otherwise calls the
//!   next stage and stores its body for a fixed TTL,
//! - [`HttpFetcher`] performs the actual GET.
//!
//! [`PageCache`] wires the three together. The crate also ships a
//! [`Recorder`], a small value cache that counts and logs its own calls.
//!
//! Stores are reached through [`KeyValueStore`]: [`RedisStore`] for real
//! deployments and [`InMemoryStore`] for tests and local runs.
mod backend;
mod error;
mod page;
mod recorder;
mod store;

pub use backend::{InMemoryStore, RedisStore};
pub use error::CacheError;
pub use page::{CachePage, CountRequests, HttpFetcher, PageCache, PageSource};
pub use recorder::{Recorder, Replay, STORE_METHOD, StoredValue};
pub use store::{AbstractStore, KeyValueStore};

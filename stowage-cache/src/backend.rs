pub mod memory;
pub mod redis;

pub use memory::InMemoryStore;
pub use redis::RedisStore;

#![warn(clippy::unwrap_used)]

pub mod hybrid;
pub mod kv;
pub mod local;

pub use hybrid::{CacheTuning, HybridCache};
pub use kv::{KvCacheDriver, RedisDriver};
pub use local::LocalCache;

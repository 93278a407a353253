//! Abstract remote key/value store with TTL, tag-member tracking for
//! cascade invalidation, and a ping-based health check. `RedisDriver` is the
//! production implementation; tests can swap in any other `KvCacheDriver`.

use async_trait::async_trait;
use hotel_core::config::RedisConfig;
use hotel_core::error::{HotelError, HotelResult};
use redis::AsyncCommands;
use std::time::Duration;
use tracing::info;

#[async_trait]
pub trait KvCacheDriver: Send + Sync {
    async fn get(&self, key: &str) -> HotelResult<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> HotelResult<()>;
    async fn del(&self, key: &str) -> HotelResult<()>;
    /// Track `key` as a member of `tag`'s invalidation set.
    async fn tag(&self, tag: &str, key: &str) -> HotelResult<()>;
    /// All keys currently registered under `tag`.
    async fn tag_members(&self, tag: &str) -> HotelResult<Vec<String>>;
    async fn ping(&self) -> HotelResult<()>;
}

pub struct RedisDriver {
    client: redis::Client,
}

impl RedisDriver {
    pub async fn connect(config: &RedisConfig) -> anyhow::Result<Self> {
        let url = config
            .urls
            .first()
            .cloned()
            .unwrap_or_else(|| "redis://localhost:6379".to_string());

        info!(url = %url, "connecting to shared cache");
        let client = redis::Client::open(url.as_str())?;

        let mut conn = client.get_multiplexed_async_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!(response = %pong, "shared cache connection established");

        Ok(Self { client })
    }

    async fn conn(&self) -> HotelResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| HotelError::CacheUnavailable(e.to_string()))
    }
}

#[async_trait]
impl KvCacheDriver for RedisDriver {
    async fn get(&self, key: &str) -> HotelResult<Option<Vec<u8>>> {
        let mut conn = self.conn().await?;
        conn.get(key)
            .await
            .map_err(|e| HotelError::CacheUnavailable(e.to_string()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> HotelResult<()> {
        let mut conn = self.conn().await?;
        let secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, secs)
            .await
            .map_err(|e| HotelError::CacheUnavailable(e.to_string()))
    }

    async fn del(&self, key: &str) -> HotelResult<()> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| HotelError::CacheUnavailable(e.to_string()))
    }

    async fn tag(&self, tag: &str, key: &str) -> HotelResult<()> {
        let mut conn = self.conn().await?;
        let set_key = format!("tagset:{tag}");
        conn.sadd::<_, _, ()>(&set_key, key)
            .await
            .map_err(|e| HotelError::CacheUnavailable(e.to_string()))
    }

    async fn tag_members(&self, tag: &str) -> HotelResult<Vec<String>> {
        let mut conn = self.conn().await?;
        let set_key = format!("tagset:{tag}");
        conn.smembers(&set_key)
            .await
            .map_err(|e| HotelError::CacheUnavailable(e.to_string()))
    }

    async fn ping(&self) -> HotelResult<()> {
        let mut conn = self.conn().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| HotelError::CacheUnavailable(e.to_string()))?;
        Ok(())
    }
}

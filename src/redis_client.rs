use redis::{aio::MultiplexedConnection, AsyncCommands, Client, RedisResult};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{info, warn};

use crate::config::RedisConfig;

/// Тонкая обёртка над multiplexed-соединением: значения храним как JSON
#[derive(Clone)]
pub struct RedisClient {
    conn: MultiplexedConnection,
}

impl RedisClient {
    pub async fn connect(config: &RedisConfig) -> RedisResult<Self> {
        let client = Client::open(config.url.as_str())?;
        let conn = client.get_multiplexed_tokio_connection().await?;
        info!("Redis connected");
        Ok(RedisClient { conn })
    }

    /// None и при промахе, и при битом значении
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = match conn.get(key).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("redis GET {} failed: {:?}", key, e);
                return None;
            }
        };
        serde_json::from_str(&raw?).ok()
    }

    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl_seconds: u64) -> RedisResult<()> {
        let data = serde_json::to_string(value).map_err(|e| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "json encode", e.to_string()))
        })?;
        let mut conn = self.conn.clone();
        conn.set_ex(key, data, ttl_seconds).await
    }

    /// Текущее значение счётчика; отсутствующий ключ читается как 0
    pub async fn counter(&self, key: &str) -> RedisResult<u64> {
        let mut conn = self.conn.clone();
        let value: Option<u64> = conn.get(key).await?;
        Ok(value.unwrap_or(0))
    }

    pub async fn increment(&self, key: &str) -> RedisResult<u64> {
        let mut conn = self.conn.clone();
        conn.incr(key, 1u64).await
    }

    pub async fn delete(&self, key: &str) -> RedisResult<()> {
        let mut conn = self.conn.clone();
        conn.del(key).await
    }

    /// Удаляет все ключи по шаблону, возвращает сколько нашлось
    pub async fn delete_matching(&self, pattern: &str) -> RedisResult<usize> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = redis::cmd("KEYS").arg(pattern).query_async(&mut conn).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let _: () = conn.del(&keys).await?;
        Ok(keys.len())
    }

    pub async fn ping(&self) -> bool {
        let mut conn = self.conn.clone();
        let pong: RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        pong.is_ok()
    }
}

use crate::redis_client::RedisClient;
use tracing::{info, warn};

pub mod ranking;
pub mod seats;

const RESERVED_PATTERN: &str = "screening:*:reserved:*";

/// Кеш поверх Redis. Источник истины - база; ошибки кеша только логируются.
#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    seats_ttl_seconds: u64,
    top_ttl_seconds: u64,
}

impl CacheService {
    pub fn new(redis: RedisClient, seats_ttl_seconds: u64, top_ttl_seconds: u64) -> Self {
        Self {
            redis,
            seats_ttl_seconds,
            top_ttl_seconds,
        }
    }

    // Сбрасываем всё, что могло остаться от прошлого запуска
    pub async fn reset(&self) {
        for pattern in [RESERVED_PATTERN, ranking::TOP_PATTERN] {
            match self.redis.delete_matching(pattern).await {
                Ok(0) => {}
                Ok(cleared) => info!("Cleared {} cached keys matching {}", cleared, pattern),
                Err(e) => warn!("failed to clear cache keys matching {}: {:?}", pattern, e),
            }
        }
    }
}

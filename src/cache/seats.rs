use crate::cache::CacheService;
use crate::models::ReservedSeat;
use tracing::{debug, warn};

// Списки мест хранятся под номером поколения. Бронь увеличивает поколение,
// поэтому запись, посчитанная до брони и сохранённая после, недостижима.
fn generation_key(screening_id: i64) -> String {
    format!("screening:{}:reserved:gen", screening_id)
}

fn reserved_key(screening_id: i64, generation: u64) -> String {
    format!("screening:{}:reserved:v{}", screening_id, generation)
}

impl CacheService {
    /// Поколение кеша мест; None, если Redis недоступен (кеш пропускаем)
    pub async fn reserved_seats_generation(&self, screening_id: i64) -> Option<u64> {
        match self.redis.counter(&generation_key(screening_id)).await {
            Ok(generation) => Some(generation),
            Err(e) => {
                warn!("failed to read seats cache generation for screening {}: {:?}", screening_id, e);
                None
            }
        }
    }

    pub async fn get_reserved_seats(&self, screening_id: i64, generation: u64) -> Option<Vec<ReservedSeat>> {
        self.redis.get_json(&reserved_key(screening_id, generation)).await
    }

    pub async fn save_reserved_seats(&self, screening_id: i64, generation: u64, seats: &[ReservedSeat]) {
        if let Err(e) = self
            .redis
            .set_json(&reserved_key(screening_id, generation), seats, self.seats_ttl_seconds)
            .await
        {
            warn!("failed to cache reserved seats for screening {}: {:?}", screening_id, e);
        }
    }

    // После бронирования или удаления сеанса
    pub async fn invalidate_reserved_seats(&self, screening_id: i64) {
        match self.redis.increment(&generation_key(screening_id)).await {
            Ok(generation) => debug!(
                "Reserved seats cache for screening {} moved to generation {}",
                screening_id, generation
            ),
            Err(e) => warn!("failed to invalidate reserved seats cache for screening {}: {:?}", screening_id, e),
        }
    }
}

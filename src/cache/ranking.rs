use crate::cache::CacheService;
use crate::models::WeightedRating;
use tracing::{debug, warn};

pub(super) const TOP_PATTERN: &str = "movies:top:*";

fn top_key(n: usize) -> String {
    format!("movies:top:{}", n)
}

impl CacheService {
    pub async fn get_top_movies(&self, n: usize) -> Option<Vec<WeightedRating>> {
        self.redis.get_json(&top_key(n)).await
    }

    pub async fn save_top_movies(&self, n: usize, ranking: &[WeightedRating]) {
        if let Err(e) = self.redis.set_json(&top_key(n), ranking, self.top_ttl_seconds).await {
            warn!("failed to cache top {} movies: {:?}", n, e);
        }
    }

    /// Любая новая оценка сдвигает C и может переставить весь рейтинг
    pub async fn invalidate_top_movies(&self) {
        match self.redis.delete_matching(TOP_PATTERN).await {
            Ok(dropped) => debug!("Invalidated {} cached top movie lists", dropped),
            Err(e) => warn!("failed to invalidate top movies cache: {:?}", e),
        }
    }
}

use std::cmp::Ordering;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::config::RatingConfig;
use crate::error::{BookingError, BookingResult};
use crate::models::{
    MovieRating, MovieRatingDetails, MovieRatingStats, RatingBaseline, RatingInput, Requester, WeightedRating,
};
use crate::store::{CatalogStore, RatingStore};

/// Байесовская взвешенная оценка.
///
/// `m = prior_coefficient × U`, результат `n/(n+m) × avg + m/(n+m) × C`.
/// Фильм без оценок получает ровно `C`; если оценок нет вообще, `C` не
/// определено и результат `None`.
pub fn weighted_score(
    rating_count: i64,
    average: Option<f64>,
    baseline: &RatingBaseline,
    prior_coefficient: f64,
) -> Option<f64> {
    let global_mean = baseline.global_mean?;
    let average = match average {
        Some(avg) if rating_count > 0 => avg,
        _ => return Some(global_mean),
    };

    let n = rating_count as f64;
    let m = prior_coefficient * baseline.user_count as f64;
    Some((n / (n + m)) * average + (m / (n + m)) * global_mean)
}

/// По убыванию оценки, при равенстве по возрастанию id; фильмы без оценки в конце
pub fn rank(mut rated: Vec<WeightedRating>, n: usize) -> Vec<WeightedRating> {
    rated.sort_by(|a, b| {
        let by_score = match (a.score, b.score) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_score.then(a.movie_id.cmp(&b.movie_id))
    });
    rated.truncate(n);
    rated
}

pub struct RatingAggregator<S> {
    store: Arc<S>,
    config: RatingConfig,
}

impl<S> Clone for RatingAggregator<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S> RatingAggregator<S>
where
    S: CatalogStore + RatingStore,
{
    pub fn new(store: Arc<S>, config: RatingConfig) -> Self {
        Self { store, config }
    }

    /// Повторная оценка того же пользователя перезаписывает прежнюю
    pub async fn upsert_rating(
        &self,
        movie_id: i64,
        requester: &Requester,
        rating: i16,
    ) -> BookingResult<MovieRating> {
        RatingInput { rating }.validate()?;

        if !self.store.movie_exists(movie_id).await? {
            return Err(BookingError::not_found("movie", movie_id));
        }
        let user_id = self
            .store
            .resolve_user(requester)
            .await?
            .ok_or_else(|| BookingError::not_found("user", requester))?;

        let stored = self.store.upsert_rating(movie_id, user_id, rating).await?;
        info!("User {} rated movie {} with {}", user_id, movie_id, rating);
        Ok(stored)
    }

    pub async fn user_rating(&self, movie_id: i64, requester: &Requester) -> BookingResult<Option<MovieRating>> {
        let user_id = self
            .store
            .resolve_user(requester)
            .await?
            .ok_or_else(|| BookingError::not_found("user", requester))?;
        Ok(self.store.user_rating(movie_id, user_id).await?)
    }

    pub async fn weighted_rating(&self, movie_id: i64) -> BookingResult<WeightedRating> {
        let stats = self
            .store
            .rating_stats(movie_id)
            .await?
            .ok_or_else(|| BookingError::not_found("movie", movie_id))?;
        let baseline = self.store.rating_baseline().await?;
        Ok(self.view(stats, &baseline))
    }

    /// Взвешенная оценка и все оценки пользователей для фильма
    pub async fn rating_details(&self, movie_id: i64) -> BookingResult<MovieRatingDetails> {
        let summary = self.weighted_rating(movie_id).await?;
        let ratings = self.store.movie_ratings(movie_id).await?;
        Ok(MovieRatingDetails { summary, ratings })
    }

    pub async fn top_n(&self, n: usize) -> BookingResult<Vec<WeightedRating>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let baseline = self.store.rating_baseline().await?;
        let rated = self
            .store
            .all_rating_stats()
            .await?
            .into_iter()
            .map(|stats| self.view(stats, &baseline))
            .collect();
        Ok(rank(rated, n))
    }

    fn view(&self, stats: MovieRatingStats, baseline: &RatingBaseline) -> WeightedRating {
        let score = weighted_score(
            stats.rating_count,
            stats.average,
            baseline,
            self.config.prior_coefficient,
        );
        WeightedRating {
            movie_id: stats.movie_id,
            name: stats.name,
            rating_count: stats.rating_count,
            average: stats.average,
            score,
        }
    }
}

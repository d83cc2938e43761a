use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct MovieRating {
    pub movie_id: i64,
    pub user_id: i64,
    pub rating: i16,
}

#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct RatingInput {
    #[validate(range(min = 1, max = 10, message = "rating must be between 1 and 10"))]
    pub rating: i16,
}

/// Сырые агрегаты по одному фильму
#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct MovieRatingStats {
    pub movie_id: i64,
    pub name: String,
    pub rating_count: i64,
    pub average: Option<f64>,
}

/// Глобальные величины: средняя оценка C и число пользователей U
#[derive(Debug, Clone, Copy, FromRow, PartialEq)]
pub struct RatingBaseline {
    pub global_mean: Option<f64>,
    pub user_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightedRating {
    pub movie_id: i64,
    pub name: String,
    pub rating_count: i64,
    pub average: Option<f64>,
    /// None, пока в системе нет ни одной оценки
    pub score: Option<f64>,
}

/// Взвешенная оценка фильма вместе с оценками отдельных пользователей
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieRatingDetails {
    #[serde(flatten)]
    pub summary: WeightedRating,
    pub ratings: Vec<MovieRating>,
}

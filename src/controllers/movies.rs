use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use super::requester_from_path;
use crate::error::BookingError;
use crate::models::Requester;
use crate::AppState;

const DEFAULT_TOP: usize = 10;
const MAX_TOP: usize = 100;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/movies/top", get(top_movies))
        .route("/movies/{id}/rating", get(rating_details).put(upsert_rating))
        .route("/movies/{id}/ratings/{user}", get(user_rating))
}

#[derive(Debug, Deserialize)]
struct TopQuery {
    n: Option<usize>,
}

// GET /api/movies/top?n=5
async fn top_movies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TopQuery>,
) -> Result<impl IntoResponse, BookingError> {
    let n = params.n.unwrap_or(DEFAULT_TOP).min(MAX_TOP);

    if let Some(cached) = state.cache.get_top_movies(n).await {
        return Ok(Json(cached));
    }
    let ranking = state.ratings.top_n(n).await?;
    state.cache.save_top_movies(n, &ranking).await;
    Ok(Json(ranking))
}

// GET /api/movies/{id}/rating
async fn rating_details(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<i64>,
) -> Result<impl IntoResponse, BookingError> {
    Ok(Json(state.ratings.rating_details(movie_id).await?))
}

// PUT /api/movies/{id}/rating
#[derive(Debug, Deserialize)]
struct RateBody {
    user: Requester,
    rating: i16,
}

async fn upsert_rating(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<i64>,
    Json(body): Json<RateBody>,
) -> Result<impl IntoResponse, BookingError> {
    let stored = state.ratings.upsert_rating(movie_id, &body.user, body.rating).await?;
    state.cache.invalidate_top_movies().await;
    Ok(Json(stored))
}

// GET /api/movies/{id}/ratings/{user}
async fn user_rating(
    State(state): State<Arc<AppState>>,
    Path((movie_id, user)): Path<(i64, String)>,
) -> Result<impl IntoResponse, BookingError> {
    let rating = state
        .ratings
        .user_rating(movie_id, &requester_from_path(user))
        .await?;
    Ok(Json(rating))
}

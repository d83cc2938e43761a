use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use std::sync::Arc;

use crate::error::BookingError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/halls/{id}/seats", get(get_hall_seats))
        .route("/halls/{id}/free-slots/{date}", get(get_free_slots))
}

// GET /api/halls/{id}/seats
async fn get_hall_seats(
    State(state): State<Arc<AppState>>,
    Path(hall_id): Path<i64>,
) -> Result<impl IntoResponse, BookingError> {
    Ok(Json(state.screenings.hall_seats(hall_id).await?))
}

// GET /api/halls/{id}/free-slots/2025-01-01
async fn get_free_slots(
    State(state): State<Arc<AppState>>,
    Path((hall_id, date)): Path<(i64, NaiveDate)>,
) -> Result<impl IntoResponse, BookingError> {
    let slots: Vec<String> = state
        .screenings
        .free_slots(hall_id, date)
        .await?
        .iter()
        .map(|t| t.format("%H:%M").to_string())
        .collect();
    Ok(Json(slots))
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::BookingError;
use crate::models::{BookingRequest, NewScreening, Requester, ScreeningUpdate};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/screenings", get(list_screenings).post(create_screening))
        .route(
            "/screenings/{id}",
            get(get_screening).put(update_screening).delete(delete_screening),
        )
        .route("/screenings/{id}/reserved-seats", get(get_reserved_seats))
        .route("/screenings/{id}/book", post(book_seats))
}

/* ---------- SCREENINGS ---------- */

// GET /api/screenings
async fn list_screenings(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, BookingError> {
    Ok(Json(state.screenings.list().await?))
}

// POST /api/screenings
async fn create_screening(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewScreening>,
) -> Result<impl IntoResponse, BookingError> {
    let created = state.screenings.create(&req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

// GET /api/screenings/{id}
async fn get_screening(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, BookingError> {
    Ok(Json(state.screenings.get(id).await?))
}

// PUT /api/screenings/{id}
async fn update_screening(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<ScreeningUpdate>,
) -> Result<impl IntoResponse, BookingError> {
    Ok(Json(state.screenings.update(id, &req).await?))
}

// DELETE /api/screenings/{id}
async fn delete_screening(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, BookingError> {
    state.screenings.delete(id).await?;
    state.cache.invalidate_reserved_seats(id).await;
    Ok(StatusCode::NO_CONTENT)
}

/* ---------- SEATS ---------- */

// GET /api/screenings/{id}/reserved-seats
async fn get_reserved_seats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, BookingError> {
    // Поколение читаем до базы: бронь, закоммиченная между чтением и
    // сохранением, сдвинет его, и сохранённый список никто не прочитает
    let generation = state.cache.reserved_seats_generation(id).await;
    if let Some(generation) = generation {
        if let Some(cached) = state.cache.get_reserved_seats(id, generation).await {
            return Ok(Json(cached));
        }
    }
    let seats = state.reservations.reserved_seats(id).await?;
    if let Some(generation) = generation {
        state.cache.save_reserved_seats(id, generation, &seats).await;
    }
    Ok(Json(seats))
}

// POST /api/screenings/{id}/book
#[derive(Debug, Deserialize)]
struct BookSeatsBody {
    user: Requester,
    seat_ids: Vec<i64>,
}

async fn book_seats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<BookSeatsBody>,
) -> Result<impl IntoResponse, BookingError> {
    let request = BookingRequest {
        screening_id: id,
        requester: body.user,
        seat_ids: body.seat_ids,
    };
    let receipt = state.reservations.book_seats(&request).await?;
    state.cache.invalidate_reserved_seats(id).await;
    Ok((StatusCode::CREATED, Json(receipt)))
}

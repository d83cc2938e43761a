use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use super::requester_from_path;
use crate::error::BookingError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tickets/{id}", get(get_ticket))
        .route("/users/{user}/tickets", get(user_tickets))
}

// GET /api/tickets/{id}
async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<i64>,
) -> Result<impl IntoResponse, BookingError> {
    Ok(Json(state.reservations.ticket(ticket_id).await?))
}

// GET /api/users/{user}/tickets
async fn user_tickets(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
) -> Result<impl IntoResponse, BookingError> {
    let tickets = state
        .reservations
        .tickets_for_user(&requester_from_path(user))
        .await?;
    Ok(Json(tickets))
}

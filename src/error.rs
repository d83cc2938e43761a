use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Ошибки слоя хранения. Наружу отдаются без деталей.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },

    #[error("seats already reserved for screening {screening_id}: {}", join_ids(.seat_ids))]
    SeatsTaken { screening_id: i64, seat_ids: Vec<i64> },

    #[error("screening {screening_id} has {available} seats left, {requested} requested")]
    CapacityExhausted {
        screening_id: i64,
        requested: i32,
        available: i32,
    },

    #[error("screening {screening_id} still has {reservations} live seat reservations")]
    ScreeningInUse { screening_id: i64, reservations: i64 },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage failure")]
    Storage(#[from] StoreError),
}

pub type BookingResult<T> = Result<T, BookingError>;

fn join_ids(ids: &[i64]) -> String {
    ids.iter().map(i64::to_string).collect::<Vec<_>>().join(", ")
}

impl BookingError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        BookingError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Конфликтные ошибки: повторная попытка с другим набором мест может пройти
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            BookingError::SeatsTaken { .. }
                | BookingError::CapacityExhausted { .. }
                | BookingError::ScreeningInUse { .. }
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BookingError::NotFound { .. } => StatusCode::NOT_FOUND,
            BookingError::Validation(_) => StatusCode::BAD_REQUEST,
            BookingError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ if self.is_conflict() => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for BookingError {
    fn from(errors: validator::ValidationErrors) -> Self {
        BookingError::Validation(errors.to_string())
    }
}

impl From<sqlx::Error> for BookingError {
    fn from(e: sqlx::Error) -> Self {
        BookingError::Storage(StoreError::Database(e))
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        if let BookingError::Storage(ref e) = self {
            tracing::error!("storage failure: {:?}", e);
        }
        let body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
        });
        (self.status_code(), Json(body)).into_response()
    }
}

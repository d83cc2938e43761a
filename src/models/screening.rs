use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Screening {
    pub id: i64,
    pub movie_id: i64,
    pub hall_id: i64,
    pub starts_at: NaiveDateTime,
    pub total_seats: i32,
    pub available_seats: i32,
    /// Цена фильма на момент создания сеанса
    pub ticket_price: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewScreening {
    pub movie_id: i64,
    pub hall_id: i64,
    pub starts_at: NaiveDateTime,
}

/// Административная правка сеанса
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ScreeningUpdate {
    pub movie_id: i64,
    pub starts_at: NaiveDateTime,
    #[validate(range(min = 0))]
    pub total_seats: i32,
    #[validate(range(min = 0))]
    pub available_seats: i32,
}

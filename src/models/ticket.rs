use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    pub id: i64,
    pub movie_id: i64,
    pub user_id: i64,
    pub show_time: NaiveDateTime,
    pub price: Decimal,
    pub hall_seat_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub movie_id: i64,
    pub user_id: i64,
    pub show_time: NaiveDateTime,
    pub price: Decimal,
    pub hall_seat_id: i64,
}

/// Место, занятое на конкретный сеанс (seat_for_screening)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeatReservation {
    pub id: i64,
    pub screening_id: i64,
    pub hall_seat_id: i64,
    pub user_id: i64,
    pub ticket_id: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReservedSeat {
    pub reservation_id: i64,
    pub screening_id: i64,
    pub hall_seat_id: i64,
    pub row_number: i32,
    pub seat_number: i32,
    pub user_id: i64,
}

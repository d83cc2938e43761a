use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Геометрия зала: ряды × мест в ряду
#[derive(Debug, Clone, Copy, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct HallGeometry {
    pub rows: i32,
    pub seats_per_row: i32,
}

impl HallGeometry {
    /// None, если произведение не помещается в i32
    pub fn capacity(&self) -> Option<i32> {
        self.rows.checked_mul(self.seats_per_row)
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct HallSeat {
    pub id: i64,
    pub hall_id: i64,
    pub row_number: i32,
    pub seat_number: i32,
}

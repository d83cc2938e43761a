use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use super::Ticket;

/// Кто бронирует: id пользователя или его username
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Requester {
    Id(i64),
    Username(String),
}

impl fmt::Display for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requester::Id(id) => write!(f, "{}", id),
            Requester::Username(name) => f.write_str(name),
        }
    }
}

impl From<&str> for Requester {
    fn from(name: &str) -> Self {
        Requester::Username(name.to_string())
    }
}

impl From<i64> for Requester {
    fn from(id: i64) -> Self {
        Requester::Id(id)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BookingRequest {
    pub screening_id: i64,
    pub requester: Requester,
    #[validate(length(min = 1, message = "no seats selected"))]
    pub seat_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingReceipt {
    pub screening_id: i64,
    pub user_id: i64,
    pub tickets: Vec<Ticket>,
    pub available_seats: i32,
}

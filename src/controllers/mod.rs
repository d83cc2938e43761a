pub mod halls;
pub mod movies;
pub mod screenings;
pub mod tickets;

use axum::Router;
use std::sync::Arc;

use crate::models::Requester;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(screenings::routes())
        .merge(halls::routes())
        .merge(movies::routes())
        .merge(tickets::routes())
}

// "42" -> Requester::Id(42), всё остальное - username
fn requester_from_path(raw: String) -> Requester {
    match raw.parse::<i64>() {
        Ok(id) => Requester::Id(id),
        Err(_) => Requester::Username(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_segment_becomes_requester() {
        assert_eq!(requester_from_path("17".into()), Requester::Id(17));
        assert_eq!(requester_from_path("alice".into()), Requester::Username("alice".into()));
    }
}

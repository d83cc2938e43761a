#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::sync::Arc;

use cinema_booking::config::{BookingConfig, RatingConfig};
use cinema_booking::models::{BookingRequest, NewScreening, Requester, Screening};
use cinema_booking::services::{RatingAggregator, ReservationEngine, ScreeningManager};
use cinema_booking::store::MemoryStore;

pub struct Cinema {
    pub store: Arc<MemoryStore>,
    pub engine: ReservationEngine<MemoryStore>,
    pub screenings: ScreeningManager<MemoryStore>,
    pub ratings: RatingAggregator<MemoryStore>,
}

impl Cinema {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            engine: ReservationEngine::new(store.clone()),
            screenings: ScreeningManager::new(store.clone(), BookingConfig::default().slot_grid),
            ratings: RatingAggregator::new(store.clone(), RatingConfig::default()),
            store,
        }
    }

    pub async fn screening_in_new_hall(&self, rows: i32, seats_per_row: i32, price: Decimal) -> Screening {
        let hall_id = self.store.add_hall(rows, seats_per_row);
        let movie_id = self.store.add_movie("Stalker", price);
        self.screenings
            .create(&NewScreening {
                movie_id,
                hall_id,
                starts_at: at(2025, 3, 14, 20, 0),
            })
            .await
            .expect("screening should be created")
    }

    pub async fn available(&self, screening_id: i64) -> i32 {
        self.screenings
            .get(screening_id)
            .await
            .expect("screening exists")
            .available_seats
    }

    /// available == total - число живых броней
    pub async fn assert_capacity_invariant(&self, screening_id: i64) {
        let screening = self.screenings.get(screening_id).await.expect("screening exists");
        let live = self.store.reservation_count(screening_id) as i32;
        assert_eq!(
            screening.available_seats,
            screening.total_seats - live,
            "available {} != total {} - live {}",
            screening.available_seats,
            screening.total_seats,
            live
        );
    }
}

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

pub fn price(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

pub fn booking(screening_id: i64, who: impl Into<Requester>, seat_ids: &[i64]) -> BookingRequest {
    BookingRequest {
        screening_id,
        requester: who.into(),
        seat_ids: seat_ids.to_vec(),
    }
}

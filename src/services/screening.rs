use chrono::{NaiveDate, NaiveTime, Timelike};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

use crate::error::{BookingError, BookingResult};
use crate::models::{HallSeat, NewScreening, Screening, ScreeningUpdate};
use crate::store::{CatalogStore, DeleteOutcome, ScreeningStore};

pub struct ScreeningManager<S> {
    store: Arc<S>,
    slot_grid: Vec<NaiveTime>,
}

impl<S> Clone for ScreeningManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            slot_grid: self.slot_grid.clone(),
        }
    }
}

impl<S> ScreeningManager<S>
where
    S: CatalogStore + ScreeningStore,
{
    pub fn new(store: Arc<S>, slot_grid: Vec<NaiveTime>) -> Self {
        Self { store, slot_grid }
    }

    /// Вместимость = ряды × места в ряду, available = total
    pub async fn create(&self, screening: &NewScreening) -> BookingResult<Screening> {
        let geometry = self
            .store
            .hall_geometry(screening.hall_id)
            .await?
            .ok_or_else(|| BookingError::not_found("hall", screening.hall_id))?;
        let total_seats = geometry.capacity().ok_or_else(|| {
            BookingError::Validation(format!(
                "hall {} is too large: {} rows of {} seats",
                screening.hall_id, geometry.rows, geometry.seats_per_row
            ))
        })?;
        let price = self
            .store
            .movie_price(screening.movie_id)
            .await?
            .ok_or_else(|| BookingError::not_found("movie", screening.movie_id))?;

        let created = self
            .store
            .insert_screening(screening, total_seats, price)
            .await?;
        info!(
            "Created screening {} of movie {} in hall {} at {} ({} seats)",
            created.id, created.movie_id, created.hall_id, created.starts_at, created.total_seats
        );
        Ok(created)
    }

    pub async fn get(&self, screening_id: i64) -> BookingResult<Screening> {
        self.store
            .screening(screening_id)
            .await?
            .ok_or_else(|| BookingError::not_found("screening", screening_id))
    }

    pub async fn list(&self) -> BookingResult<Vec<Screening>> {
        Ok(self.store.screenings().await?)
    }

    pub async fn update(&self, screening_id: i64, update: &ScreeningUpdate) -> BookingResult<Screening> {
        update.validate()?;
        if update.available_seats > update.total_seats {
            return Err(BookingError::Validation(
                "available seats cannot be greater than total seats".to_string(),
            ));
        }
        if self.store.movie_price(update.movie_id).await?.is_none() {
            return Err(BookingError::not_found("movie", update.movie_id));
        }
        if !self.store.update_screening(screening_id, update).await? {
            return Err(BookingError::not_found("screening", screening_id));
        }
        info!("Updated screening {}", screening_id);
        self.get(screening_id).await
    }

    /// Сеанс с живыми бронями не удаляется
    pub async fn delete(&self, screening_id: i64) -> BookingResult<()> {
        match self.store.delete_screening(screening_id).await? {
            DeleteOutcome::Deleted => {
                info!("Deleted screening {}", screening_id);
                Ok(())
            }
            DeleteOutcome::Missing => Err(BookingError::not_found("screening", screening_id)),
            DeleteOutcome::InUse { reservations } => {
                warn!(
                    "Refusing to delete screening {}: {} live reservations",
                    screening_id, reservations
                );
                Err(BookingError::ScreeningInUse {
                    screening_id,
                    reservations,
                })
            }
        }
    }

    /// Свободные слоты сетки на дату; сравнение только по часам и минутам
    pub async fn free_slots(&self, hall_id: i64, date: NaiveDate) -> BookingResult<Vec<NaiveTime>> {
        if self.store.hall_geometry(hall_id).await?.is_none() {
            return Err(BookingError::not_found("hall", hall_id));
        }
        let booked: HashSet<(u32, u32)> = self
            .store
            .screenings_in_hall_on(hall_id, date)
            .await?
            .iter()
            .map(|s| (s.starts_at.hour(), s.starts_at.minute()))
            .collect();

        Ok(self
            .slot_grid
            .iter()
            .copied()
            .filter(|slot| !booked.contains(&(slot.hour(), slot.minute())))
            .collect())
    }

    pub async fn hall_seats(&self, hall_id: i64) -> BookingResult<Vec<HallSeat>> {
        if self.store.hall_geometry(hall_id).await?.is_none() {
            return Err(BookingError::not_found("hall", hall_id));
        }
        Ok(self.store.hall_seats(hall_id).await?)
    }
}

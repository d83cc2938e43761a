//! In-process store.
//!
//! Bookings on the same screening are serialized by a per-screening async
//! mutex that a unit of work takes the first time it touches the screening
//! and releases on commit or rollback. Writes are staged inside the unit and
//! applied to the shared state in one step on commit.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::{
    CatalogStore, DeleteOutcome, RatingStore, ReservationStore, ScreeningStore, StoreResult, UnitOfWork,
};
use crate::error::StoreError;
use crate::models::{
    HallGeometry, HallSeat, MovieRating, MovieRatingStats, NewScreening, NewTicket, RatingBaseline,
    Requester, ReservedSeat, Screening, ScreeningUpdate, SeatReservation, Ticket,
};

#[derive(Debug, Clone)]
struct MemoryMovie {
    name: String,
    price: Decimal,
}

// Отдельный счётчик на каждую "таблицу", как sequence в Postgres
#[derive(Debug, Default)]
struct Sequences {
    user: i64,
    movie: i64,
    hall: i64,
    seat: i64,
    screening: i64,
    ticket: i64,
    reservation: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Debug, Default)]
struct MemoryState {
    users: BTreeMap<i64, String>,
    movies: BTreeMap<i64, MemoryMovie>,
    halls: BTreeMap<i64, HallGeometry>,
    hall_seats: BTreeMap<i64, HallSeat>,
    screenings: BTreeMap<i64, Screening>,
    tickets: BTreeMap<i64, Ticket>,
    /// Ключ (screening_id, hall_seat_id) — не больше одной брони на место
    reservations: BTreeMap<(i64, i64), SeatReservation>,
    ratings: BTreeMap<(i64, i64), i16>,
    seq: Sequences,
}

impl MemoryState {
    fn resolve_user(&self, requester: &Requester) -> Option<i64> {
        match requester {
            Requester::Id(id) => self.users.contains_key(id).then_some(*id),
            Requester::Username(name) => self
                .users
                .iter()
                .find(|(_, username)| *username == name)
                .map(|(id, _)| *id),
        }
    }

    fn reservations_for(&self, screening_id: i64) -> usize {
        self.reservations
            .range((screening_id, i64::MIN)..=(screening_id, i64::MAX))
            .count()
    }

    fn stats_for(&self, movie_id: i64, movie: &MemoryMovie) -> MovieRatingStats {
        let ratings: Vec<i64> = self
            .ratings
            .range((movie_id, i64::MIN)..=(movie_id, i64::MAX))
            .map(|(_, rating)| i64::from(*rating))
            .collect();
        let rating_count = ratings.len() as i64;
        let average = (rating_count > 0).then(|| ratings.iter().sum::<i64>() as f64 / rating_count as f64);
        MovieRatingStats {
            movie_id,
            name: movie.name.clone(),
            rating_count,
            average,
        }
    }
}

#[derive(Default)]
struct Inner {
    state: Mutex<MemoryState>,
    screening_locks: Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.inner
            .state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store state poisoned".to_string()))
    }

    // Для заполнения каталога: отравленный мьютекс здесь не критичен
    fn seed(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn lock_screening(&self, screening_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .inner
                .screening_locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            locks.entry(screening_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    fn forget_screening_lock(&self, screening_id: i64) {
        let mut locks = self
            .inner
            .screening_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.remove(&screening_id);
    }

    /* ---------- catalog seeding ---------- */

    pub fn add_user(&self, username: &str) -> i64 {
        let mut state = self.seed();
        let id = next_id(&mut state.seq.user);
        state.users.insert(id, username.to_string());
        id
    }

    pub fn add_movie(&self, name: &str, price: Decimal) -> i64 {
        let mut state = self.seed();
        let id = next_id(&mut state.seq.movie);
        state.movies.insert(
            id,
            MemoryMovie {
                name: name.to_string(),
                price,
            },
        );
        id
    }

    pub fn set_movie_price(&self, movie_id: i64, price: Decimal) {
        if let Some(movie) = self.seed().movies.get_mut(&movie_id) {
            movie.price = price;
        }
    }

    /// Создаёт зал и все его места, ряды и номера с единицы
    pub fn add_hall(&self, rows: i32, seats_per_row: i32) -> i64 {
        let mut state = self.seed();
        let hall_id = next_id(&mut state.seq.hall);
        state.halls.insert(hall_id, HallGeometry { rows, seats_per_row });
        for row_number in 1..=rows {
            for seat_number in 1..=seats_per_row {
                let id = next_id(&mut state.seq.seat);
                state.hall_seats.insert(
                    id,
                    HallSeat {
                        id,
                        hall_id,
                        row_number,
                        seat_number,
                    },
                );
            }
        }
        hall_id
    }

    /* ---------- inspection ---------- */

    pub fn reservation_count(&self, screening_id: i64) -> usize {
        self.seed().reservations_for(screening_id)
    }

    pub fn ticket_count(&self) -> usize {
        self.seed().tickets.len()
    }

    pub fn rating_rows(&self, movie_id: i64) -> usize {
        self.seed()
            .ratings
            .range((movie_id, i64::MIN)..=(movie_id, i64::MAX))
            .count()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn hall_geometry(&self, hall_id: i64) -> StoreResult<Option<HallGeometry>> {
        Ok(self.state()?.halls.get(&hall_id).copied())
    }

    async fn movie_price(&self, movie_id: i64) -> StoreResult<Option<Decimal>> {
        Ok(self.state()?.movies.get(&movie_id).map(|m| m.price))
    }

    async fn hall_seats(&self, hall_id: i64) -> StoreResult<Vec<HallSeat>> {
        let state = self.state()?;
        let mut seats: Vec<HallSeat> = state
            .hall_seats
            .values()
            .filter(|s| s.hall_id == hall_id)
            .cloned()
            .collect();
        seats.sort_by_key(|s| (s.row_number, s.seat_number));
        Ok(seats)
    }

    async fn resolve_user(&self, requester: &Requester) -> StoreResult<Option<i64>> {
        Ok(self.state()?.resolve_user(requester))
    }
}

#[async_trait]
impl ScreeningStore for MemoryStore {
    async fn insert_screening(
        &self,
        screening: &NewScreening,
        total_seats: i32,
        ticket_price: Decimal,
    ) -> StoreResult<Screening> {
        let mut state = self.state()?;
        let id = next_id(&mut state.seq.screening);
        let created = Screening {
            id,
            movie_id: screening.movie_id,
            hall_id: screening.hall_id,
            starts_at: screening.starts_at,
            total_seats,
            available_seats: total_seats,
            ticket_price,
        };
        state.screenings.insert(id, created.clone());
        Ok(created)
    }

    async fn screening(&self, screening_id: i64) -> StoreResult<Option<Screening>> {
        Ok(self.state()?.screenings.get(&screening_id).cloned())
    }

    async fn screenings(&self) -> StoreResult<Vec<Screening>> {
        let mut all: Vec<Screening> = self.state()?.screenings.values().cloned().collect();
        all.sort_by_key(|s| (s.starts_at, s.id));
        Ok(all)
    }

    async fn update_screening(&self, screening_id: i64, update: &ScreeningUpdate) -> StoreResult<bool> {
        let _guard = self.lock_screening(screening_id).await;
        let mut state = self.state()?;
        let Some(screening) = state.screenings.get_mut(&screening_id) else {
            return Ok(false);
        };
        screening.movie_id = update.movie_id;
        screening.starts_at = update.starts_at;
        screening.total_seats = update.total_seats;
        screening.available_seats = update.available_seats;
        Ok(true)
    }

    async fn delete_screening(&self, screening_id: i64) -> StoreResult<DeleteOutcome> {
        let guard = self.lock_screening(screening_id).await;
        let outcome = {
            let mut state = self.state()?;
            if !state.screenings.contains_key(&screening_id) {
                DeleteOutcome::Missing
            } else {
                let reservations = state.reservations_for(screening_id) as i64;
                if reservations > 0 {
                    DeleteOutcome::InUse { reservations }
                } else {
                    state.screenings.remove(&screening_id);
                    DeleteOutcome::Deleted
                }
            }
        };
        drop(guard);
        if outcome == DeleteOutcome::Deleted {
            self.forget_screening_lock(screening_id);
        }
        Ok(outcome)
    }

    async fn screenings_in_hall_on(&self, hall_id: i64, date: NaiveDate) -> StoreResult<Vec<Screening>> {
        let mut found: Vec<Screening> = self
            .state()?
            .screenings
            .values()
            .filter(|s| s.hall_id == hall_id && s.starts_at.date() == date)
            .cloned()
            .collect();
        found.sort_by_key(|s| s.starts_at);
        Ok(found)
    }

    async fn reserved_seats(&self, screening_id: i64) -> StoreResult<Vec<ReservedSeat>> {
        let state = self.state()?;
        let mut seats: Vec<ReservedSeat> = state
            .reservations
            .range((screening_id, i64::MIN)..=(screening_id, i64::MAX))
            .filter_map(|(_, r)| {
                state.hall_seats.get(&r.hall_seat_id).map(|seat| ReservedSeat {
                    reservation_id: r.id,
                    screening_id: r.screening_id,
                    hall_seat_id: seat.id,
                    row_number: seat.row_number,
                    seat_number: seat.seat_number,
                    user_id: r.user_id,
                })
            })
            .collect();
        seats.sort_by_key(|s| (s.row_number, s.seat_number));
        Ok(seats)
    }

    async fn ticket(&self, ticket_id: i64) -> StoreResult<Option<Ticket>> {
        Ok(self.state()?.tickets.get(&ticket_id).cloned())
    }

    async fn tickets_for_user(&self, user_id: i64) -> StoreResult<Vec<Ticket>> {
        let mut tickets: Vec<Ticket> = self
            .state()?
            .tickets
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.show_time.cmp(&a.show_time).then(a.id.cmp(&b.id)));
        Ok(tickets)
    }
}

#[async_trait]
impl RatingStore for MemoryStore {
    async fn movie_exists(&self, movie_id: i64) -> StoreResult<bool> {
        Ok(self.state()?.movies.contains_key(&movie_id))
    }

    async fn upsert_rating(&self, movie_id: i64, user_id: i64, rating: i16) -> StoreResult<MovieRating> {
        self.state()?.ratings.insert((movie_id, user_id), rating);
        Ok(MovieRating {
            movie_id,
            user_id,
            rating,
        })
    }

    async fn user_rating(&self, movie_id: i64, user_id: i64) -> StoreResult<Option<MovieRating>> {
        Ok(self
            .state()?
            .ratings
            .get(&(movie_id, user_id))
            .map(|rating| MovieRating {
                movie_id,
                user_id,
                rating: *rating,
            }))
    }

    async fn movie_ratings(&self, movie_id: i64) -> StoreResult<Vec<MovieRating>> {
        Ok(self
            .state()?
            .ratings
            .range((movie_id, i64::MIN)..=(movie_id, i64::MAX))
            .map(|((movie_id, user_id), rating)| MovieRating {
                movie_id: *movie_id,
                user_id: *user_id,
                rating: *rating,
            })
            .collect())
    }

    async fn rating_stats(&self, movie_id: i64) -> StoreResult<Option<MovieRatingStats>> {
        let state = self.state()?;
        Ok(state.movies.get(&movie_id).map(|movie| state.stats_for(movie_id, movie)))
    }

    async fn all_rating_stats(&self) -> StoreResult<Vec<MovieRatingStats>> {
        let state = self.state()?;
        Ok(state
            .movies
            .iter()
            .map(|(id, movie)| state.stats_for(*id, movie))
            .collect())
    }

    async fn rating_baseline(&self) -> StoreResult<RatingBaseline> {
        let state = self.state()?;
        let count = state.ratings.len();
        let global_mean = (count > 0).then(|| {
            state.ratings.values().map(|r| i64::from(*r)).sum::<i64>() as f64 / count as f64
        });
        Ok(RatingBaseline {
            global_mean,
            user_count: state.users.len() as i64,
        })
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        Ok(Box::new(MemoryUnitOfWork {
            store: self.clone(),
            guards: HashMap::new(),
            tickets: Vec::new(),
            claims: Vec::new(),
            taken: HashMap::new(),
        }))
    }
}

pub struct MemoryUnitOfWork {
    store: MemoryStore,
    guards: HashMap<i64, OwnedMutexGuard<()>>,
    tickets: Vec<Ticket>,
    claims: Vec<SeatReservation>,
    /// screening_id -> сколько мест списано в этой единице работы
    taken: HashMap<i64, i32>,
}

impl MemoryUnitOfWork {
    async fn ensure_locked(&mut self, screening_id: i64) {
        if !self.guards.contains_key(&screening_id) {
            let guard = self.store.lock_screening(screening_id).await;
            self.guards.insert(screening_id, guard);
        }
    }

    fn is_claimed(&self, state: &MemoryState, screening_id: i64, hall_seat_id: i64) -> bool {
        state.reservations.contains_key(&(screening_id, hall_seat_id))
            || self
                .claims
                .iter()
                .any(|c| c.screening_id == screening_id && c.hall_seat_id == hall_seat_id)
    }

    fn staged_taken(&self, screening_id: i64) -> i32 {
        self.taken.get(&screening_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn resolve_user(&mut self, requester: &Requester) -> StoreResult<Option<i64>> {
        Ok(self.store.state()?.resolve_user(requester))
    }

    async fn screening(&mut self, screening_id: i64) -> StoreResult<Option<Screening>> {
        self.ensure_locked(screening_id).await;
        let taken = self.staged_taken(screening_id);
        Ok(self.store.state()?.screenings.get(&screening_id).map(|s| {
            let mut view = s.clone();
            view.available_seats -= taken;
            view
        }))
    }

    async fn seats_in_hall(&mut self, hall_id: i64, seat_ids: &[i64]) -> StoreResult<Vec<i64>> {
        let state = self.store.state()?;
        Ok(seat_ids
            .iter()
            .copied()
            .filter(|id| state.hall_seats.get(id).is_some_and(|s| s.hall_id == hall_id))
            .collect())
    }

    async fn reserved_among(&mut self, screening_id: i64, seat_ids: &[i64]) -> StoreResult<Vec<i64>> {
        self.ensure_locked(screening_id).await;
        let state = self.store.state()?;
        Ok(seat_ids
            .iter()
            .copied()
            .filter(|seat| self.is_claimed(&state, screening_id, *seat))
            .collect())
    }

    async fn movie_price(&mut self, movie_id: i64) -> StoreResult<Option<Decimal>> {
        Ok(self.store.state()?.movies.get(&movie_id).map(|m| m.price))
    }

    async fn insert_ticket(&mut self, ticket: &NewTicket) -> StoreResult<Ticket> {
        let id = next_id(&mut self.store.state()?.seq.ticket);
        let issued = Ticket {
            id,
            movie_id: ticket.movie_id,
            user_id: ticket.user_id,
            show_time: ticket.show_time,
            price: ticket.price,
            hall_seat_id: ticket.hall_seat_id,
        };
        self.tickets.push(issued.clone());
        Ok(issued)
    }

    async fn claim_seat(
        &mut self,
        screening_id: i64,
        hall_seat_id: i64,
        user_id: i64,
        ticket_id: i64,
    ) -> StoreResult<bool> {
        self.ensure_locked(screening_id).await;
        let mut state = self.store.state()?;
        if self.is_claimed(&state, screening_id, hall_seat_id) {
            return Ok(false);
        }
        let id = next_id(&mut state.seq.reservation);
        drop(state);
        self.claims.push(SeatReservation {
            id,
            screening_id,
            hall_seat_id,
            user_id,
            ticket_id,
        });
        Ok(true)
    }

    async fn take_capacity(&mut self, screening_id: i64, count: i32) -> StoreResult<Option<i32>> {
        self.ensure_locked(screening_id).await;
        let taken = self.staged_taken(screening_id);
        let available = match self.store.state()?.screenings.get(&screening_id) {
            Some(s) => s.available_seats - taken,
            None => return Ok(None),
        };
        if available < count {
            return Ok(None);
        }
        *self.taken.entry(screening_id).or_insert(0) += count;
        Ok(Some(available - count))
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryUnitOfWork {
            store,
            guards,
            tickets,
            claims,
            taken,
        } = *self;

        {
            let mut state = store.state()?;
            for ticket in tickets {
                state.tickets.insert(ticket.id, ticket);
            }
            for claim in claims {
                state.reservations.insert((claim.screening_id, claim.hall_seat_id), claim);
            }
            for (screening_id, count) in taken {
                if let Some(screening) = state.screenings.get_mut(&screening_id) {
                    screening.available_seats -= count;
                }
            }
        }

        // Блокировки сеансов отпускаем только после применения изменений
        drop(guards);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

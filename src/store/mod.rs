//! Storage seams of the booking core.
//!
//! The services never talk to sqlx or to in-process maps directly. They go
//! through these traits, which `PgStore` (PostgreSQL) and `MemoryStore`
//! (single process) both implement.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::StoreError;
use crate::models::{
    HallGeometry, HallSeat, MovieRating, MovieRatingStats, NewScreening, NewTicket, RatingBaseline,
    Requester, ReservedSeat, Screening, ScreeningUpdate, Ticket,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Каталог: залы, фильмы, пользователи. Ядро его только читает.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn hall_geometry(&self, hall_id: i64) -> StoreResult<Option<HallGeometry>>;

    /// Текущая цена фильма
    async fn movie_price(&self, movie_id: i64) -> StoreResult<Option<Decimal>>;

    /// Места зала в порядке (ряд, номер)
    async fn hall_seats(&self, hall_id: i64) -> StoreResult<Vec<HallSeat>>;

    async fn resolve_user(&self, requester: &Requester) -> StoreResult<Option<i64>>;
}

#[async_trait]
pub trait ScreeningStore: Send + Sync {
    async fn insert_screening(
        &self,
        screening: &NewScreening,
        total_seats: i32,
        ticket_price: Decimal,
    ) -> StoreResult<Screening>;

    async fn screening(&self, screening_id: i64) -> StoreResult<Option<Screening>>;

    async fn screenings(&self) -> StoreResult<Vec<Screening>>;

    /// false, если сеанса нет
    async fn update_screening(&self, screening_id: i64, update: &ScreeningUpdate) -> StoreResult<bool>;

    /// Удаляет сеанс, только если на него нет живых броней.
    async fn delete_screening(&self, screening_id: i64) -> StoreResult<DeleteOutcome>;

    async fn screenings_in_hall_on(&self, hall_id: i64, date: NaiveDate) -> StoreResult<Vec<Screening>>;

    async fn reserved_seats(&self, screening_id: i64) -> StoreResult<Vec<ReservedSeat>>;

    async fn ticket(&self, ticket_id: i64) -> StoreResult<Option<Ticket>>;

    async fn tickets_for_user(&self, user_id: i64) -> StoreResult<Vec<Ticket>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Missing,
    InUse { reservations: i64 },
}

#[async_trait]
pub trait RatingStore: Send + Sync {
    async fn movie_exists(&self, movie_id: i64) -> StoreResult<bool>;

    /// Вставка или перезапись оценки по ключу (movie, user)
    async fn upsert_rating(&self, movie_id: i64, user_id: i64, rating: i16) -> StoreResult<MovieRating>;

    async fn user_rating(&self, movie_id: i64, user_id: i64) -> StoreResult<Option<MovieRating>>;

    /// Все оценки фильма по возрастанию user_id
    async fn movie_ratings(&self, movie_id: i64) -> StoreResult<Vec<MovieRating>>;

    async fn rating_stats(&self, movie_id: i64) -> StoreResult<Option<MovieRatingStats>>;

    /// Агрегаты по всем фильмам, включая фильмы без оценок
    async fn all_rating_stats(&self) -> StoreResult<Vec<MovieRatingStats>>;

    async fn rating_baseline(&self) -> StoreResult<RatingBaseline>;
}

/// Источник единиц работы для бронирования
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>>;
}

/// Одна транзакция бронирования. Всё, что записано через неё, видно другим
/// только после `commit`; `rollback` или drop без commit отменяют всё.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn resolve_user(&mut self, requester: &Requester) -> StoreResult<Option<i64>>;

    /// Читает сеанс и блокирует его удаление до конца единицы работы.
    /// Если сеанс удалён параллельно, возвращает None.
    async fn screening(&mut self, screening_id: i64) -> StoreResult<Option<Screening>>;

    /// Какие из `seat_ids` действительно принадлежат залу
    async fn seats_in_hall(&mut self, hall_id: i64, seat_ids: &[i64]) -> StoreResult<Vec<i64>>;

    /// Какие из `seat_ids` уже заняты на сеанс
    async fn reserved_among(&mut self, screening_id: i64, seat_ids: &[i64]) -> StoreResult<Vec<i64>>;

    async fn movie_price(&mut self, movie_id: i64) -> StoreResult<Option<Decimal>>;

    async fn insert_ticket(&mut self, ticket: &NewTicket) -> StoreResult<Ticket>;

    /// Insert-or-fail по ключу (screening, seat). false: место уже занято.
    async fn claim_seat(
        &mut self,
        screening_id: i64,
        hall_seat_id: i64,
        user_id: i64,
        ticket_id: i64,
    ) -> StoreResult<bool>;

    /// Уменьшает available на `count`. None, если мест не хватает.
    async fn take_capacity(&mut self, screening_id: i64, count: i32) -> StoreResult<Option<i32>>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

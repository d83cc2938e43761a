use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use tracing::debug;

use super::{
    CatalogStore, DeleteOutcome, RatingStore, ReservationStore, ScreeningStore, StoreResult, UnitOfWork,
};
use crate::database::Database;
use crate::models::{
    HallGeometry, HallSeat, MovieRating, MovieRatingStats, NewScreening, NewTicket, RatingBaseline,
    Requester, ReservedSeat, Screening, ScreeningUpdate, Ticket,
};

const SCREENING_COLUMNS: &str =
    "id, movie_id, hall_id, starts_at, total_seats, available_seats, ticket_price";

const TICKET_COLUMNS: &str = "id, movie_id, user_id, show_time, price, hall_seat_id";

const RATING_STATS_SELECT: &str = r#"
    SELECT m.id AS movie_id,
           m.name,
           COUNT(r.rating) AS rating_count,
           AVG(r.rating)::FLOAT8 AS average
    FROM movies m
    LEFT JOIN movie_ratings r ON r.movie_id = m.id
"#;

#[derive(Clone)]
pub struct PgStore {
    db: Database,
}

impl PgStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

async fn resolve_user<'e, E>(executor: E, requester: &Requester) -> Result<Option<i64>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    match requester {
        Requester::Id(id) => {
            sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(executor)
                .await
        }
        Requester::Username(name) => {
            sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE username = $1")
                .bind(name)
                .fetch_optional(executor)
                .await
        }
    }
}

async fn movie_price<'e, E>(executor: E, movie_id: i64) -> Result<Option<Decimal>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar::<_, Decimal>("SELECT price FROM movies WHERE id = $1")
        .bind(movie_id)
        .fetch_optional(executor)
        .await
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn hall_geometry(&self, hall_id: i64) -> StoreResult<Option<HallGeometry>> {
        let geometry = sqlx::query_as::<_, HallGeometry>(
            r#"SELECT "rows", seats_per_row FROM halls WHERE id = $1"#,
        )
        .bind(hall_id)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(geometry)
    }

    async fn movie_price(&self, movie_id: i64) -> StoreResult<Option<Decimal>> {
        Ok(movie_price(&self.db.pool, movie_id).await?)
    }

    async fn hall_seats(&self, hall_id: i64) -> StoreResult<Vec<HallSeat>> {
        let seats = sqlx::query_as::<_, HallSeat>(
            "SELECT id, hall_id, row_number, seat_number
             FROM hall_seats
             WHERE hall_id = $1
             ORDER BY row_number, seat_number",
        )
        .bind(hall_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(seats)
    }

    async fn resolve_user(&self, requester: &Requester) -> StoreResult<Option<i64>> {
        Ok(resolve_user(&self.db.pool, requester).await?)
    }
}

#[async_trait]
impl ScreeningStore for PgStore {
    async fn insert_screening(
        &self,
        screening: &NewScreening,
        total_seats: i32,
        ticket_price: Decimal,
    ) -> StoreResult<Screening> {
        let created = sqlx::query_as::<_, Screening>(&format!(
            "INSERT INTO screenings (movie_id, hall_id, starts_at, total_seats, available_seats, ticket_price)
             VALUES ($1, $2, $3, $4, $4, $5)
             RETURNING {SCREENING_COLUMNS}"
        ))
        .bind(screening.movie_id)
        .bind(screening.hall_id)
        .bind(screening.starts_at)
        .bind(total_seats)
        .bind(ticket_price)
        .fetch_one(&self.db.pool)
        .await?;
        Ok(created)
    }

    async fn screening(&self, screening_id: i64) -> StoreResult<Option<Screening>> {
        let screening = sqlx::query_as::<_, Screening>(&format!(
            "SELECT {SCREENING_COLUMNS} FROM screenings WHERE id = $1"
        ))
        .bind(screening_id)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(screening)
    }

    async fn screenings(&self) -> StoreResult<Vec<Screening>> {
        let screenings = sqlx::query_as::<_, Screening>(&format!(
            "SELECT {SCREENING_COLUMNS} FROM screenings ORDER BY starts_at, id"
        ))
        .fetch_all(&self.db.pool)
        .await?;
        Ok(screenings)
    }

    async fn update_screening(&self, screening_id: i64, update: &ScreeningUpdate) -> StoreResult<bool> {
        let affected = sqlx::query(
            "UPDATE screenings
             SET movie_id = $2,
                 starts_at = $3,
                 total_seats = $4,
                 available_seats = $5
             WHERE id = $1",
        )
        .bind(screening_id)
        .bind(update.movie_id)
        .bind(update.starts_at)
        .bind(update.total_seats)
        .bind(update.available_seats)
        .execute(&self.db.pool)
        .await?
        .rows_affected();
        Ok(affected > 0)
    }

    async fn delete_screening(&self, screening_id: i64) -> StoreResult<DeleteOutcome> {
        let mut tx = self.db.pool.begin().await?;

        // Блокируем строку сеанса: новые брони ждут, пока мы не решим
        let locked = sqlx::query_scalar::<_, i64>("SELECT id FROM screenings WHERE id = $1 FOR UPDATE")
            .bind(screening_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Ok(DeleteOutcome::Missing);
        }

        let reservations = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM seat_reservations WHERE screening_id = $1",
        )
        .bind(screening_id)
        .fetch_one(&mut *tx)
        .await?;
        if reservations > 0 {
            tx.rollback().await?;
            return Ok(DeleteOutcome::InUse { reservations });
        }

        sqlx::query("DELETE FROM screenings WHERE id = $1")
            .bind(screening_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(DeleteOutcome::Deleted)
    }

    async fn screenings_in_hall_on(&self, hall_id: i64, date: NaiveDate) -> StoreResult<Vec<Screening>> {
        let screenings = sqlx::query_as::<_, Screening>(&format!(
            "SELECT {SCREENING_COLUMNS}
             FROM screenings
             WHERE hall_id = $1 AND starts_at::date = $2
             ORDER BY starts_at"
        ))
        .bind(hall_id)
        .bind(date)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(screenings)
    }

    async fn reserved_seats(&self, screening_id: i64) -> StoreResult<Vec<ReservedSeat>> {
        let seats = sqlx::query_as::<_, ReservedSeat>(
            r#"
            SELECT sr.id AS reservation_id,
                   sr.screening_id,
                   hs.id AS hall_seat_id,
                   hs.row_number,
                   hs.seat_number,
                   sr.user_id
            FROM seat_reservations sr
            INNER JOIN hall_seats hs ON hs.id = sr.hall_seat_id
            WHERE sr.screening_id = $1
            ORDER BY hs.row_number, hs.seat_number
            "#,
        )
        .bind(screening_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(seats)
    }

    async fn ticket(&self, ticket_id: i64) -> StoreResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1"
        ))
        .bind(ticket_id)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(ticket)
    }

    async fn tickets_for_user(&self, user_id: i64) -> StoreResult<Vec<Ticket>> {
        let tickets = sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE user_id = $1 ORDER BY show_time DESC, id"
        ))
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(tickets)
    }
}

#[async_trait]
impl RatingStore for PgStore {
    async fn movie_exists(&self, movie_id: i64) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM movies WHERE id = $1)")
            .bind(movie_id)
            .fetch_one(&self.db.pool)
            .await?;
        Ok(exists)
    }

    async fn upsert_rating(&self, movie_id: i64, user_id: i64, rating: i16) -> StoreResult<MovieRating> {
        let stored = sqlx::query_as::<_, MovieRating>(
            "INSERT INTO movie_ratings (movie_id, user_id, rating)
             VALUES ($1, $2, $3)
             ON CONFLICT (movie_id, user_id)
             DO UPDATE SET rating = EXCLUDED.rating
             RETURNING movie_id, user_id, rating",
        )
        .bind(movie_id)
        .bind(user_id)
        .bind(rating)
        .fetch_one(&self.db.pool)
        .await?;
        Ok(stored)
    }

    async fn user_rating(&self, movie_id: i64, user_id: i64) -> StoreResult<Option<MovieRating>> {
        let rating = sqlx::query_as::<_, MovieRating>(
            "SELECT movie_id, user_id, rating FROM movie_ratings WHERE movie_id = $1 AND user_id = $2",
        )
        .bind(movie_id)
        .bind(user_id)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(rating)
    }

    async fn movie_ratings(&self, movie_id: i64) -> StoreResult<Vec<MovieRating>> {
        let ratings = sqlx::query_as::<_, MovieRating>(
            "SELECT movie_id, user_id, rating FROM movie_ratings WHERE movie_id = $1 ORDER BY user_id",
        )
        .bind(movie_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(ratings)
    }

    async fn rating_stats(&self, movie_id: i64) -> StoreResult<Option<MovieRatingStats>> {
        let stats = sqlx::query_as::<_, MovieRatingStats>(&format!(
            "{RATING_STATS_SELECT} WHERE m.id = $1 GROUP BY m.id, m.name"
        ))
        .bind(movie_id)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(stats)
    }

    async fn all_rating_stats(&self) -> StoreResult<Vec<MovieRatingStats>> {
        let stats = sqlx::query_as::<_, MovieRatingStats>(&format!(
            "{RATING_STATS_SELECT} GROUP BY m.id, m.name ORDER BY m.id"
        ))
        .fetch_all(&self.db.pool)
        .await?;
        Ok(stats)
    }

    async fn rating_baseline(&self) -> StoreResult<RatingBaseline> {
        let baseline = sqlx::query_as::<_, RatingBaseline>(
            "SELECT (SELECT AVG(rating)::FLOAT8 FROM movie_ratings) AS global_mean,
                    (SELECT COUNT(*) FROM users) AS user_count",
        )
        .fetch_one(&self.db.pool)
        .await?;
        Ok(baseline)
    }
}

#[async_trait]
impl ReservationStore for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let tx = self.db.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

/// Транзакция бронирования поверх sqlx. Drop без commit = rollback.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn resolve_user(&mut self, requester: &Requester) -> StoreResult<Option<i64>> {
        Ok(resolve_user(&mut *self.tx, requester).await?)
    }

    async fn screening(&mut self, screening_id: i64) -> StoreResult<Option<Screening>> {
        // FOR KEY SHARE не мешает параллельным броням (их UPDATE счётчика
        // берёт FOR NO KEY UPDATE), но конфликтует с FOR UPDATE в
        // delete_screening: удаление ждёт коммита брони и видит её
        let screening = sqlx::query_as::<_, Screening>(&format!(
            "SELECT {SCREENING_COLUMNS} FROM screenings WHERE id = $1 FOR KEY SHARE"
        ))
        .bind(screening_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(screening)
    }

    async fn seats_in_hall(&mut self, hall_id: i64, seat_ids: &[i64]) -> StoreResult<Vec<i64>> {
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM hall_seats WHERE hall_id = $1 AND id = ANY($2) ORDER BY id",
        )
        .bind(hall_id)
        .bind(seat_ids)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(found)
    }

    async fn reserved_among(&mut self, screening_id: i64, seat_ids: &[i64]) -> StoreResult<Vec<i64>> {
        let taken = sqlx::query_scalar::<_, i64>(
            "SELECT hall_seat_id
             FROM seat_reservations
             WHERE screening_id = $1 AND hall_seat_id = ANY($2)
             ORDER BY hall_seat_id",
        )
        .bind(screening_id)
        .bind(seat_ids)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(taken)
    }

    async fn movie_price(&mut self, movie_id: i64) -> StoreResult<Option<Decimal>> {
        Ok(movie_price(&mut *self.tx, movie_id).await?)
    }

    async fn insert_ticket(&mut self, ticket: &NewTicket) -> StoreResult<Ticket> {
        let issued = sqlx::query_as::<_, Ticket>(&format!(
            "INSERT INTO tickets (movie_id, user_id, show_time, price, hall_seat_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {TICKET_COLUMNS}"
        ))
        .bind(ticket.movie_id)
        .bind(ticket.user_id)
        .bind(ticket.show_time)
        .bind(ticket.price)
        .bind(ticket.hall_seat_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(issued)
    }

    async fn claim_seat(
        &mut self,
        screening_id: i64,
        hall_seat_id: i64,
        user_id: i64,
        ticket_id: i64,
    ) -> StoreResult<bool> {
        // Если параллельная транзакция уже вставила это место, INSERT ждёт её
        // завершения; после её коммита DO NOTHING вернёт пустой результат
        let inserted = sqlx::query_scalar::<_, i64>(
            "INSERT INTO seat_reservations (screening_id, hall_seat_id, user_id, ticket_id)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (screening_id, hall_seat_id) DO NOTHING
             RETURNING id",
        )
        .bind(screening_id)
        .bind(hall_seat_id)
        .bind(user_id)
        .bind(ticket_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        if inserted.is_none() {
            debug!("seat {} already claimed for screening {}", hall_seat_id, screening_id);
        }
        Ok(inserted.is_some())
    }

    async fn take_capacity(&mut self, screening_id: i64, count: i32) -> StoreResult<Option<i32>> {
        let remaining = sqlx::query_scalar::<_, i32>(
            "UPDATE screenings
             SET available_seats = available_seats - $2
             WHERE id = $1 AND available_seats >= $2
             RETURNING available_seats",
        )
        .bind(screening_id)
        .bind(count)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(remaining)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

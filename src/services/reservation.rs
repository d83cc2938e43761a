use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::error::{BookingError, BookingResult};
use crate::models::{BookingReceipt, BookingRequest, NewTicket, Requester, ReservedSeat, Ticket};
use crate::store::{CatalogStore, ReservationStore, ScreeningStore, UnitOfWork};

/// Движок бронирования: проверка конфликтов, выдача билетов и списание
/// мест в одной единице работы
pub struct ReservationEngine<S> {
    store: Arc<S>,
}

impl<S> Clone for ReservationEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S> ReservationEngine<S>
where
    S: CatalogStore + ScreeningStore + ReservationStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Бронирует все места или ни одного.
    pub async fn book_seats(&self, request: &BookingRequest) -> BookingResult<BookingReceipt> {
        request.validate()?;

        // Набор мест; порядок по возрастанию id, чтобы параллельные брони
        // с пересекающимися местами не ловили взаимную блокировку
        let seat_ids: Vec<i64> = request
            .seat_ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut uow = self.store.begin().await?;
        let outcome = book_within(uow.as_mut(), request.screening_id, &request.requester, &seat_ids).await;
        match outcome {
            Ok(receipt) => {
                uow.commit().await?;
                info!(
                    "Booked {} seats for user {} on screening {}, {} left",
                    receipt.tickets.len(),
                    receipt.user_id,
                    receipt.screening_id,
                    receipt.available_seats
                );
                Ok(receipt)
            }
            Err(e) => {
                if let Err(rollback_err) = uow.rollback().await {
                    warn!(
                        "rollback failed for screening {}: {:?}",
                        request.screening_id, rollback_err
                    );
                }
                if e.is_conflict() {
                    warn!("Booking rejected: {}", e);
                } else {
                    debug!("Booking failed: {}", e);
                }
                Err(e)
            }
        }
    }

    pub async fn reserved_seats(&self, screening_id: i64) -> BookingResult<Vec<ReservedSeat>> {
        if self.store.screening(screening_id).await?.is_none() {
            return Err(BookingError::not_found("screening", screening_id));
        }
        Ok(self.store.reserved_seats(screening_id).await?)
    }

    pub async fn ticket(&self, ticket_id: i64) -> BookingResult<Ticket> {
        self.store
            .ticket(ticket_id)
            .await?
            .ok_or_else(|| BookingError::not_found("ticket", ticket_id))
    }

    pub async fn tickets_for_user(&self, requester: &Requester) -> BookingResult<Vec<Ticket>> {
        let user_id = self
            .store
            .resolve_user(requester)
            .await?
            .ok_or_else(|| BookingError::not_found("user", requester))?;
        Ok(self.store.tickets_for_user(user_id).await?)
    }
}

async fn book_within(
    uow: &mut dyn UnitOfWork,
    screening_id: i64,
    requester: &Requester,
    seat_ids: &[i64],
) -> BookingResult<BookingReceipt> {
    let requested = i32::try_from(seat_ids.len())
        .map_err(|_| BookingError::Validation("too many seats selected".to_string()))?;

    let user_id = uow
        .resolve_user(requester)
        .await?
        .ok_or_else(|| BookingError::not_found("user", requester))?;

    let screening = uow
        .screening(screening_id)
        .await?
        .ok_or_else(|| BookingError::not_found("screening", screening_id))?;

    // Все места должны быть из зала этого сеанса
    let in_hall: HashSet<i64> = uow
        .seats_in_hall(screening.hall_id, seat_ids)
        .await?
        .into_iter()
        .collect();
    let foreign: Vec<String> = seat_ids
        .iter()
        .filter(|id| !in_hall.contains(*id))
        .map(i64::to_string)
        .collect();
    if !foreign.is_empty() {
        return Err(BookingError::NotFound {
            entity: "hall seat",
            key: foreign.join(", "),
        });
    }

    let taken = uow.reserved_among(screening_id, seat_ids).await?;
    if !taken.is_empty() {
        return Err(BookingError::SeatsTaken {
            screening_id,
            seat_ids: taken,
        });
    }

    // Цена берётся текущая, а не зафиксированная при создании сеанса
    let price = uow
        .movie_price(screening.movie_id)
        .await?
        .ok_or_else(|| BookingError::not_found("movie", screening.movie_id))?;

    let mut tickets = Vec::with_capacity(seat_ids.len());
    let mut lost = Vec::new();
    for &hall_seat_id in seat_ids {
        let ticket = uow
            .insert_ticket(&NewTicket {
                movie_id: screening.movie_id,
                user_id,
                show_time: screening.starts_at,
                price,
                hall_seat_id,
            })
            .await?;

        if uow.claim_seat(screening_id, hall_seat_id, user_id, ticket.id).await? {
            tickets.push(ticket);
        } else {
            lost.push(hall_seat_id);
        }
    }
    if !lost.is_empty() {
        return Err(BookingError::SeatsTaken {
            screening_id,
            seat_ids: lost,
        });
    }

    let available_seats = uow
        .take_capacity(screening_id, requested)
        .await?
        .ok_or(BookingError::CapacityExhausted {
            screening_id,
            requested,
            available: screening.available_seats,
        })?;

    Ok(BookingReceipt {
        screening_id,
        user_id,
        tickets,
        available_seats,
    })
}
